//! Chat data model
//!
//! `Chat` is the live in-memory value held by the repository. `ChatRecord` is
//! the plain-data form written to the durable store. The two are converted
//! explicitly at the storage boundary so nothing but serializable fields
//! ever reaches the store.

use serde::{Deserialize, Serialize};

/// Author of a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// End user
    User,
    /// Model output
    Assistant,
    /// System prompt
    System,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::System => write!(f, "system"),
        }
    }
}

/// A single conversation message
///
/// Messages are immutable once appended to a chat.
///
/// # Examples
///
/// ```
/// use chatkeep::chats::{Message, Role};
///
/// let msg = Message::user("Hello!");
/// assert_eq!(msg.role, Role::User);
/// assert_eq!(msg.content, "Hello!");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// Role of the message sender
    pub role: Role,
    /// Message text
    pub content: String,
}

impl Message {
    /// Creates a message with an explicit role
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    /// Creates a new user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Creates a new assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Creates a new system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }
}

/// Generation parameters attached to a chat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettings {
    /// Sampling temperature
    pub temperature: f64,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Nucleus sampling mass
    pub top_p: f64,
    /// Frequency penalty
    pub frequency_penalty: f64,
    /// Presence penalty
    pub presence_penalty: f64,
    /// Stop sequences, in order
    #[serde(default)]
    pub stop: Vec<String>,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 2000,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop: Vec::new(),
        }
    }
}

/// Partial update of [`ModelSettings`]
///
/// Fields left as `None` keep their previous value when applied.
///
/// # Examples
///
/// ```
/// use chatkeep::chats::{ModelSettings, ModelSettingsPatch};
///
/// let mut settings = ModelSettings::default();
/// ModelSettingsPatch::default().temperature(0.2).apply(&mut settings);
/// assert_eq!(settings.temperature, 0.2);
/// assert_eq!(settings.max_tokens, 2000);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelSettingsPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presence_penalty: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<Vec<String>>,
}

impl ModelSettingsPatch {
    pub fn temperature(mut self, value: f64) -> Self {
        self.temperature = Some(value);
        self
    }

    pub fn max_tokens(mut self, value: u32) -> Self {
        self.max_tokens = Some(value);
        self
    }

    pub fn top_p(mut self, value: f64) -> Self {
        self.top_p = Some(value);
        self
    }

    pub fn frequency_penalty(mut self, value: f64) -> Self {
        self.frequency_penalty = Some(value);
        self
    }

    pub fn presence_penalty(mut self, value: f64) -> Self {
        self.presence_penalty = Some(value);
        self
    }

    pub fn stop(mut self, value: Vec<String>) -> Self {
        self.stop = Some(value);
        self
    }

    /// Returns true when the patch names no field
    pub fn is_empty(&self) -> bool {
        self.temperature.is_none()
            && self.max_tokens.is_none()
            && self.top_p.is_none()
            && self.frequency_penalty.is_none()
            && self.presence_penalty.is_none()
            && self.stop.is_none()
    }

    /// Shallow-merge this patch into `settings`
    pub fn apply(&self, settings: &mut ModelSettings) {
        if let Some(v) = self.temperature {
            settings.temperature = v;
        }
        if let Some(v) = self.max_tokens {
            settings.max_tokens = v;
        }
        if let Some(v) = self.top_p {
            settings.top_p = v;
        }
        if let Some(v) = self.frequency_penalty {
            settings.frequency_penalty = v;
        }
        if let Some(v) = self.presence_penalty {
            settings.presence_penalty = v;
        }
        if let Some(v) = &self.stop {
            settings.stop = v.clone();
        }
    }
}

/// A conversation as held in memory by the repository
#[derive(Debug, Clone, PartialEq)]
pub struct Chat {
    /// Primary key, immutable after creation
    pub id: String,
    /// Model the conversation targets
    pub model_id: String,
    /// Human-readable label
    pub title: String,
    /// Messages in conversation order
    pub messages: Vec<Message>,
    /// Generation parameters
    pub settings: ModelSettings,
    /// Creation time (ms since epoch)
    pub created_at: i64,
    /// Time of the last durable mutation (ms since epoch)
    pub updated_at: i64,
}

impl Chat {
    /// Plain-data copy suitable for the durable store
    pub fn to_record(&self) -> ChatRecord {
        ChatRecord {
            id: self.id.clone(),
            model_id: self.model_id.clone(),
            title: self.title.clone(),
            messages: self.messages.clone(),
            settings: self.settings.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

impl From<ChatRecord> for Chat {
    fn from(record: ChatRecord) -> Self {
        Self {
            id: record.id,
            model_id: record.model_id,
            title: record.title,
            messages: record.messages,
            settings: record.settings,
            created_at: record.created_at,
            updated_at: record.updated_at,
        }
    }
}

/// Stored form of a [`Chat`]
///
/// Serialized as JSON with camelCase keys, keyed by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRecord {
    pub id: String,
    pub model_id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub settings: ModelSettings,
    pub created_at: i64,
    pub updated_at: i64,
}
