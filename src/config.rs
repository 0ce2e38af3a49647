//! Configuration management for Chatkeep
//!
//! This module handles loading, parsing, validating, and managing
//! configuration from YAML files and environment variables.

use crate::chats::ModelSettings;
use crate::error::{ChatkeepError, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure for Chatkeep
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Durable store location and schema
    #[serde(default)]
    pub storage: StorageConfig,
    /// Remote model catalog endpoint
    #[serde(default)]
    pub catalog: CatalogConfig,
    /// Defaults applied to newly created chats
    #[serde(default)]
    pub chat: ChatConfig,
}

/// Durable store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory of the sled database
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,

    /// Logical database name recorded in the store metadata
    #[serde(default = "default_database_name")]
    pub database_name: String,

    /// Name of the keyed collection holding chat records
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Schema version the store is created with
    #[serde(default = "default_store_version")]
    pub version: u32,
}

fn default_storage_path() -> PathBuf {
    ProjectDirs::from("com", "chatkeep", "chatkeep")
        .map(|dirs| dirs.data_dir().join("chats.db"))
        .unwrap_or_else(|| PathBuf::from("chats.db"))
}

fn default_database_name() -> String {
    "lm-studio-chats".to_string()
}

fn default_collection() -> String {
    "chats".to_string()
}

fn default_store_version() -> u32 {
    1
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
            database_name: default_database_name(),
            collection: default_collection(),
            version: default_store_version(),
        }
    }
}

/// Model catalog configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Base URL of the local model server
    #[serde(default = "default_catalog_base_url")]
    pub base_url: String,

    /// Path of the model listing endpoint
    #[serde(default = "default_models_path")]
    pub models_path: String,

    /// HTTP request timeout in seconds
    #[serde(default = "default_catalog_timeout")]
    pub timeout_seconds: u64,
}

fn default_catalog_base_url() -> String {
    "http://localhost:1234".to_string()
}

fn default_models_path() -> String {
    "/v1/models".to_string()
}

fn default_catalog_timeout() -> u64 {
    30
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_catalog_base_url(),
            models_path: default_models_path(),
            timeout_seconds: default_catalog_timeout(),
        }
    }
}

impl CatalogConfig {
    /// Full URL of the model listing endpoint
    ///
    /// # Examples
    ///
    /// ```
    /// use chatkeep::config::CatalogConfig;
    ///
    /// let config = CatalogConfig::default();
    /// assert_eq!(config.models_url(), "http://localhost:1234/v1/models");
    /// ```
    pub fn models_url(&self) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), self.models_path)
    }
}

/// Defaults for new chats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Title given to every new chat
    #[serde(default = "default_title")]
    pub default_title: String,

    /// Settings copied into every new chat
    #[serde(default)]
    pub default_settings: ModelSettings,
}

fn default_title() -> String {
    "New conversation".to_string()
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            default_title: default_title(),
            default_settings: ModelSettings::default(),
        }
    }
}

impl Config {
    /// Load configuration from file with environment overrides
    ///
    /// A missing file is not an error; defaults are used instead.
    ///
    /// # Errors
    ///
    /// Returns error if the file exists but cannot be read or parsed
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            Self::from_file(path)?
        } else {
            tracing::warn!(
                "Config file not found at {}, using defaults",
                path.display()
            );
            Self::default()
        };

        config.apply_env_vars();

        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(ChatkeepError::from)?;
        let config = serde_yaml::from_str(&contents).map_err(ChatkeepError::from)?;
        Ok(config)
    }

    fn apply_env_vars(&mut self) {
        if let Ok(path) = std::env::var("CHATKEEP_STORAGE_PATH") {
            tracing::debug!(path = %path, "Env override: CHATKEEP_STORAGE_PATH");
            self.storage.path = PathBuf::from(path);
        }

        if let Ok(name) = std::env::var("CHATKEEP_DB_NAME") {
            self.storage.database_name = name;
        }

        if let Ok(url) = std::env::var("CHATKEEP_CATALOG_URL") {
            tracing::debug!(url = %url, "Env override: CHATKEEP_CATALOG_URL");
            self.catalog.base_url = url;
        }

        if let Ok(timeout) = std::env::var("CHATKEEP_CATALOG_TIMEOUT_SECONDS") {
            if let Ok(value) = timeout.parse() {
                self.catalog.timeout_seconds = value;
            } else {
                tracing::warn!("Invalid CHATKEEP_CATALOG_TIMEOUT_SECONDS: {}", timeout);
            }
        }

        if let Ok(title) = std::env::var("CHATKEEP_DEFAULT_TITLE") {
            self.chat.default_title = title;
        }
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::Config` describing the first invalid value
    pub fn validate(&self) -> Result<()> {
        if self.storage.database_name.trim().is_empty() {
            return Err(
                ChatkeepError::Config("storage.database_name cannot be empty".to_string()).into(),
            );
        }

        if self.storage.collection.trim().is_empty() {
            return Err(
                ChatkeepError::Config("storage.collection cannot be empty".to_string()).into(),
            );
        }

        if self.storage.version == 0 {
            return Err(ChatkeepError::Config(
                "storage.version must be greater than 0".to_string(),
            )
            .into());
        }

        let url = url::Url::parse(&self.catalog.base_url).map_err(|e| {
            ChatkeepError::Config(format!(
                "Invalid catalog.base_url {}: {}",
                self.catalog.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ChatkeepError::Config(format!(
                "catalog.base_url must use http or https, got {}",
                url.scheme()
            ))
            .into());
        }

        if !self.catalog.models_path.starts_with('/') {
            return Err(ChatkeepError::Config(
                "catalog.models_path must start with '/'".to_string(),
            )
            .into());
        }

        if self.catalog.timeout_seconds == 0 {
            return Err(ChatkeepError::Config(
                "catalog.timeout_seconds must be greater than 0".to_string(),
            )
            .into());
        }

        validate_settings(&self.chat.default_settings)
    }
}

fn validate_settings(settings: &ModelSettings) -> Result<()> {
    if !(0.0..=2.0).contains(&settings.temperature) {
        return Err(ChatkeepError::Config(
            "chat.default_settings.temperature must be between 0.0 and 2.0".to_string(),
        )
        .into());
    }

    if settings.max_tokens == 0 {
        return Err(ChatkeepError::Config(
            "chat.default_settings.maxTokens must be greater than 0".to_string(),
        )
        .into());
    }

    if !(0.0..=1.0).contains(&settings.top_p) {
        return Err(ChatkeepError::Config(
            "chat.default_settings.topP must be between 0.0 and 1.0".to_string(),
        )
        .into());
    }

    for (name, value) in [
        ("frequencyPenalty", settings.frequency_penalty),
        ("presencePenalty", settings.presence_penalty),
    ] {
        if !(-2.0..=2.0).contains(&value) {
            return Err(ChatkeepError::Config(format!(
                "chat.default_settings.{} must be between -2.0 and 2.0",
                name
            ))
            .into());
        }
    }

    Ok(())
}
