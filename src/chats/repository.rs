//! In-memory chat state kept consistent with a durable store
//!
//! Every mutation writes the whole record to the [`ChatStore`] first and only
//! touches the in-memory collection once that write has succeeded. A failed
//! write leaves memory exactly as it was and the error is returned to the
//! caller. Bulk refresh ([`ChatRepository::load_all`]) is the exception: its
//! failures are recorded in [`ChatsState::error`] and never returned.
//!
//! Mutations of the same chat id are serialized; mutations of different ids
//! run independently.

use crate::chats::clock::{Clock, IdGenerator, SystemClock, UuidGenerator};
use crate::chats::types::{Chat, Message, ModelSettingsPatch};
use crate::config::ChatConfig;
use crate::error::{ChatkeepError, Result};
use crate::storage::ChatStore;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{watch, Mutex as AsyncMutex, OwnedMutexGuard};

/// Observable repository state
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatsState {
    /// All known chats, in load/creation order
    pub chats: Vec<Chat>,
    /// Id of the current chat; always present in `chats` when set
    pub current_chat_id: Option<String>,
    /// True while a bulk load is in flight
    pub loading: bool,
    /// Message of the most recent failure
    pub error: Option<String>,
}

impl ChatsState {
    /// Look up a chat by id
    pub fn get(&self, chat_id: &str) -> Option<&Chat> {
        self.chats.iter().find(|c| c.id == chat_id)
    }

    /// The current chat, if any
    pub fn current_chat(&self) -> Option<&Chat> {
        self.current_chat_id.as_deref().and_then(|id| self.get(id))
    }
}

/// Repository of chats backed by a [`ChatStore`]
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
/// use chatkeep::chats::{ChatRepository, Message};
/// use chatkeep::config::ChatConfig;
/// use chatkeep::storage::MemoryChatStore;
///
/// # #[tokio::main]
/// # async fn main() -> chatkeep::error::Result<()> {
/// let repo = ChatRepository::new(Arc::new(MemoryChatStore::new()), ChatConfig::default());
/// let chat = repo.create("llama-3.2-3b-instruct").await?;
/// repo.append_message(&chat.id, Message::user("Hello")).await?;
///
/// assert_eq!(repo.current_chat().unwrap().messages.len(), 1);
/// # Ok(())
/// # }
/// ```
pub struct ChatRepository {
    store: Arc<dyn ChatStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    defaults: ChatConfig,
    state: watch::Sender<ChatsState>,
    locks: ChatLocks,
}

impl ChatRepository {
    /// Create a repository using the system clock and UUID identifiers
    ///
    /// The in-memory collection starts empty; call [`load_all`](Self::load_all)
    /// to populate it from the store.
    pub fn new(store: Arc<dyn ChatStore>, defaults: ChatConfig) -> Self {
        let (state, _) = watch::channel(ChatsState::default());
        Self {
            store,
            clock: Arc::new(SystemClock),
            ids: Arc::new(UuidGenerator),
            defaults,
            state,
            locks: ChatLocks::default(),
        }
    }

    /// Replace the timestamp source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Replace the identifier source
    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<ChatsState> {
        self.state.subscribe()
    }

    /// Copy of the full current state
    pub fn snapshot(&self) -> ChatsState {
        self.state.borrow().clone()
    }

    /// All chats, in load/creation order
    pub fn chats(&self) -> Vec<Chat> {
        self.state.borrow().chats.clone()
    }

    /// Look up a chat by id
    pub fn get(&self, chat_id: &str) -> Option<Chat> {
        self.state.borrow().get(chat_id).cloned()
    }

    /// The current chat, if one is selected
    pub fn current_chat(&self) -> Option<Chat> {
        self.state.borrow().current_chat().cloned()
    }

    /// Returns true while [`load_all`](Self::load_all) is in flight
    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    /// Message of the most recent failure, if any
    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().error.clone()
    }

    /// Forget the recorded failure
    pub fn clear_error(&self) {
        self.state.send_if_modified(|s| s.error.take().is_some());
    }

    /// Make `chat_id` the current chat
    ///
    /// Returns false, leaving the selection unchanged, if the id is unknown.
    pub fn select(&self, chat_id: &str) -> bool {
        self.state.send_if_modified(|s| {
            if s.get(chat_id).is_none() {
                return false;
            }
            s.current_chat_id = Some(chat_id.to_string());
            true
        })
    }

    /// Unset the current chat
    pub fn clear_selection(&self) {
        self.state
            .send_if_modified(|s| s.current_chat_id.take().is_some());
    }

    /// Replace the in-memory collection with every record in the store
    ///
    /// Failures are logged and recorded in the state's `error`; the previous
    /// collection is kept. `loading` is reset on exit even if this future is
    /// dropped before completing.
    pub async fn load_all(&self) {
        let _loading = LoadingFlag::raise(&self.state);
        tracing::debug!("Loading all chats from store");

        match self.store.get_all().await {
            Ok(records) => {
                let count = records.len();
                self.state.send_modify(|s| {
                    s.chats = records.into_iter().map(Chat::from).collect();
                    if s.current_chat().is_none() {
                        s.current_chat_id = None;
                    }
                });
                tracing::info!("Loaded {} chats", count);
            }
            Err(e) => self.record_failure("Failed to load chats", &e),
        }
    }

    /// Create a chat for `model_id` and make it current
    ///
    /// # Errors
    ///
    /// Returns the store error if the record could not be written; the
    /// in-memory state is unchanged in that case
    pub async fn create(&self, model_id: impl Into<String>) -> Result<Chat> {
        let now = self.clock.now_millis();
        let chat = Chat {
            id: self.ids.new_id(),
            model_id: model_id.into(),
            title: self.defaults.default_title.clone(),
            messages: Vec::new(),
            settings: self.defaults.default_settings.clone(),
            created_at: now,
            updated_at: now,
        };

        tracing::debug!(chat_id = %chat.id, model_id = %chat.model_id, "Creating chat");

        let collides = self.state.borrow().get(&chat.id).is_some();
        if collides {
            let err: anyhow::Error = ChatkeepError::DuplicateKey(chat.id.clone()).into();
            self.record_failure("Failed to create chat", &err);
            return Err(err);
        }

        if let Err(e) = self.store.add(&chat.to_record()).await {
            self.record_failure("Failed to create chat", &e);
            return Err(e);
        }

        self.state.send_modify(|s| {
            s.chats.push(chat.clone());
            s.current_chat_id = Some(chat.id.clone());
        });

        tracing::info!(chat_id = %chat.id, "Created chat");
        Ok(chat)
    }

    /// Shallow-merge `patch` into a chat's settings
    ///
    /// Returns `Ok(None)` without touching the store if `chat_id` is unknown,
    /// otherwise the updated chat.
    ///
    /// # Errors
    ///
    /// Returns the store error if the record could not be written; the
    /// in-memory chat is unchanged in that case
    pub async fn update_settings(
        &self,
        chat_id: &str,
        patch: &ModelSettingsPatch,
    ) -> Result<Option<Chat>> {
        let _guard = self.locks.acquire(chat_id).await;

        let Some(mut updated) = self.get(chat_id) else {
            tracing::debug!(chat_id = %chat_id, "Settings update for unknown chat ignored");
            return Ok(None);
        };

        patch.apply(&mut updated.settings);
        updated.updated_at = self.next_timestamp(updated.updated_at);

        self.persist(&updated, "Failed to update settings").await?;

        let updated_at = updated.updated_at;
        self.state.send_if_modified(|s| match find_mut(s, chat_id) {
            Some(live) => {
                patch.apply(&mut live.settings);
                live.updated_at = updated_at;
                true
            }
            None => false,
        });

        tracing::info!(chat_id = %chat_id, "Updated chat settings");
        Ok(Some(updated))
    }

    /// Append `message` to a chat
    ///
    /// Returns `Ok(None)` without touching the store if `chat_id` is unknown,
    /// otherwise the updated chat.
    ///
    /// # Errors
    ///
    /// Returns the store error if the record could not be written; the
    /// in-memory messages are unchanged in that case
    pub async fn append_message(&self, chat_id: &str, message: Message) -> Result<Option<Chat>> {
        let _guard = self.locks.acquire(chat_id).await;

        let Some(mut updated) = self.get(chat_id) else {
            tracing::debug!(chat_id = %chat_id, "Message for unknown chat ignored");
            return Ok(None);
        };

        updated.messages.push(message.clone());
        updated.updated_at = self.next_timestamp(updated.updated_at);

        self.persist(&updated, "Failed to append message").await?;

        let updated_at = updated.updated_at;
        self.state.send_if_modified(move |s| match find_mut(s, chat_id) {
            Some(live) => {
                live.messages.push(message);
                live.updated_at = updated_at;
                true
            }
            None => false,
        });

        tracing::debug!(
            chat_id = %chat_id,
            messages = updated.messages.len(),
            "Appended message"
        );
        Ok(Some(updated))
    }

    /// Delete a chat from the store and from memory
    ///
    /// Clears the current selection if it pointed at this chat. Returns
    /// whether the chat was present in memory.
    ///
    /// # Errors
    ///
    /// Returns the store error if the delete failed; memory is unchanged
    pub async fn delete(&self, chat_id: &str) -> Result<bool> {
        let _guard = self.locks.acquire(chat_id).await;
        tracing::debug!(chat_id = %chat_id, "Deleting chat");

        if let Err(e) = self.store.delete(chat_id).await {
            self.record_failure("Failed to delete chat", &e);
            return Err(e);
        }

        let mut removed = false;
        self.state.send_if_modified(|s| {
            let before = s.chats.len();
            s.chats.retain(|c| c.id != chat_id);
            removed = s.chats.len() != before;
            if s.current_chat_id.as_deref() == Some(chat_id) {
                s.current_chat_id = None;
            }
            removed
        });

        tracing::info!(chat_id = %chat_id, removed, "Deleted chat");
        Ok(removed)
    }

    async fn persist(&self, chat: &Chat, context: &str) -> Result<()> {
        if let Err(e) = self.store.put(&chat.to_record()).await {
            self.record_failure(context, &e);
            return Err(e);
        }
        Ok(())
    }

    /// Strictly after `previous`, even if the clock stalls or goes backwards.
    /// Saturates at `i64::MAX` for records already stamped there.
    fn next_timestamp(&self, previous: i64) -> i64 {
        self.clock.now_millis().max(previous.saturating_add(1))
    }

    fn record_failure(&self, context: &str, err: &anyhow::Error) {
        tracing::error!("{}: {}", context, err);
        let message = format!("{}: {}", context, err);
        self.state.send_modify(|s| s.error = Some(message));
    }
}

fn find_mut<'a>(state: &'a mut ChatsState, chat_id: &str) -> Option<&'a mut Chat> {
    state.chats.iter_mut().find(|c| c.id == chat_id)
}

/// Sets `loading` on creation and clears it on drop
struct LoadingFlag<'a> {
    state: &'a watch::Sender<ChatsState>,
}

impl<'a> LoadingFlag<'a> {
    fn raise(state: &'a watch::Sender<ChatsState>) -> Self {
        state.send_modify(|s| s.loading = true);
        Self { state }
    }
}

impl Drop for LoadingFlag<'_> {
    fn drop(&mut self) {
        self.state.send_modify(|s| s.loading = false);
    }
}

/// Per-chat async mutexes, created on demand and dropped when unused
#[derive(Default)]
struct ChatLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ChatLocks {
    async fn acquire(&self, chat_id: &str) -> ChatLockGuard<'_> {
        let lock = {
            let mut map = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(map.entry(chat_id.to_string()).or_default())
        };
        let guard = lock.lock_owned().await;
        ChatLockGuard {
            locks: self,
            chat_id: chat_id.to_string(),
            guard: Some(guard),
        }
    }
}

struct ChatLockGuard<'a> {
    locks: &'a ChatLocks,
    chat_id: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for ChatLockGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut map = self
            .locks
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        // Only the map's own reference left: nobody holds or waits on it.
        if map
            .get(&self.chat_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            map.remove(&self.chat_id);
        }
    }
}
