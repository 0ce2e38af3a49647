//! In-memory chat store
//!
//! Same contract as the sled backend without durability across restarts.
//! Records are returned by `get_all` in key order, matching sled

use crate::chats::ChatRecord;
use crate::error::{ChatkeepError, Result};
use crate::storage::ChatStore;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// Process-local chat store
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    records: RwLock<BTreeMap<String, ChatRecord>>,
}

impl MemoryChatStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `records`
    pub fn with_records(records: impl IntoIterator<Item = ChatRecord>) -> Self {
        let map = records.into_iter().map(|r| (r.id.clone(), r)).collect();
        Self {
            records: RwLock::new(map),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.records.read().map(|r| r.len()).unwrap_or_default()
    }

    /// Returns true if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn poisoned() -> ChatkeepError {
        ChatkeepError::Storage("Memory store lock poisoned".to_string())
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn get_all(&self) -> Result<Vec<ChatRecord>> {
        let records = self.records.read().map_err(|_| Self::poisoned())?;
        Ok(records.values().cloned().collect())
    }

    async fn add(&self, record: &ChatRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        if records.contains_key(&record.id) {
            return Err(ChatkeepError::DuplicateKey(record.id.clone()).into());
        }
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn put(&self, record: &ChatRecord) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        records.insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.records.write().map_err(|_| Self::poisoned())?;
        records.remove(id);
        Ok(())
    }
}
