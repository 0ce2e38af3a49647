//! sled-backed chat store
//!
//! Records are JSON-encoded `ChatRecord`s stored in a tree named after the
//! configured collection. A separate metadata tree records the database name
//! and schema version the first time the store is opened; later opens must
//! present the same pair.

use crate::chats::ChatRecord;
use crate::config::StorageConfig;
use crate::error::{ChatkeepError, Result};
use crate::storage::ChatStore;
use async_trait::async_trait;
use sled::{Db, Tree};

const META_TREE: &str = "__chatkeep_meta";
const META_NAME_KEY: &[u8] = b"name";
const META_VERSION_KEY: &[u8] = b"version";

/// On-disk chat store using an embedded `sled` database
pub struct SledChatStore {
    db: Db,
    records: Tree,
}

impl SledChatStore {
    /// Open or create the store described by `config`
    ///
    /// Opening is idempotent: the collection and metadata are created on the
    /// first open and reused afterwards.
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::Storage` if the database cannot be opened and
    /// `ChatkeepError::StoreVersion` / `ChatkeepError::StoreName` if the store
    /// was created with another schema version or database name
    ///
    /// # Examples
    ///
    /// ```
    /// use chatkeep::config::StorageConfig;
    /// use chatkeep::storage::SledChatStore;
    ///
    /// # fn main() -> chatkeep::error::Result<()> {
    /// let dir = tempfile::tempdir()?;
    /// let config = StorageConfig {
    ///     path: dir.path().join("chats.db"),
    ///     ..Default::default()
    /// };
    /// let store = SledChatStore::open(&config)?;
    /// # Ok(())
    /// # }
    /// ```
    pub fn open(config: &StorageConfig) -> Result<Self> {
        let db = sled::open(&config.path)
            .map_err(|e| ChatkeepError::Storage(format!("Failed to open database: {}", e)))?;

        let meta = db
            .open_tree(META_TREE)
            .map_err(|e| ChatkeepError::Storage(format!("Failed to open metadata: {}", e)))?;

        match meta
            .get(META_VERSION_KEY)
            .map_err(|e| ChatkeepError::Storage(format!("Failed to read version: {}", e)))?
        {
            Some(bytes) => {
                let found = decode_version(&bytes)?;
                if found != config.version {
                    return Err(ChatkeepError::StoreVersion {
                        found,
                        expected: config.version,
                    }
                    .into());
                }
                check_name(&meta, &config.database_name)?;
            }
            None => {
                tracing::info!(
                    "Creating chat store: name={}, version={}, collection={}",
                    config.database_name,
                    config.version,
                    config.collection
                );
                meta.insert(META_NAME_KEY, config.database_name.as_bytes())
                    .map_err(|e| ChatkeepError::Storage(format!("Failed to write name: {}", e)))?;
                meta.insert(META_VERSION_KEY, &config.version.to_be_bytes()[..])
                    .map_err(|e| {
                        ChatkeepError::Storage(format!("Failed to write version: {}", e))
                    })?;
            }
        }

        let records = db
            .open_tree(&config.collection)
            .map_err(|e| ChatkeepError::Storage(format!("Failed to open collection: {}", e)))?;

        db.flush()
            .map_err(|e| ChatkeepError::Storage(format!("Flush failed: {}", e)))?;

        tracing::debug!(
            "Opened chat store at {} ({} records)",
            config.path.display(),
            records.len()
        );

        Ok(Self { db, records })
    }

    fn encode(record: &ChatRecord) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(record).map_err(ChatkeepError::from)?)
    }

    async fn flush(&self) -> Result<()> {
        self.db
            .flush_async()
            .await
            .map_err(|e| ChatkeepError::Storage(format!("Flush failed: {}", e)))?;
        Ok(())
    }
}

fn decode_version(bytes: &[u8]) -> Result<u32> {
    let raw: [u8; 4] = bytes
        .try_into()
        .map_err(|_| ChatkeepError::Storage("Corrupt store version".to_string()))?;
    Ok(u32::from_be_bytes(raw))
}

fn check_name(meta: &Tree, expected: &str) -> Result<()> {
    let stored = meta
        .get(META_NAME_KEY)
        .map_err(|e| ChatkeepError::Storage(format!("Failed to read name: {}", e)))?;

    match stored {
        Some(bytes) if &*bytes != expected.as_bytes() => {
            Err(ChatkeepError::StoreName {
                found: String::from_utf8_lossy(&bytes).into_owned(),
                expected: expected.to_string(),
            }
            .into())
        }
        Some(_) => Ok(()),
        None => {
            meta.insert(META_NAME_KEY, expected.as_bytes())
                .map_err(|e| ChatkeepError::Storage(format!("Failed to write name: {}", e)))?;
            Ok(())
        }
    }
}

fn read_all(records: &Tree) -> Result<Vec<ChatRecord>> {
    let mut all = Vec::new();
    for result in records.iter() {
        let (_, value) =
            result.map_err(|e| ChatkeepError::Storage(format!("Iteration failed: {}", e)))?;

        let record: ChatRecord = serde_json::from_slice(&value).map_err(ChatkeepError::from)?;
        all.push(record);
    }
    Ok(all)
}

#[async_trait]
impl ChatStore for SledChatStore {
    async fn get_all(&self) -> Result<Vec<ChatRecord>> {
        let records = self.records.clone();
        tokio::task::spawn_blocking(move || read_all(&records))
            .await
            .map_err(|e| ChatkeepError::Storage(format!("Load task failed: {}", e)))?
    }

    async fn add(&self, record: &ChatRecord) -> Result<()> {
        let value = Self::encode(record)?;

        self.records
            .compare_and_swap(record.id.as_bytes(), None as Option<&[u8]>, Some(value))
            .map_err(|e| ChatkeepError::Storage(format!("Insert failed: {}", e)))?
            .map_err(|_| ChatkeepError::DuplicateKey(record.id.clone()))?;

        self.flush().await
    }

    async fn put(&self, record: &ChatRecord) -> Result<()> {
        let value = Self::encode(record)?;

        self.records
            .insert(record.id.as_bytes(), value)
            .map_err(|e| ChatkeepError::Storage(format!("Insert failed: {}", e)))?;

        self.flush().await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.records
            .remove(id.as_bytes())
            .map_err(|e| ChatkeepError::Storage(format!("Delete failed: {}", e)))?;

        self.flush().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chats::{Message, ModelSettings};
    use tempfile::TempDir;

    fn test_config(dir: &TempDir) -> StorageConfig {
        StorageConfig {
            path: dir.path().join("chats.db"),
            ..Default::default()
        }
    }

    fn record(id: &str) -> ChatRecord {
        ChatRecord {
            id: id.to_string(),
            model_id: "llama-3.2-3b-instruct".to_string(),
            title: "New conversation".to_string(),
            messages: vec![],
            settings: ModelSettings::default(),
            created_at: 1_000,
            updated_at: 1_000,
        }
    }

    #[tokio::test]
    async fn test_open_creates_empty_store() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SledChatStore::open(&test_config(&dir)).expect("Failed to open store");
        let all = store.get_all().await.expect("get_all failed");
        assert!(all.is_empty());
    }

    #[tokio::test]
    async fn test_add_then_get_all() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SledChatStore::open(&test_config(&dir)).expect("Failed to open store");

        store.add(&record("a")).await.expect("add failed");
        store.add(&record("b")).await.expect("add failed");

        let all = store.get_all().await.expect("get_all failed");
        assert_eq!(all.len(), 2);
        assert!(all.iter().any(|r| r.id == "a"));
        assert!(all.iter().any(|r| r.id == "b"));
    }

    #[tokio::test]
    async fn test_add_existing_id_is_duplicate_key() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SledChatStore::open(&test_config(&dir)).expect("Failed to open store");

        store.add(&record("a")).await.expect("add failed");
        let err = store.add(&record("a")).await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatkeepError>(),
            Some(ChatkeepError::DuplicateKey(id)) if id == "a"
        ));
    }

    #[tokio::test]
    async fn test_put_replaces_whole_record() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SledChatStore::open(&test_config(&dir)).expect("Failed to open store");

        store.add(&record("a")).await.expect("add failed");

        let mut updated = record("a");
        updated.messages.push(Message::user("hello"));
        updated.updated_at = 2_000;
        store.put(&updated).await.expect("put failed");

        let all = store.get_all().await.expect("get_all failed");
        assert_eq!(all, vec![updated]);
    }

    #[tokio::test]
    async fn test_put_inserts_when_absent() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SledChatStore::open(&test_config(&dir)).expect("Failed to open store");

        store.put(&record("fresh")).await.expect("put failed");
        assert_eq!(store.get_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_removes_and_tolerates_missing() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SledChatStore::open(&test_config(&dir)).expect("Failed to open store");

        store.add(&record("a")).await.expect("add failed");
        store.delete("a").await.expect("delete failed");
        store.delete("a").await.expect("second delete failed");
        assert!(store.get_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_records_survive_reopen() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(&dir);
        {
            let store = SledChatStore::open(&config).expect("Failed to open store");
            store.add(&record("persisted")).await.expect("add failed");
        }

        let store = SledChatStore::open(&config).expect("Failed to reopen store");
        let all = store.get_all().await.expect("get_all failed");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, "persisted");
    }

    #[test]
    fn test_reopen_with_other_version_fails() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(&dir);
        drop(SledChatStore::open(&config).expect("Failed to open store"));

        let newer = StorageConfig {
            version: config.version + 1,
            ..config
        };
        let err = SledChatStore::open(&newer).err().expect("open should fail");
        assert!(matches!(
            err.downcast_ref::<ChatkeepError>(),
            Some(ChatkeepError::StoreVersion { found: 1, expected: 2 })
        ));
    }

    #[test]
    fn test_reopen_with_other_name_fails() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let config = test_config(&dir);
        drop(SledChatStore::open(&config).expect("Failed to open store"));

        let renamed = StorageConfig {
            database_name: "other-chats".to_string(),
            ..config.clone()
        };
        let err = SledChatStore::open(&renamed).err().expect("open should fail");
        assert!(matches!(
            err.downcast_ref::<ChatkeepError>(),
            Some(ChatkeepError::StoreName { found, expected })
                if found == "lm-studio-chats" && expected == "other-chats"
        ));

        SledChatStore::open(&config).expect("original name still opens");
    }

    #[tokio::test]
    async fn test_get_all_rejects_corrupt_record() {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let store = SledChatStore::open(&test_config(&dir)).expect("Failed to open store");

        store
            .records
            .insert(b"broken", &b"not json"[..])
            .expect("raw insert failed");

        let err = store.get_all().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ChatkeepError>(),
            Some(ChatkeepError::Serialization(_))
        ));
    }
}
