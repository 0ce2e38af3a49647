use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use chatkeep::config::{ChatConfig, StorageConfig};
use chatkeep::storage::SledChatStore;
use chatkeep::ChatRepository;

#[allow(dead_code)]
pub fn temp_storage_config() -> (StorageConfig, TempDir) {
    let tmp = TempDir::new().expect("failed to create tempdir");
    let config = StorageConfig {
        path: tmp.path().join("chats.db"),
        ..Default::default()
    };
    (config, tmp)
}

#[allow(dead_code)]
pub fn create_temp_store() -> (Arc<SledChatStore>, TempDir) {
    let (config, tmp) = temp_storage_config();
    let store = SledChatStore::open(&config).expect("failed to open sled store");
    (Arc::new(store), tmp)
}

#[allow(dead_code)]
pub fn sled_repository() -> (ChatRepository, Arc<SledChatStore>, TempDir) {
    let (store, tmp) = create_temp_store();
    let repo = ChatRepository::new(store.clone(), ChatConfig::default());
    (repo, store, tmp)
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    std::fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
