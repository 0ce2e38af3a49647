mod common;

use chatkeep::storage::{ChatStore, SledChatStore};
use chatkeep::{ChatRepository, Config};
use serial_test::serial;
use std::sync::Arc;

#[tokio::test]
#[serial]
async fn test_config_file_drives_store_and_defaults() {
    let data_dir = tempfile::TempDir::new().expect("tempdir");
    let db_path = data_dir.path().join("chats.db");
    let yaml = format!(
        r#"
storage:
  path: {}
  collection: conversations
chat:
  default_title: Scratchpad
  default_settings:
    temperature: 0.4
    maxTokens: 1024
    topP: 0.9
    frequencyPenalty: 0.0
    presencePenalty: 0.0
"#,
        db_path.display()
    );
    let (_cfg_dir, cfg_path) = common::temp_config_file(&yaml);

    let config = Config::load(&cfg_path).expect("load config");
    config.validate().expect("valid config");

    let store = Arc::new(SledChatStore::open(&config.storage).expect("open store"));
    let repo = ChatRepository::new(store.clone(), config.chat.clone());
    let chat = repo.create("phi-3-mini").await.expect("create");

    assert_eq!(chat.title, "Scratchpad");
    assert_eq!(chat.settings.max_tokens, 1024);
    assert!(chat.settings.stop.is_empty());
    assert_eq!(store.get_all().await.expect("get_all").len(), 1);
}

#[test]
#[serial]
fn test_env_storage_path_override() {
    let (_cfg_dir, cfg_path) = common::temp_config_file("catalog:\n  timeout_seconds: 3\n");
    std::env::set_var("CHATKEEP_STORAGE_PATH", "/tmp/chatkeep-env-override.db");

    let config = Config::load(&cfg_path).expect("load config");
    std::env::remove_var("CHATKEEP_STORAGE_PATH");

    assert_eq!(
        config.storage.path,
        std::path::PathBuf::from("/tmp/chatkeep-env-override.db")
    );
    assert_eq!(config.catalog.timeout_seconds, 3);
}
