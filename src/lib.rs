//! Chatkeep - local chat persistence library
//!
//! Keeps an in-memory, observable collection of chat conversations consistent
//! with a durable key-value store, and lists the models offered by a local
//! model server.
//!
//! # Architecture
//!
//! - `chats`: chat data model and the `ChatRepository`
//! - `storage`: the `ChatStore` contract with sled and in-memory backends
//! - `catalog`: the `ModelCatalogClient` for the model listing endpoint
//! - `config`: configuration loading and validation
//! - `logging`: optional tracing subscriber setup
//! - `error`: error types and result aliases
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use chatkeep::{ChatRepository, Config, ModelCatalogClient, SledChatStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config/config.yaml")?;
//!     config.validate()?;
//!
//!     let store = Arc::new(SledChatStore::open(&config.storage)?);
//!     let chats = ChatRepository::new(store, config.chat.clone());
//!     chats.load_all().await;
//!
//!     let catalog = ModelCatalogClient::new(config.catalog.clone())?;
//!     catalog.fetch_models().await;
//!     if let Some(model) = catalog.models().first() {
//!         chats.create(model.id.clone()).await?;
//!     }
//!     Ok(())
//! }
//! ```

pub mod catalog;
pub mod chats;
pub mod config;
pub mod error;
pub mod logging;
pub mod storage;

// Re-export commonly used types
pub use catalog::{CatalogModel, CatalogState, ModelCatalogClient};
pub use chats::{Chat, ChatRepository, ChatsState, Message, ModelSettings, ModelSettingsPatch, Role};
pub use config::Config;
pub use error::{ChatkeepError, Result};
pub use storage::{ChatStore, MemoryChatStore, SledChatStore};
