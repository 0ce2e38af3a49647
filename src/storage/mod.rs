//! Durable storage for chat records
//!
//! The repository talks to storage only through the [`ChatStore`] trait, a
//! whole-record key-value contract keyed by chat id. Two backends are
//! provided: [`SledChatStore`] for on-disk persistence and
//! [`MemoryChatStore`] for ephemeral use.

use crate::chats::ChatRecord;
use crate::error::Result;
use async_trait::async_trait;

pub mod memory;
pub mod sled_store;

pub use memory::MemoryChatStore;
pub use sled_store::SledChatStore;

/// Whole-record key-value store for chats
///
/// Implementations must make each single-record write durable before
/// returning `Ok`. There is no multi-record atomicity.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Return every stored record
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::Storage` if iteration or decoding fails
    async fn get_all(&self) -> Result<Vec<ChatRecord>>;

    /// Insert a record that must not already exist
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::DuplicateKey` if the id is taken, or
    /// `ChatkeepError::Storage` if the write fails
    async fn add(&self, record: &ChatRecord) -> Result<()>;

    /// Insert or replace a record by id
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::Storage` if the write fails
    async fn put(&self, record: &ChatRecord) -> Result<()>;

    /// Remove a record by id; removing an absent id succeeds
    ///
    /// # Errors
    ///
    /// Returns `ChatkeepError::Storage` if the delete fails
    async fn delete(&self, id: &str) -> Result<()>;
}
