//! Error types for Chatkeep
//!
//! This module defines the error types used throughout the crate,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Chatkeep operations
///
/// Durable-store failures and model catalog failures are kept in separate
/// variants so callers can tell the two failure classes apart after
/// downcasting an `anyhow::Error`.
#[derive(Error, Debug)]
pub enum ChatkeepError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable store errors (open, read, write, flush)
    #[error("Storage error: {0}")]
    Storage(String),

    /// A record with the same primary key already exists
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// The store on disk was created with a different schema version
    #[error("Store version mismatch: found={found}, expected={expected}")]
    StoreVersion {
        /// Version recorded in the store
        found: u32,
        /// Version this build expects
        expected: u32,
    },

    /// The store on disk was created under a different database name
    #[error("Store name mismatch: found={found}, expected={expected}")]
    StoreName {
        /// Name recorded in the store
        found: String,
        /// Name from the configuration
        expected: String,
    },

    /// Model catalog errors (connection refused, non-2xx, malformed body)
    #[error("Catalog error: {0}")]
    Catalog(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Result type alias for Chatkeep operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;
