//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Message serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid data in storage.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// The batch holding this operation failed to persist.
    #[error("storage failure: {0}")]
    StorageFailure(String),

    /// The write queue dropped the operation before completing it.
    #[error("write queue closed before the operation completed")]
    QueueClosed,
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
