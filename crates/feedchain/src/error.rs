//! Error types for the feed facade.

use feedchain_core::{CoreError, MessageId, ValidationError};
use feedchain_store::StoreError;
use thiserror::Error;

/// Errors that can occur during feed operations.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The message was rejected; chain state is unchanged.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Building or encoding a message failed.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// A stored message no longer hashes to the key it is stored under.
    #[error("stored message {key} is corrupt: {reason}")]
    Corrupt { key: MessageId, reason: String },
}

impl FeedError {
    /// Whether this error is a validation rejection rather than a failure.
    pub fn is_rejection(&self) -> bool {
        matches!(self, FeedError::Validation(_))
    }
}

/// Result type for feed operations.
pub type Result<T> = std::result::Result<T, FeedError>;
