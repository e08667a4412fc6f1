//! Error types for Feedchain Core.

use thiserror::Error;

use crate::crypto::FeedId;
use crate::types::{MessageId, Timestamp};

/// Core errors that can occur while building, encoding or parsing messages.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid signature")]
    InvalidSignature,

    #[error("invalid public key")]
    InvalidPublicKey,

    #[error("invalid feed id: {0}")]
    InvalidFeedId(String),

    #[error("invalid message id: {0}")]
    InvalidMessageId(String),

    #[error("invalid signature encoding: {0}")]
    InvalidSignatureEncoding(String),

    #[error("invalid content: {0}")]
    InvalidContent(String),

    #[error("sequence overflow after {0}")]
    SequenceOverflow(u64),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Validation errors for message shape and chain linkage.
///
/// Every variant is a local, recoverable rejection: the candidate message is
/// dropped and chain state is left untouched.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("message has invalid properties: {0}")]
    InvalidShape(String),

    #[error("type must be a string with {min} <= type.length < {max}, was: {found}")]
    InvalidContentType {
        found: String,
        min: usize,
        max: usize,
    },

    #[error("encoded message must not be larger than {limit} bytes, was {size}")]
    EncodedSizeExceeded { size: usize, limit: usize },

    #[error("expected initial message")]
    ExpectedInitialMessage,

    #[error("expected previous: {expected} but found: {found:?}")]
    PreviousMismatch {
        expected: MessageId,
        found: Option<MessageId>,
    },

    #[error(
        "out of order: expected sequence {expected_sequence} after timestamp {previous_timestamp}, \
         got sequence {sequence} at timestamp {timestamp}"
    )]
    OutOfOrder {
        expected_sequence: u64,
        sequence: u64,
        previous_timestamp: Timestamp,
        timestamp: Timestamp,
    },

    #[error("expected different author: {expected} but found: {found}")]
    AuthorMismatch { expected: FeedId, found: FeedId },

    #[error("signature was invalid")]
    SignatureInvalid,
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidSignature | CoreError::InvalidPublicKey => {
                ValidationError::SignatureInvalid
            }
            other => ValidationError::InvalidShape(other.to_string()),
        }
    }
}
