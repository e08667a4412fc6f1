//! Canonical JSON encoding for deterministic serialization.
//!
//! Messages are encoded as pretty-printed JSON with two-space indentation and
//! a fixed field order:
//!
//! `previous, author, sequence, timestamp, hash, content, signature`
//!
//! Plaintext content emits `type` first and the remaining fields in key
//! order. The same logical message therefore always produces identical
//! bytes, which is what makes `previous` hashes and size limits meaningful.
//!
//! The signed payload is the encoding without `signature`, prefixed with the
//! signing context:
//!
//! `len(context) as u32 BE || context || encode_unsigned(message)`

use serde::Serialize;

use crate::content::Content;
use crate::crypto::{FeedId, SigningContext};
use crate::error::CoreError;
use crate::message::Message;
use crate::types::{HashAlgorithm, MessageId, Timestamp};

/// Maximum canonical encoding size of a message, in bytes (inclusive).
pub const MAX_MESSAGE_SIZE: usize = 8192;

/// Every field of a message except the signature, in wire order.
#[derive(Serialize)]
pub(crate) struct UnsignedMessage<'a> {
    pub previous: &'a Option<MessageId>,
    pub author: &'a FeedId,
    pub sequence: u64,
    pub timestamp: &'a Timestamp,
    pub hash: HashAlgorithm,
    pub content: &'a Content,
}

impl<'a> UnsignedMessage<'a> {
    pub(crate) fn of(message: &'a Message) -> Self {
        Self {
            previous: &message.previous,
            author: &message.author,
            sequence: message.sequence,
            timestamp: &message.timestamp,
            hash: message.hash,
            content: &message.content,
        }
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, CoreError> {
        to_canonical(self)
    }
}

/// Encode a full message to canonical bytes.
pub fn encode(message: &Message) -> Result<Vec<u8>, CoreError> {
    to_canonical(message)
}

/// Encode a message without its signature (the bytes that get signed).
pub fn encode_unsigned(message: &Message) -> Result<Vec<u8>, CoreError> {
    UnsignedMessage::of(message).encode()
}

/// Construct the domain-separated payload handed to the signer.
pub fn signing_payload(context: &SigningContext, unsigned: &[u8]) -> Result<Vec<u8>, CoreError> {
    let tag = context.as_bytes();
    let mut buf = Vec::with_capacity(4 + tag.len() + unsigned.len());
    buf.extend_from_slice(&context_len_prefix(tag.len())?);
    buf.extend_from_slice(tag);
    buf.extend_from_slice(unsigned);
    Ok(buf)
}

fn context_len_prefix(len: usize) -> Result<[u8; 4], CoreError> {
    u32::try_from(len).map(u32::to_be_bytes).map_err(|_| {
        CoreError::EncodingError(format!("signing context of {len} bytes is too long"))
    })
}

/// Hash a message's canonical encoding into its ID.
pub fn message_id(message: &Message) -> Result<MessageId, CoreError> {
    message.compute_id()
}

/// Parse canonical (or any equivalent JSON) bytes back into a message.
pub fn decode(bytes: &[u8]) -> Result<Message, CoreError> {
    serde_json::from_slice(bytes).map_err(|e| CoreError::DecodingError(e.to_string()))
}

fn to_canonical<T: Serialize + ?Sized>(value: &T) -> Result<Vec<u8>, CoreError> {
    serde_json::to_vec_pretty(value).map_err(|e| CoreError::EncodingError(e.to_string()))
}
