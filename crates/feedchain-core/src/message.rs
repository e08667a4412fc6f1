//! Message: one immutable, signed entry in an author's feed.
//!
//! A message is constructed once and never edited. Its identity is the
//! SHA-256 of its canonical encoding, which the next message in the feed
//! stores as `previous`.

use serde::{Deserialize, Serialize};

use crate::canonical::{encode, signing_payload, UnsignedMessage};
use crate::content::Content;
use crate::crypto::{FeedId, Signature, SigningContext, SigningIdentity};
use crate::error::CoreError;
use crate::types::{HashAlgorithm, MessageId, Timestamp};

/// A complete, signed message in wire field order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    /// Reference to the prior message (None for the genesis message).
    pub previous: Option<MessageId>,

    /// The author's feed identifier.
    pub author: FeedId,

    /// Position in the author's feed (1-indexed).
    pub sequence: u64,

    /// Author-claimed timestamp (Unix milliseconds, possibly fractional).
    pub timestamp: Timestamp,

    /// Digest used for `previous`.
    pub hash: HashAlgorithm,

    /// The payload.
    pub content: Content,

    /// Signature over the canonical encoding of every other field.
    pub signature: Signature,
}

impl Message {
    /// Compute the message ID (SHA-256 of the canonical encoding).
    pub fn compute_id(&self) -> Result<MessageId, CoreError> {
        Ok(MessageId::from_canonical(&encode(self)?))
    }

    /// Whether this is the first message of a feed.
    pub fn is_genesis(&self) -> bool {
        self.sequence == 1 && self.previous.is_none()
    }

    /// Pair this message with its computed key.
    pub fn into_stored(self) -> Result<StoredMessage, CoreError> {
        let key = self.compute_id()?;
        Ok(StoredMessage { key, value: self })
    }
}

/// An accepted message together with the key it is stored under.
///
/// This is the `previous` entry the chain validator checks successors against.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredMessage {
    pub key: MessageId,
    pub value: Message,
}

impl StoredMessage {
    pub fn sequence(&self) -> u64 {
        self.value.sequence
    }

    pub fn timestamp(&self) -> &Timestamp {
        &self.value.timestamp
    }
}

/// Builder for creating messages with every field chosen explicitly.
///
/// [`crate::factory::MessageFactory`] is the usual entry point; the builder is
/// for cases that need exact control over sequence, timestamp and linkage.
pub struct MessageBuilder {
    author: FeedId,
    sequence: u64,
    timestamp: Timestamp,
    previous: Option<MessageId>,
    content: Content,
}

impl MessageBuilder {
    /// Start building a message.
    pub fn new(author: FeedId, sequence: u64, content: Content) -> Self {
        Self {
            author,
            sequence,
            timestamp: Timestamp::from_millis(0),
            previous: None,
            content,
        }
    }

    /// Set the timestamp in whole milliseconds.
    pub fn timestamp(mut self, ts: i64) -> Self {
        self.timestamp = Timestamp::from_millis(ts);
        self
    }

    /// Set the timestamp, fractional parts included.
    pub fn timestamp_value(mut self, ts: Timestamp) -> Self {
        self.timestamp = ts;
        self
    }

    /// Set the previous message ID.
    pub fn previous(mut self, previous: MessageId) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Set or clear the previous message ID.
    pub fn previous_opt(mut self, previous: Option<MessageId>) -> Self {
        self.previous = previous;
        self
    }

    /// Replace the content.
    pub fn content(mut self, content: Content) -> Self {
        self.content = content;
        self
    }

    /// Build and sign the message under `context`.
    pub fn sign<I: SigningIdentity + ?Sized>(
        self,
        identity: &I,
        context: &SigningContext,
    ) -> Result<Message, CoreError> {
        let unsigned = UnsignedMessage {
            previous: &self.previous,
            author: &self.author,
            sequence: self.sequence,
            timestamp: &self.timestamp,
            hash: HashAlgorithm::Sha256,
            content: &self.content,
        };
        let payload = signing_payload(context, &unsigned.encode()?)?;
        let signature = identity.sign(&payload);

        Ok(Message {
            previous: self.previous,
            author: self.author,
            sequence: self.sequence,
            timestamp: self.timestamp,
            hash: HashAlgorithm::Sha256,
            content: self.content,
            signature,
        })
    }
}
