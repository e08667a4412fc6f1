//! BatchStore trait: the abstract key-value capability messages persist through.
//!
//! This trait allows the feed to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use async_trait::async_trait;
use bytes::Bytes;
use feedchain_core::{decode, encode, FeedId, Message, MessageId, StoredMessage};

use crate::error::{Result, StoreError};

/// What a [`BatchOp`] does to its key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOpKind {
    Put,
    Del,
}

/// A single write inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOp {
    pub kind: BatchOpKind,
    pub key: String,
    pub value: Bytes,
}

impl BatchOp {
    /// Store `value` under `key`.
    pub fn put(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            kind: BatchOpKind::Put,
            key: key.into(),
            value: value.into(),
        }
    }

    /// Remove `key`.
    pub fn del(key: impl Into<String>) -> Self {
        Self {
            kind: BatchOpKind::Del,
            key: key.into(),
            value: Bytes::new(),
        }
    }
}

/// The BatchStore trait: async key-value storage with atomic batches.
///
/// # Design Notes
///
/// - **Atomic batches**: either every op of a batch is applied or none is.
/// - **Ordered batches**: ops apply in slice order, so a later op on the same
///   key wins.
/// - **Opaque failures**: a failed batch is reported once for the whole batch.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Apply a batch of writes atomically.
    async fn batch(&self, ops: &[BatchOp]) -> Result<()>;

    /// Read the value stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<Bytes>>;
}

/// Key holding a message's canonical bytes.
pub fn message_key(id: &MessageId) -> String {
    format!("msg:{}", id)
}

/// Key holding the ID of a feed's latest accepted message.
pub fn tip_key(feed: &FeedId) -> String {
    format!("tip:{}", feed)
}

/// The two writes that persist an accepted message and advance its feed tip.
pub fn message_ops(stored: &StoredMessage) -> Result<[BatchOp; 2]> {
    let canonical = encode(&stored.value).map_err(|e| StoreError::Serialization(e.to_string()))?;
    Ok([
        BatchOp::put(message_key(&stored.key), canonical),
        BatchOp::put(tip_key(&stored.value.author), stored.key.to_string()),
    ])
}

/// Extension trait for reading messages back out of a [`BatchStore`].
pub trait MessageStoreExt: BatchStore {
    /// Load a message by ID.
    fn get_message(
        &self,
        id: &MessageId,
    ) -> impl std::future::Future<Output = Result<Option<Message>>> + Send;

    /// Load the latest accepted message of a feed.
    fn get_tip(
        &self,
        feed: &FeedId,
    ) -> impl std::future::Future<Output = Result<Option<StoredMessage>>> + Send;
}

impl<S: BatchStore + ?Sized> MessageStoreExt for S {
    async fn get_message(&self, id: &MessageId) -> Result<Option<Message>> {
        match self.get(&message_key(id)).await? {
            Some(bytes) => decode(&bytes)
                .map(Some)
                .map_err(|e| StoreError::Serialization(e.to_string())),
            None => Ok(None),
        }
    }

    async fn get_tip(&self, feed: &FeedId) -> Result<Option<StoredMessage>> {
        let Some(raw) = self.get(&tip_key(feed)).await? else {
            return Ok(None);
        };

        let text = std::str::from_utf8(&raw)
            .map_err(|e| StoreError::InvalidData(format!("tip of {}: {}", feed, e)))?;
        let key = MessageId::parse(text)
            .map_err(|e| StoreError::InvalidData(format!("tip of {}: {}", feed, e)))?;

        let value = self.get_message(&key).await?.ok_or_else(|| {
            StoreError::InvalidData(format!("tip of {} points at missing message {}", feed, key))
        })?;

        Ok(Some(StoredMessage { key, value }))
    }
}
