//! The Feed: accepting, persisting and reading back signed messages.
//!
//! A [`Feed`] ties the message factory and validators to a [`BatchStore`].
//! Every acceptance for a given author runs under that author's lock, so
//! reading the tip, validating against it and advancing it cannot interleave
//! with another acceptance for the same feed.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use feedchain_core::{
    validate_against_chain, validate_shape, validate_shape_value, Clock, Content, FeedId,
    Message, MessageFactory, MessageId, MonotonicClock, SigningContext, SigningIdentity,
    StoredMessage,
};
use feedchain_store::{message_ops, BatchStore, MessageStoreExt, WriteQueue};
use serde_json::Value;
use tracing::{debug, trace, warn};

use crate::error::{FeedError, Result};

/// Configuration for a [`Feed`].
#[derive(Debug, Clone)]
pub struct FeedConfig {
    /// Domain-separation tag every signature is bound to.
    pub signing_context: SigningContext,
    /// Whether to validate messages on ingest.
    ///
    /// Only disable this when replaying messages from a trusted source.
    pub validate_on_ingest: bool,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            signing_context: SigningContext::none(),
            validate_on_ingest: true,
        }
    }
}

/// Result of ingesting a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestResult {
    /// Message was accepted and is now the tip of its feed.
    Accepted(MessageId),
    /// Message already is the tip of its feed (idempotent).
    Duplicate,
}

/// Hash-chained, signed feeds over a batch store.
pub struct Feed<S: BatchStore + 'static, C: Clock = MonotonicClock> {
    store: Arc<S>,
    queue: WriteQueue<S>,
    factory: MessageFactory<C>,
    config: FeedConfig,
    locks: AuthorLocks,
}

/// One lock per author with work in progress. Entries are removed as soon
/// as their last user lets go.
type AuthorLocks = Mutex<HashMap<FeedId, Arc<tokio::sync::Mutex<()>>>>;

impl<S: BatchStore + 'static> Feed<S> {
    /// Create a feed whose timestamps come from the monotonic wall clock.
    pub fn new(store: S, config: FeedConfig) -> Self {
        Self::with_clock(store, config, MonotonicClock::new())
    }
}

impl<S: BatchStore + 'static, C: Clock> Feed<S, C> {
    pub fn with_clock(store: S, config: FeedConfig, clock: C) -> Self {
        let store = Arc::new(store);
        Self {
            queue: WriteQueue::new(store.clone()),
            factory: MessageFactory::with_clock(clock, config.signing_context.clone()),
            store,
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the store reference.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &FeedConfig {
        &self.config
    }

    /// Writes buffered behind the batch currently being flushed.
    pub fn pending_writes(&self) -> usize {
        self.queue.size()
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Append
    // ─────────────────────────────────────────────────────────────────────────

    /// Create, sign and persist the next message of `identity`'s feed.
    pub async fn append<I: SigningIdentity + ?Sized>(
        &self,
        identity: &I,
        content: Content,
    ) -> Result<StoredMessage> {
        let author = identity.feed_id();
        let entry = self.author_lock(&author);
        let _guard = entry.lock.lock().await;

        let tip = self.store.get_tip(&author).await?;
        let message = match &tip {
            Some(prev) => {
                self.factory
                    .create_with_previous_key(identity, content, &prev.value, prev.key)?
            }
            None => self.factory.create_from_content(identity, content, None)?,
        };

        validate_shape(&message)?;
        validate_against_chain(&author, &message, tip.as_ref(), self.factory.context())?;

        let stored = message.into_stored()?;
        self.persist(&stored).await?;
        Ok(stored)
    }

    /// Append a `{ "type": .., "value": .. }` record.
    pub async fn append_typed<I: SigningIdentity + ?Sized>(
        &self,
        identity: &I,
        content_type: &str,
        value: impl Into<Value>,
    ) -> Result<StoredMessage> {
        self.append(identity, Content::typed(content_type, value)).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Ingest
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate and persist a message produced elsewhere.
    pub async fn ingest(&self, message: Message) -> Result<IngestResult> {
        if self.config.validate_on_ingest {
            if let Err(e) = validate_shape(&message) {
                warn!(feed = %message.author, sequence = message.sequence, error = %e, "rejected message");
                return Err(e.into());
            }
        }

        let author = message.author;
        let entry = self.author_lock(&author);
        let _guard = entry.lock.lock().await;

        let tip = self.store.get_tip(&author).await?;
        let key = message.compute_id()?;

        if tip.as_ref().is_some_and(|t| t.key == key) {
            debug!(feed = %author, id = %key, "message already is the feed tip");
            return Ok(IngestResult::Duplicate);
        }

        if self.config.validate_on_ingest {
            let context = &self.config.signing_context;
            if let Err(e) = validate_against_chain(&author, &message, tip.as_ref(), context) {
                warn!(feed = %author, sequence = message.sequence, error = %e, "rejected message");
                return Err(e.into());
            }
        }

        self.persist(&StoredMessage {
            key,
            value: message,
        })
        .await?;
        Ok(IngestResult::Accepted(key))
    }

    /// Ingest an untyped wire value, checking its shape before anything else.
    pub async fn ingest_value(&self, value: &Value) -> Result<IngestResult> {
        match validate_shape_value(value) {
            Ok(message) => self.ingest(message).await,
            Err(e) => {
                warn!(error = %e, "rejected malformed message");
                Err(e.into())
            }
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Query
    // ─────────────────────────────────────────────────────────────────────────

    /// The latest accepted message of a feed.
    pub async fn tip(&self, feed: &FeedId) -> Result<Option<StoredMessage>> {
        Ok(self.store.get_tip(feed).await?)
    }

    /// Load a message by ID, checking it still hashes to that ID.
    pub async fn get(&self, id: &MessageId) -> Result<Option<Message>> {
        let Some(message) = self.store.get_message(id).await? else {
            return Ok(None);
        };

        let actual = message.compute_id()?;
        if actual != *id {
            return Err(FeedError::Corrupt {
                key: *id,
                reason: format!("content hashes to {}", actual),
            });
        }

        Ok(Some(message))
    }

    /// Walk a feed backwards from its tip, newest first, up to `limit` messages.
    pub async fn history(&self, feed: &FeedId, limit: usize) -> Result<Vec<StoredMessage>> {
        let mut out = Vec::new();
        let mut cursor = self.tip(feed).await?.map(|t| t.key);

        while let Some(key) = cursor {
            if out.len() >= limit {
                break;
            }
            let value = self.get(&key).await?.ok_or_else(|| FeedError::Corrupt {
                key,
                reason: "referenced by the feed but missing from the store".into(),
            })?;
            cursor = value.previous;
            out.push(StoredMessage { key, value });
        }

        Ok(out)
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Internals
    // ─────────────────────────────────────────────────────────────────────────

    fn author_lock(&self, author: &FeedId) -> AuthorLock<'_> {
        let lock = self
            .locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(*author)
            .or_default()
            .clone();
        AuthorLock {
            locks: &self.locks,
            author: *author,
            lock,
        }
    }

    /// Write the message and its new tip in one batch.
    async fn persist(&self, stored: &StoredMessage) -> Result<()> {
        for handle in self.queue.enqueue_all(message_ops(stored)?) {
            handle.await?;
        }

        trace!(
            feed = %stored.value.author,
            sequence = stored.sequence(),
            id = %stored.key,
            "advanced feed tip"
        );
        Ok(())
    }
}

/// A claim on an author's lock. Dropping the last claim removes the entry.
struct AuthorLock<'a> {
    locks: &'a AuthorLocks,
    author: FeedId,
    lock: Arc<tokio::sync::Mutex<()>>,
}

impl Drop for AuthorLock<'_> {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // The map and this claim; anyone else waiting holds a third reference.
        if Arc::strong_count(&self.lock) == 2 {
            locks.remove(&self.author);
        }
    }
}
