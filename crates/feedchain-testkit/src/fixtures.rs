//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use feedchain::{Feed, FeedConfig};
use feedchain_core::{
    Content, FeedId, Keypair, Message, MessageBuilder, SigningContext, StoredMessage,
};
use feedchain_store::MemoryStore;

/// Timestamp of the first message a fixture builds.
pub const BASE_TIMESTAMP: i64 = 1_449_202_158_507;

/// A test fixture with a keypair, memory store and signing context.
pub struct TestFixture {
    pub keypair: Keypair,
    pub store: MemoryStore,
    pub context: SigningContext,
}

impl TestFixture {
    /// Create a new test fixture with a random keypair.
    pub fn new() -> Self {
        Self {
            keypair: Keypair::generate(),
            store: MemoryStore::new(),
            context: SigningContext::none(),
        }
    }

    /// Create with a deterministic keypair from seed.
    pub fn with_seed(seed: [u8; 32]) -> Self {
        Self {
            keypair: Keypair::from_seed(&seed),
            store: MemoryStore::new(),
            context: SigningContext::none(),
        }
    }

    pub fn with_context(mut self, context: SigningContext) -> Self {
        self.context = context;
        self
    }

    pub fn feed_id(&self) -> FeedId {
        self.keypair.feed_id()
    }

    /// Sign a genesis message at [`BASE_TIMESTAMP`].
    pub fn genesis(&self, content: Content) -> Message {
        self.sign(MessageBuilder::new(self.feed_id(), 1, content).timestamp(BASE_TIMESTAMP))
    }

    /// Sign the correct successor of `prev`, one second later.
    pub fn next(&self, prev: &StoredMessage, content: Content) -> Message {
        self.sign(
            MessageBuilder::new(self.feed_id(), prev.sequence() + 1, content)
                .timestamp_value(
                    prev.timestamp()
                        .checked_add_millis(1000)
                        .expect("fixture timestamps stay in range"),
                )
                .previous(prev.key),
        )
    }

    /// Build a valid chain of `len` `post` messages.
    pub fn chain(&self, len: usize) -> Vec<StoredMessage> {
        let mut out: Vec<StoredMessage> = Vec::with_capacity(len);
        for i in 0..len {
            let content = Content::typed("post", format!("message {}", i + 1));
            let message = match out.last() {
                Some(prev) => self.next(prev, content),
                None => self.genesis(content),
            };
            out.push(stored(message));
        }
        out
    }

    /// Sign a message assembled by hand, for building deliberately invalid chains.
    pub fn sign(&self, builder: MessageBuilder) -> Message {
        builder
            .sign(&self.keypair, &self.context)
            .expect("fixture messages always encode")
    }

    /// Move the store into a feed configured with this fixture's context.
    pub fn into_feed(self) -> (Keypair, Feed<MemoryStore>) {
        let config = FeedConfig {
            signing_context: self.context,
            ..FeedConfig::default()
        };
        (self.keypair, Feed::new(self.store, config))
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Pair a message with its computed ID.
pub fn stored(message: Message) -> StoredMessage {
    message
        .into_stored()
        .expect("fixture messages always encode")
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count)
        .map(|i| {
            let mut seed = [0u8; 32];
            seed[0] = i as u8;
            TestFixture::with_seed(seed)
        })
        .collect()
}
