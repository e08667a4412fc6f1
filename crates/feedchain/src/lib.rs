//! # Feedchain
//!
//! Per-identity, hash-chained, signed append-only logs.
//!
//! ## Overview
//!
//! Every identity owns exactly one feed. Each message in a feed names its
//! predecessor by hash, carries a strictly increasing sequence number and
//! timestamp, and is signed by the feed's author. A message is accepted only
//! if it extends the current tip of its feed.
//!
//! ## Key Concepts
//!
//! - **Message**: Immutable. Never edited. Changes are new messages.
//! - **Feed**: Owned by a single author. Sequence numbers start at 1 and increase by 1.
//! - **Tip**: The latest accepted message of a feed.
//! - **Canonical encoding**: Two-space indented JSON with a fixed field order,
//!   the basis for both message IDs and signatures.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use feedchain::{Feed, FeedConfig};
//! use feedchain::core::{Content, Keypair};
//! use feedchain::store::SqliteStore;
//!
//! async fn example() {
//!     let keypair = Keypair::generate();
//!     let store = SqliteStore::open("feeds.db").unwrap();
//!     let feed = Feed::new(store, FeedConfig::default());
//!
//!     let first = feed
//!         .append(&keypair, Content::typed("post", "hello"))
//!         .await
//!         .unwrap();
//!     let second = feed.append_typed(&keypair, "post", "again").await.unwrap();
//!     assert_eq!(second.value.previous, Some(first.key));
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `feedchain::core` - Messages, encoding, factory and validators
//! - `feedchain::store` - Storage abstraction, SQLite and the write queue

pub mod error;
pub mod feed;

pub use feedchain_core as core;
pub use feedchain_store as store;

pub use error::{FeedError, Result};
pub use feed::{Feed, FeedConfig, IngestResult};

pub use feedchain_core::{
    Content, FeedId, Keypair, Message, MessageFactory, MessageId, SigningContext,
    SigningIdentity, StoredMessage, ValidationError,
};
