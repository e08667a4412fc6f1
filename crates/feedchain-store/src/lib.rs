//! # Feedchain Store
//!
//! Storage abstraction for Feedchain. Messages persist through the
//! [`BatchStore`] capability: an async key-value store that applies batches
//! of writes atomically.
//!
//! ## Key Types
//!
//! - [`BatchStore`] - The async trait every backend implements
//! - [`SqliteStore`] - SQLite-based persistent storage
//! - [`MemoryStore`] - In-memory storage for tests
//! - [`WriteQueue`] - Coalesces individual writes into batches
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use feedchain_store::{BatchOp, SqliteStore, WriteQueue};
//!
//! async fn example() {
//!     let store = Arc::new(SqliteStore::open("feed.db").unwrap());
//!     let queue = WriteQueue::new(store);
//!
//!     let op = queue.enqueue(BatchOp::put("greeting", "hello")).await.unwrap();
//!     assert_eq!(op.key, "greeting");
//! }
//! ```
//!
//! ## Layout
//!
//! - `msg:<message id>` holds the canonical encoding of a message
//! - `tip:<feed id>` holds the ID of the latest accepted message of a feed

pub mod error;
pub mod memory;
pub mod migration;
pub mod queue;
pub mod sqlite;
pub mod traits;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
pub use queue::{WriteHandle, WriteQueue};
pub use sqlite::SqliteStore;
pub use traits::{message_key, message_ops, tip_key, BatchOp, BatchOpKind, BatchStore, MessageStoreExt};
