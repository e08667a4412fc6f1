//! In-memory implementation of the BatchStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError, RwLock};

use async_trait::async_trait;
use bytes::Bytes;

use crate::error::{Result, StoreError};
use crate::traits::{BatchOp, BatchOpKind, BatchStore};

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Bytes>>,

    /// Number of batch calls received.
    batches: AtomicUsize,

    /// When set, the next batch fails with this reason and is not applied.
    fail_next: Mutex<Option<String>>,
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next batch call fail without applying anything.
    pub fn fail_next_batch(&self, reason: impl Into<String>) {
        *self.fail_next.lock().unwrap_or_else(PoisonError::into_inner) = Some(reason.into());
    }

    /// Number of batch calls received so far (including failed ones).
    pub fn batch_count(&self) -> usize {
        self.batches.load(Ordering::SeqCst)
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BatchStore for MemoryStore {
    async fn batch(&self, ops: &[BatchOp]) -> Result<()> {
        self.batches.fetch_add(1, Ordering::SeqCst);

        if let Some(reason) = self
            .fail_next
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            return Err(StoreError::StorageFailure(reason));
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        for op in ops {
            match op.kind {
                BatchOpKind::Put => {
                    entries.insert(op.key.clone(), op.value.clone());
                }
                BatchOpKind::Del => {
                    entries.remove(&op.key);
                }
            }
        }

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Bytes>> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(key).cloned())
    }
}
