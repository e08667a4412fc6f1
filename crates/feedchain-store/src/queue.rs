//! Write coalescing queue.
//!
//! Writes enqueued while the store is idle start a flush; writes enqueued
//! while a flush is running are buffered and go out together in the next
//! `batch` call. At most one batch is in flight per queue.
//!
//! The flush is a spawned task that takes whatever is buffered when it first
//! runs. On a current-thread runtime that is every write enqueued before the
//! caller yields. On a multi-thread runtime another worker may start the
//! flush between two `enqueue` calls, so writes that must share a batch go
//! through [`WriteQueue::enqueue_all`].

use std::future::Future;
use std::mem;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};

use tokio::sync::oneshot;
use tracing::{debug, warn};

use crate::error::{Result, StoreError};
use crate::traits::{BatchOp, BatchStore};

struct PendingWrite {
    op: BatchOp,
    done: oneshot::Sender<Result<BatchOp>>,
}

#[derive(Default)]
struct QueueState {
    pending: Vec<PendingWrite>,
    writing: bool,
}

struct Shared<S> {
    store: Arc<S>,
    state: Mutex<QueueState>,
}

impl<S> Shared<S> {
    fn state(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Coalesces individual writes into store batches.
///
/// Cloning yields another handle to the same queue.
pub struct WriteQueue<S> {
    shared: Arc<Shared<S>>,
}

impl<S> Clone for WriteQueue<S> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
        }
    }
}

impl<S: BatchStore + 'static> WriteQueue<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            shared: Arc::new(Shared {
                store,
                state: Mutex::new(QueueState::default()),
            }),
        }
    }

    /// The store this queue writes to.
    pub fn store(&self) -> &Arc<S> {
        &self.shared.store
    }

    /// Buffer a write and start a flush if none is running.
    ///
    /// The returned handle resolves once the batch holding the write has been
    /// applied (or has failed). Dropping the handle does not withdraw the write.
    ///
    /// Flushes run as tokio tasks, so this must be called from within a
    /// runtime. Outside of one the write fails with `StorageFailure`.
    pub fn enqueue(&self, op: BatchOp) -> WriteHandle {
        let (done, rx) = oneshot::channel();
        self.push(vec![PendingWrite { op, done }]);
        WriteHandle { rx }
    }

    /// Buffer several writes that must land in the same batch, on any runtime.
    ///
    /// Handles are returned in the order of `ops`.
    pub fn enqueue_all(&self, ops: impl IntoIterator<Item = BatchOp>) -> Vec<WriteHandle> {
        let (writes, handles) = ops
            .into_iter()
            .map(|op| {
                let (done, rx) = oneshot::channel();
                (PendingWrite { op, done }, WriteHandle { rx })
            })
            .unzip();
        self.push(writes);
        handles
    }

    fn push(&self, writes: Vec<PendingWrite>) {
        let start = {
            let mut state = self.shared.state();
            state.pending.extend(writes);
            !mem::replace(&mut state.writing, true)
        };

        if !start {
            return;
        }

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(drain(self.shared.clone()));
            }
            Err(e) => {
                let orphaned = {
                    let mut state = self.shared.state();
                    state.writing = false;
                    mem::take(&mut state.pending)
                };
                fail_all(orphaned, &e.to_string());
            }
        }
    }

    /// Number of buffered writes not yet handed to the store.
    pub fn size(&self) -> usize {
        self.shared.state().pending.len()
    }

    /// Whether a flush is currently running.
    pub fn is_flushing(&self) -> bool {
        self.shared.state().writing
    }
}

async fn drain<S: BatchStore>(shared: Arc<Shared<S>>) {
    loop {
        let batch = {
            let mut state = shared.state();
            if state.pending.is_empty() {
                state.writing = false;
                return;
            }
            mem::take(&mut state.pending)
        };

        let ops: Vec<BatchOp> = batch.iter().map(|p| p.op.clone()).collect();
        debug!(ops = ops.len(), "flushing write batch");

        match shared.store.batch(&ops).await {
            Ok(()) => {
                for pending in batch {
                    let _ = pending.done.send(Ok(pending.op));
                }
            }
            Err(e) => {
                warn!(ops = ops.len(), error = %e, "write batch failed");
                fail_all(batch, &e.to_string());
            }
        }
    }
}

fn fail_all(batch: Vec<PendingWrite>, reason: &str) {
    for pending in batch {
        let _ = pending
            .done
            .send(Err(StoreError::StorageFailure(reason.to_owned())));
    }
}

/// Completion of one enqueued write.
#[must_use = "the write proceeds regardless, but its outcome is only visible by awaiting"]
pub struct WriteHandle {
    rx: oneshot::Receiver<Result<BatchOp>>,
}

impl Future for WriteHandle {
    type Output = Result<BatchOp>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|r| r.unwrap_or(Err(StoreError::QueueClosed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use async_trait::async_trait;
    use bytes::Bytes;
    use proptest::prelude::*;
    use tokio::sync::{Notify, Semaphore};

    /// Records the keys of every batch and optionally blocks until released.
    #[derive(Default)]
    struct RecordingStore {
        batches: Mutex<Vec<Vec<String>>>,
        started: Notify,
        gate: Option<Semaphore>,
    }

    impl RecordingStore {
        fn gated() -> Self {
            Self {
                gate: Some(Semaphore::new(0)),
                ..Default::default()
            }
        }

        fn batches(&self) -> Vec<Vec<String>> {
            self.batches.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl BatchStore for RecordingStore {
        async fn batch(&self, ops: &[BatchOp]) -> Result<()> {
            self.started.notify_one();
            if let Some(gate) = &self.gate {
                gate.acquire().await.unwrap().forget();
            }
            self.batches
                .lock()
                .unwrap()
                .push(ops.iter().map(|op| op.key.clone()).collect());
            Ok(())
        }

        async fn get(&self, _key: &str) -> Result<Option<Bytes>> {
            Ok(None)
        }
    }

    #[tokio::test]
    async fn test_synchronous_enqueues_share_one_batch() {
        let store = Arc::new(RecordingStore::default());
        let queue = WriteQueue::new(store.clone());

        let handles: Vec<_> = (0..5)
            .map(|i| queue.enqueue(BatchOp::put(format!("k{}", i), format!("v{}", i))))
            .collect();
        assert_eq!(queue.size(), 5);
        assert!(queue.is_flushing());

        for (i, handle) in handles.into_iter().enumerate() {
            let op = handle.await.unwrap();
            assert_eq!(op.key, format!("k{}", i));
            assert_eq!(op.value, Bytes::from(format!("v{}", i)));
        }

        assert_eq!(
            store.batches(),
            vec![vec!["k0", "k1", "k2", "k3", "k4"]
                .into_iter()
                .map(String::from)
                .collect::<Vec<_>>()]
        );
        assert_eq!(queue.size(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_grouped_writes_share_one_batch_on_worker_pool() {
        for _ in 0..50 {
            let store = Arc::new(RecordingStore::default());
            let queue = WriteQueue::new(store.clone());

            let handles =
                queue.enqueue_all((0..5).map(|i| BatchOp::put(format!("k{}", i), "v")));
            for (i, handle) in handles.into_iter().enumerate() {
                assert_eq!(handle.await.unwrap().key, format!("k{}", i));
            }

            assert_eq!(store.batches().len(), 1);
            assert_eq!(store.batches()[0].len(), 5);
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_writes_behind_running_flush_coalesce_on_worker_pool() {
        let store = Arc::new(RecordingStore::gated());
        let queue = WriteQueue::new(store.clone());

        let first = queue.enqueue(BatchOp::put("a", "1"));
        store.started.notified().await;

        let handles: Vec<_> = (0..5)
            .map(|i| queue.enqueue(BatchOp::put(format!("k{}", i), "v")))
            .collect();
        assert_eq!(queue.size(), 5);

        store.gate.as_ref().unwrap().add_permits(2);
        assert_eq!(first.await.unwrap().key, "a");
        for (i, handle) in handles.into_iter().enumerate() {
            assert_eq!(handle.await.unwrap().key, format!("k{}", i));
        }

        let keys: Vec<String> = (0..5).map(|i| format!("k{}", i)).collect();
        assert_eq!(store.batches(), vec![vec!["a".to_string()], keys]);
    }

    #[tokio::test]
    async fn test_writes_during_flush_wait_for_next_batch() {
        let store = Arc::new(RecordingStore::gated());
        let queue = WriteQueue::new(store.clone());

        let first = queue.enqueue(BatchOp::put("a", "1"));
        store.started.notified().await;

        let second = queue.enqueue(BatchOp::put("b", "2"));
        let third = queue.enqueue(BatchOp::put("c", "3"));
        assert_eq!(queue.size(), 2);
        assert!(queue.is_flushing());

        store.gate.as_ref().unwrap().add_permits(2);

        assert_eq!(first.await.unwrap().key, "a");
        assert_eq!(second.await.unwrap().key, "b");
        assert_eq!(third.await.unwrap().key, "c");

        assert_eq!(
            store.batches(),
            vec![
                vec!["a".to_string()],
                vec!["b".to_string(), "c".to_string()]
            ]
        );
    }

    #[tokio::test]
    async fn test_enqueue_all_lands_in_one_batch_even_mid_flush() {
        let store = Arc::new(RecordingStore::gated());
        let queue = WriteQueue::new(store.clone());

        let first = queue.enqueue(BatchOp::put("a", "1"));
        store.started.notified().await;

        let grouped = queue.enqueue_all([BatchOp::put("msg", "m"), BatchOp::put("tip", "t")]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(queue.size(), 2);

        store.gate.as_ref().unwrap().add_permits(2);
        first.await.unwrap();
        for handle in grouped {
            handle.await.unwrap();
        }

        assert_eq!(store.batches()[1], vec!["msg".to_string(), "tip".to_string()]);
    }

    #[tokio::test]
    async fn test_failure_reaches_every_write_and_queue_recovers() {
        let store = Arc::new(MemoryStore::new());
        let queue = WriteQueue::new(store.clone());
        store.fail_next_batch("disk full");

        let handles: Vec<_> = ["a", "b", "c"]
            .iter()
            .map(|k| queue.enqueue(BatchOp::put(*k, "x")))
            .collect();

        for handle in handles {
            match handle.await {
                Err(StoreError::StorageFailure(reason)) => assert!(reason.contains("disk full")),
                other => panic!("expected storage failure, got {:?}", other),
            }
        }
        assert!(store.is_empty());

        queue.enqueue(BatchOp::put("d", "y")).await.unwrap();
        assert_eq!(store.get("d").await.unwrap(), Some(Bytes::from("y")));
        assert!(!queue.is_flushing());
    }

    #[tokio::test]
    async fn test_dropped_handle_still_writes() {
        let store = Arc::new(MemoryStore::new());
        let queue = WriteQueue::new(store.clone());

        drop(queue.enqueue(BatchOp::put("dropped", "1")));
        queue.enqueue(BatchOp::put("kept", "2")).await.unwrap();

        assert_eq!(store.get("dropped").await.unwrap(), Some(Bytes::from("1")));
        assert_eq!(store.batch_count(), 1);
    }

    #[test]
    fn test_enqueue_outside_runtime_fails_cleanly() {
        let store = Arc::new(MemoryStore::new());
        let queue = WriteQueue::new(store.clone());

        let handle = queue.enqueue(BatchOp::put("a", "1"));
        assert!(!queue.is_flushing());
        assert_eq!(queue.size(), 0);

        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();
        let result = runtime.block_on(handle);
        assert!(matches!(result, Err(StoreError::StorageFailure(_))));
        assert!(store.is_empty());
    }

    proptest! {
        #[test]
        fn prop_completions_follow_enqueue_order(keys in prop::collection::vec("[a-z]{1,8}", 1..40)) {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .build()
                .unwrap();

            runtime.block_on(async {
                let store = Arc::new(MemoryStore::new());
                let queue = WriteQueue::new(store.clone());

                let handles: Vec<_> = keys
                    .iter()
                    .enumerate()
                    .map(|(i, k)| queue.enqueue(BatchOp::put(k.clone(), i.to_string())))
                    .collect();

                for (i, handle) in handles.into_iter().enumerate() {
                    let op = handle.await.unwrap();
                    prop_assert_eq!(&op.key, &keys[i]);
                    prop_assert_eq!(op.value, Bytes::from(i.to_string()));
                }
                prop_assert_eq!(store.batch_count(), 1);
                Ok(())
            })?;
        }
    }
}
