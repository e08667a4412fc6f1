//! End-to-end behaviour of the feed facade over both storage backends.

use std::sync::Arc;

use feedchain::core::{
    Content, Keypair, MessageBuilder, SigningContext, Timestamp, ValidationError,
};
use feedchain::store::{message_key, BatchOp, BatchStore, MemoryStore, SqliteStore, StoreError};
use feedchain::{Feed, FeedConfig, FeedError, IngestResult, StoredMessage};
use feedchain_testkit::fixtures::{stored, TestFixture, BASE_TIMESTAMP};
use proptest::prelude::*;
use serde_json::{json, Value};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn memory_feed() -> Feed<MemoryStore> {
    init_tracing();
    Feed::new(MemoryStore::new(), FeedConfig::default())
}

fn post(text: &str) -> Content {
    Content::typed("post", text)
}

fn rejection(err: FeedError) -> ValidationError {
    match err {
        FeedError::Validation(e) => e,
        other => panic!("expected a validation rejection, got {:?}", other),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Append
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_append_builds_linked_chain() {
    let feed = memory_feed();
    let keypair = Keypair::generate();

    let first = feed.append_typed(&keypair, "post", "one").await.unwrap();
    let second = feed.append_typed(&keypair, "post", "two").await.unwrap();
    let third = feed
        .append(&keypair, Content::typed("vote", json!({ "value": 1 })))
        .await
        .unwrap();

    assert_eq!(first.sequence(), 1);
    assert_eq!(first.value.previous, None);
    assert_eq!(second.sequence(), 2);
    assert_eq!(second.value.previous, Some(first.key));
    assert!(second.timestamp() > first.timestamp());
    assert_eq!(third.value.previous, Some(second.key));

    let tip = feed.tip(&keypair.feed_id()).await.unwrap().unwrap();
    assert_eq!(tip, third);
    assert_eq!(feed.get(&second.key).await.unwrap(), Some(second.value.clone()));

    let history = feed.history(&keypair.feed_id(), 10).await.unwrap();
    let keys: Vec<_> = history.iter().map(|m| m.key).collect();
    assert_eq!(keys, vec![third.key, second.key, first.key]);

    let limited = feed.history(&keypair.feed_id(), 2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn test_feeds_are_independent() {
    let feed = memory_feed();
    let alice = Keypair::from_seed(&[0xa1; 32]);
    let bob = Keypair::from_seed(&[0xb0; 32]);

    feed.append_typed(&alice, "post", "a1").await.unwrap();
    feed.append_typed(&alice, "post", "a2").await.unwrap();
    let b1 = feed.append_typed(&bob, "post", "b1").await.unwrap();

    assert_eq!(b1.sequence(), 1);
    assert_eq!(
        feed.tip(&alice.feed_id()).await.unwrap().unwrap().sequence(),
        2
    );
    assert!(feed.tip(&Keypair::generate().feed_id()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_append_rejects_invalid_content_type() {
    let feed = memory_feed();
    let keypair = Keypair::generate();

    let err = feed.append_typed(&keypair, "ab", "short").await.unwrap_err();
    assert!(matches!(
        rejection(err),
        ValidationError::InvalidContentType { ref found, .. } if found == "ab"
    ));
    assert!(feed.tip(&keypair.feed_id()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_append_rejects_oversized_message() {
    let feed = memory_feed();
    let keypair = Keypair::generate();

    let err = feed
        .append_typed(&keypair, "post", "x".repeat(9000))
        .await
        .unwrap_err();
    assert!(matches!(
        rejection(err),
        ValidationError::EncodedSizeExceeded { limit: 8192, .. }
    ));
    assert!(feed.store().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_appends_stay_linear() {
    init_tracing();
    let feed = Arc::new(Feed::new(MemoryStore::new(), FeedConfig::default()));
    let keypair = Arc::new(Keypair::generate());

    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let feed = feed.clone();
            let keypair = keypair.clone();
            tokio::spawn(async move {
                feed.append_typed(keypair.as_ref(), "post", format!("concurrent {}", i))
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let history = feed.history(&keypair.feed_id(), 100).await.unwrap();
    assert_eq!(history.len(), 20);
    for pair in history.windows(2) {
        let (newer, older) = (&pair[0], &pair[1]);
        assert_eq!(newer.sequence(), older.sequence() + 1);
        assert_eq!(newer.value.previous, Some(older.key));
        assert!(newer.timestamp() > older.timestamp());
    }
    assert_eq!(feed.pending_writes(), 0);
}

// ─────────────────────────────────────────────────────────────────────────────
// Ingest
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_replayed_message_is_out_of_order() {
    let feed = memory_feed();
    let alice = TestFixture::with_seed([0x0a; 32]);

    let m1 = alice.genesis(post("first"));
    let k1 = m1.compute_id().unwrap();
    assert_eq!(
        feed.ingest(m1.clone()).await.unwrap(),
        IngestResult::Accepted(k1)
    );
    let s1 = feed.tip(&alice.feed_id()).await.unwrap().unwrap();

    let replay = alice.sign(
        MessageBuilder::new(alice.feed_id(), 2, post("first"))
            .timestamp_value(s1.timestamp().clone())
            .previous(s1.key),
    );
    let err = feed.ingest(replay).await.unwrap_err();
    assert!(matches!(
        rejection(err),
        ValidationError::OutOfOrder {
            expected_sequence: 2,
            sequence: 2,
            ..
        }
    ));
    assert_eq!(feed.tip(&alice.feed_id()).await.unwrap().unwrap().key, k1);

    let m2 = alice.next(&s1, post("second"));
    let k2 = m2.compute_id().unwrap();
    assert_eq!(feed.ingest(m2).await.unwrap(), IngestResult::Accepted(k2));

    let err = feed.ingest(m1).await.unwrap_err();
    assert!(matches!(
        rejection(err),
        ValidationError::PreviousMismatch { expected, found: None } if expected == k2
    ));
}

#[tokio::test]
async fn test_forged_author_is_rejected() {
    let feed = memory_feed();
    let alice = TestFixture::with_seed([0x0a; 32]);
    let mallory = TestFixture::with_seed([0x0b; 32]);

    let forged = mallory.sign(MessageBuilder::new(alice.feed_id(), 1, post("hi")).timestamp(1_000));

    let err = feed.ingest(forged).await.unwrap_err();
    assert!(matches!(rejection(err), ValidationError::SignatureInvalid));
    assert!(feed.tip(&alice.feed_id()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_ingest_of_current_tip_is_duplicate() {
    let feed = memory_feed();
    let message = TestFixture::new().genesis(post("once"));
    feed.ingest(message.clone()).await.unwrap();
    let batches = feed.store().batch_count();

    assert_eq!(feed.ingest(message).await.unwrap(), IngestResult::Duplicate);
    assert_eq!(feed.store().batch_count(), batches);
}

#[tokio::test]
async fn test_competing_successors_cannot_fork() {
    let feed = Arc::new(memory_feed());
    let fixture = TestFixture::new();

    let s1 = stored(fixture.genesis(post("root")));
    feed.ingest(s1.value.clone()).await.unwrap();

    let left = fixture.next(&s1, post("left"));
    let right = fixture.next(&s1, post("right"));

    let (a, b) = tokio::join!(feed.ingest(left), feed.ingest(right));
    let outcomes = [a, b];

    let accepted = outcomes.iter().filter(|r| r.is_ok()).count();
    assert_eq!(accepted, 1);
    for outcome in outcomes {
        if let Err(e) = outcome {
            assert!(matches!(
                rejection(e),
                ValidationError::PreviousMismatch { .. }
            ));
        }
    }
    assert_eq!(
        feed.tip(&fixture.feed_id()).await.unwrap().unwrap().sequence(),
        2
    );
}

#[tokio::test]
async fn test_signing_context_is_enforced() {
    init_tracing();
    let config = FeedConfig {
        signing_context: SigningContext::new("app-a"),
        ..FeedConfig::default()
    };
    let feed = Feed::new(MemoryStore::new(), config);
    let fixture = TestFixture::new().with_context(SigningContext::new("app-b"));

    let foreign = fixture.genesis(post("x"));
    let err = feed.ingest(foreign).await.unwrap_err();
    assert!(matches!(rejection(err), ValidationError::SignatureInvalid));

    let local = feed.append_typed(&fixture.keypair, "post", "x").await.unwrap();
    assert_eq!(local.sequence(), 1);
}

#[tokio::test]
async fn test_unvalidated_ingest_skips_checks() {
    init_tracing();
    let config = FeedConfig {
        validate_on_ingest: false,
        ..FeedConfig::default()
    };
    let feed = Feed::new(MemoryStore::new(), config);
    let alice = TestFixture::with_seed([0x0a; 32]);
    let mallory = TestFixture::with_seed([0x0b; 32]);

    let forged =
        mallory.sign(MessageBuilder::new(alice.feed_id(), 1, post("trusted")).timestamp(1_000));
    assert!(matches!(
        feed.ingest(forged).await.unwrap(),
        IngestResult::Accepted(_)
    ));
}

#[tokio::test]
async fn test_ingest_value_checks_shape_first() {
    let feed = memory_feed();
    let message = TestFixture::new().genesis(post("wire"));
    let wire = serde_json::to_value(&message).unwrap();

    let mut bad_sequence = wire.clone();
    bad_sequence["sequence"] = json!("1");
    let err = feed.ingest_value(&bad_sequence).await.unwrap_err();
    assert!(matches!(rejection(err), ValidationError::InvalidShape(_)));

    let mut bad_type = wire.clone();
    bad_type["content"]["type"] = json!("x".repeat(52));
    let err = feed.ingest_value(&bad_type).await.unwrap_err();
    assert!(matches!(
        rejection(err),
        ValidationError::InvalidContentType { .. }
    ));

    assert!(matches!(
        feed.ingest_value(&wire).await.unwrap(),
        IngestResult::Accepted(_)
    ));
}

#[tokio::test]
async fn test_fractional_timestamp_successor_is_ingested() {
    let feed = memory_feed();
    let fixture = TestFixture::with_seed([0x1f; 32]);

    let first = stored(fixture.genesis(post("whole")));
    feed.ingest(first.value.clone()).await.unwrap();

    let tie_break = Timestamp::from_f64(BASE_TIMESTAMP as f64 + 0.001).unwrap();
    let second = fixture.sign(
        MessageBuilder::new(fixture.feed_id(), 2, post("same millisecond"))
            .timestamp_value(tie_break.clone())
            .previous(first.key),
    );
    let wire: Value = serde_json::from_slice(&feedchain::core::encode(&second).unwrap()).unwrap();
    assert!(wire["timestamp"].is_f64());

    let key = second.compute_id().unwrap();
    assert_eq!(
        feed.ingest_value(&wire).await.unwrap(),
        IngestResult::Accepted(key)
    );

    let tip = feed.tip(&fixture.feed_id()).await.unwrap().unwrap();
    assert_eq!(tip.key, key);
    assert_eq!(tip.timestamp(), &tie_break);
    assert_eq!(feed.get(&key).await.unwrap(), Some(second));

    let third = fixture.next(&tip, post("later"));
    assert!(matches!(
        feed.ingest(third).await.unwrap(),
        IngestResult::Accepted(_)
    ));
}

// ─────────────────────────────────────────────────────────────────────────────
// Storage
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::test]
async fn test_storage_failure_leaves_tip_unchanged() {
    let feed = memory_feed();
    let keypair = Keypair::generate();

    let first = feed.append_typed(&keypair, "post", "kept").await.unwrap();

    feed.store().fail_next_batch("disk full");
    let err = feed.append_typed(&keypair, "post", "lost").await.unwrap_err();
    assert!(matches!(
        err,
        FeedError::Store(StoreError::StorageFailure(ref reason)) if reason.contains("disk full")
    ));
    assert!(!err.is_rejection());
    assert_eq!(feed.tip(&keypair.feed_id()).await.unwrap().unwrap(), first);

    let second = feed.append_typed(&keypair, "post", "retried").await.unwrap();
    assert_eq!(second.sequence(), 2);
    assert_eq!(second.value.previous, Some(first.key));
}

#[tokio::test]
async fn test_get_detects_corrupted_entry() {
    let feed = memory_feed();
    let keypair = Keypair::generate();

    let kept = feed.append_typed(&keypair, "post", "original").await.unwrap();
    let other = TestFixture::new().genesis(post("imposter"));

    feed.store()
        .batch(&[BatchOp::put(
            message_key(&kept.key),
            feedchain::core::encode(&other).unwrap(),
        )])
        .await
        .unwrap();

    assert!(matches!(
        feed.get(&kept.key).await,
        Err(FeedError::Corrupt { key, .. }) if key == kept.key
    ));
    assert!(feed.get(&other.compute_id().unwrap()).await.unwrap().is_none());
}

#[tokio::test]
async fn test_sqlite_feed_survives_reopen() {
    init_tracing();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("feeds.db");
    let keypair = Keypair::from_seed(&[0x5a; 32]);

    let second = {
        let feed = Feed::new(SqliteStore::open(&path).unwrap(), FeedConfig::default());
        feed.append_typed(&keypair, "post", "one").await.unwrap();
        feed.append_typed(&keypair, "post", "two").await.unwrap()
    };

    let feed = Feed::new(SqliteStore::open(&path).unwrap(), FeedConfig::default());
    assert_eq!(feed.tip(&keypair.feed_id()).await.unwrap().unwrap(), second);

    let third = feed.append_typed(&keypair, "post", "three").await.unwrap();
    assert_eq!(third.sequence(), 3);
    assert_eq!(third.value.previous, Some(second.key));
    assert_eq!(feed.history(&keypair.feed_id(), 10).await.unwrap().len(), 3);
}

// ─────────────────────────────────────────────────────────────────────────────
// Interleavings
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
enum Step {
    Append,
    IngestNext,
    Replay(usize),
}

fn step() -> impl Strategy<Value = Step> {
    prop_oneof![
        Just(Step::Append),
        Just(Step::IngestNext),
        any::<usize>().prop_map(Step::Replay),
    ]
}

fn check_linear(history: &[StoredMessage]) -> Result<(), TestCaseError> {
    for pair in history.windows(2) {
        let (newer, older) = (&pair[0], &pair[1]);
        prop_assert_eq!(newer.sequence(), older.sequence() + 1);
        prop_assert_eq!(newer.value.previous, Some(older.key));
        prop_assert!(newer.timestamp() > older.timestamp());
    }
    if let Some(oldest) = history.last() {
        prop_assert!(oldest.value.is_genesis());
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn prop_interleaved_appends_and_ingests_stay_linear(
        steps in prop::collection::vec(step(), 1..40)
    ) {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        runtime.block_on(async {
            let feed = memory_feed();
            let local = Keypair::from_seed(&[0x01; 32]);
            let remote = TestFixture::with_seed([0x02; 32]);
            let remote_chain = remote.chain(steps.len());
            let mut appended = 0u64;
            let mut ingested = 0usize;

            for step in &steps {
                match step {
                    Step::Append => {
                        let message = feed.append_typed(&local, "post", appended).await.unwrap();
                        appended += 1;
                        prop_assert_eq!(message.sequence(), appended);
                    }
                    Step::IngestNext => {
                        let next = &remote_chain[ingested];
                        prop_assert_eq!(
                            feed.ingest(next.value.clone()).await.unwrap(),
                            IngestResult::Accepted(next.key)
                        );
                        ingested += 1;
                    }
                    Step::Replay(pick) if ingested > 0 => {
                        let index = pick % ingested;
                        match feed.ingest(remote_chain[index].value.clone()).await {
                            Ok(IngestResult::Duplicate) => prop_assert_eq!(index, ingested - 1),
                            Ok(accepted) => prop_assert!(false, "replay accepted: {:?}", accepted),
                            Err(e) => prop_assert!(e.is_rejection(), "unexpected error: {}", e),
                        }
                    }
                    Step::Replay(_) => {}
                }
            }

            let local_history = feed.history(&local.feed_id(), usize::MAX).await.unwrap();
            prop_assert_eq!(local_history.len() as u64, appended);
            check_linear(&local_history)?;

            let remote_history = feed.history(&remote.feed_id(), usize::MAX).await.unwrap();
            let keys: Vec<_> = remote_history.iter().rev().map(|m| m.key).collect();
            let expected: Vec<_> = remote_chain[..ingested].iter().map(|m| m.key).collect();
            prop_assert_eq!(keys, expected);
            check_linear(&remote_history)?;
            Ok(())
        })?;
    }
}
