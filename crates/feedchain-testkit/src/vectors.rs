//! Golden test vectors for deterministic verification.
//!
//! Each vector fixes every input of a message (seed, position, timestamp,
//! content, signing context) together with the ID its canonical encoding
//! must hash to. Ed25519 signatures are deterministic, so any change to the
//! encoding, the signing payload or the hash shows up as a mismatch.

use serde_json::json;

use feedchain_core::{Content, Keypair, Message, MessageBuilder, MessageId, SigningContext};

/// A golden test vector.
#[derive(Debug, Clone)]
pub struct GoldenVector {
    /// Human-readable name for the vector.
    pub name: &'static str,
    /// Seed for deterministic key generation.
    pub seed: [u8; 32],
    pub sequence: u64,
    pub timestamp: i64,
    /// Index of the vector this one follows, if any.
    pub follows: Option<usize>,
    pub content: fn() -> Content,
    pub context: &'static [u8],
    /// Expected message ID (`%<base64>.sha256`).
    pub expected_id: &'static str,
}

/// Get all golden test vectors.
pub fn all_vectors() -> Vec<GoldenVector> {
    vec![
        GoldenVector {
            name: "genesis post",
            seed: [0x01; 32],
            sequence: 1,
            timestamp: 1_449_202_158_507,
            follows: None,
            content: || Content::typed("post", "hello world"),
            context: b"",
            expected_id: "%YDxG1a3B4izeDDaAZpagCjLUAItzmNshGjVrg5IuMn0=.sha256",
        },
        GoldenVector {
            name: "second post",
            seed: [0x01; 32],
            sequence: 2,
            timestamp: 1_449_202_159_507,
            follows: Some(0),
            content: || Content::typed("post", "second"),
            context: b"",
            expected_id: "%gq7KKP+FNuzrn/dwSklP1cquHdgdWS8rClc9i0ET5YA=.sha256",
        },
        GoldenVector {
            name: "encrypted genesis",
            seed: [0x02; 32],
            sequence: 1,
            timestamp: 1,
            follows: None,
            content: || Content::Encrypted {
                blob: "aGVsbG8=.box".into(),
            },
            context: b"",
            expected_id: "%YUxCVb1MNh/s0Rkdx0Vr9Mrd7XjcAKUB0+1sGmGxJIw=.sha256",
        },
        GoldenVector {
            name: "nested value under a signing context",
            seed: [0x03; 32],
            sequence: 1,
            timestamp: 1_700_000_000_000,
            follows: None,
            content: || Content::typed("vote", json!({ "value": 1, "link": "abc" })),
            context: b"feedchain-test",
            expected_id: "%23/hMNrdHVJlvw0tbGsNMkPGqNltk09747pKzE5SBwo=.sha256",
        },
    ]
}

/// Build the message every vector describes, in order.
///
/// A vector that follows another links to the message built for it.
pub fn generate_messages() -> Vec<Message> {
    let vectors = all_vectors();
    let mut out: Vec<Message> = Vec::with_capacity(vectors.len());

    for vector in &vectors {
        let previous = vector
            .follows
            .map(|i| out[i].compute_id().expect("vector messages always encode"));
        out.push(generate_message_from_vector(vector, previous));
    }

    out
}

/// Build the message a single vector describes.
pub fn generate_message_from_vector(vector: &GoldenVector, previous: Option<MessageId>) -> Message {
    let keypair = Keypair::from_seed(&vector.seed);
    MessageBuilder::new(keypair.feed_id(), vector.sequence, (vector.content)())
        .timestamp(vector.timestamp)
        .previous_opt(previous)
        .sign(&keypair, &SigningContext::new(vector.context))
        .expect("vector messages always encode")
}

/// Check every vector against its expected ID.
///
/// Returns `(name, matches, actual id)` per vector.
pub fn verify_all_vectors() -> Vec<(String, bool, String)> {
    all_vectors()
        .iter()
        .zip(generate_messages())
        .map(|(v, message)| {
            let actual = message
                .compute_id()
                .map(|id| id.to_string())
                .unwrap_or_else(|e| e.to_string());
            (v.name.to_string(), actual == v.expected_id, actual)
        })
        .collect()
}
