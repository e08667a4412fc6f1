//! # Feedchain Core
//!
//! Pure primitives for Feedchain: signed messages, canonical encoding and
//! the validators that decide whether a message may extend a feed.
//!
//! This crate contains no I/O, no storage, no networking. It is pure computation
//! over cryptographic data structures.
//!
//! ## Key Types
//!
//! - [`Message`] - One immutable, signed entry of a feed
//! - [`MessageId`] - Content-addressed identifier (SHA-256 of the canonical encoding)
//! - [`FeedId`] - The author's Ed25519 public key
//! - [`Content`] - Typed plaintext record or opaque encrypted blob
//! - [`MessageFactory`] - Builds the next signed message of a feed
//!
//! ## Validation
//!
//! [`validate_shape`] checks a message in isolation; [`validate_against_chain`]
//! checks it against the current tip of its feed.
//!
//! ## Canonicalization
//!
//! Messages are encoded as two-space indented JSON with a fixed field order.
//! See the [`canonical`] module.

pub mod canonical;
pub mod clock;
pub mod content;
pub mod crypto;
pub mod error;
pub mod factory;
pub mod message;
pub mod types;
pub mod validation;

pub use canonical::{decode, encode, encode_unsigned, signing_payload, MAX_MESSAGE_SIZE};
pub use clock::{Clock, ManualClock, MonotonicClock};
pub use content::{is_encrypted_blob, Content, MAX_TYPE_LEN, MIN_TYPE_LEN};
pub use crypto::{
    is_feed_id, FeedId, Keypair, Sha256Hash, Signature, SigningContext, SigningIdentity,
};
pub use error::{CoreError, ValidationError};
pub use factory::MessageFactory;
pub use message::{Message, MessageBuilder, StoredMessage};
pub use types::{is_message_id, HashAlgorithm, MessageId, Timestamp};
pub use validation::{
    validate_against_chain, validate_content, validate_shape, validate_shape_value,
    verify_signature,
};
