//! Cryptographic primitives for Feedchain.
//!
//! Wraps Ed25519 signing and SHA-256 hashing with strong types, and defines
//! the signing capability the message factory consumes.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use ed25519_dalek::{Signature as DalekSignature, Signer, SigningKey, Verifier, VerifyingKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// Sigil that prefixes every feed identifier.
pub const FEED_SIGIL: char = '@';

/// Suffix naming the key algorithm of a feed identifier.
pub const FEED_SUFFIX: &str = ".ed25519";

/// Suffix of an encoded signature.
pub const SIGNATURE_SUFFIX: &str = ".sig.ed25519";

/// A 32-byte SHA-256 hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Sha256Hash(pub [u8; 32]);

impl Sha256Hash {
    /// Compute the SHA-256 hash of the given data.
    pub fn hash(data: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(data);
        Self(hasher.finalize().into())
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for Sha256Hash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sha256({})", &self.to_hex()[..16])
    }
}

/// A feed identifier: the author's 32-byte Ed25519 public key.
///
/// Rendered as `@<base64>.ed25519`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FeedId(pub [u8; 32]);

impl FeedId {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a `@<base64>.ed25519` identity reference.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidFeedId(s.to_string());

        let body = s
            .strip_prefix(FEED_SIGIL)
            .and_then(|rest| rest.strip_suffix(FEED_SUFFIX))
            .ok_or_else(invalid)?;
        let bytes = STANDARD.decode(body).map_err(|_| invalid())?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self(arr))
    }

    /// Verify a signature over a message.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<(), CoreError> {
        let verifying_key =
            VerifyingKey::from_bytes(&self.0).map_err(|_| CoreError::InvalidPublicKey)?;

        let sig = DalekSignature::from_bytes(&signature.0);

        verifying_key
            .verify(message, &sig)
            .map_err(|_| CoreError::InvalidSignature)
    }
}

impl fmt::Debug for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for FeedId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", FEED_SIGIL, STANDARD.encode(self.0), FEED_SUFFIX)
    }
}

impl FromStr for FeedId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<[u8; 32]> for FeedId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for FeedId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for FeedId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        FeedId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// Identity-format check used by the shape validator.
pub fn is_feed_id(s: &str) -> bool {
    FeedId::parse(s).is_ok()
}

/// A 64-byte Ed25519 signature, rendered as `<base64>.sig.ed25519`.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Signature(pub [u8; 64]);

impl Signature {
    /// Create from raw bytes.
    pub const fn from_bytes(bytes: [u8; 64]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a `<base64>.sig.ed25519` string.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidSignatureEncoding(s.to_string());

        let body = s.strip_suffix(SIGNATURE_SUFFIX).ok_or_else(invalid)?;
        let bytes = STANDARD.decode(body).map_err(|_| invalid())?;
        let arr: [u8; 64] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self(arr))
    }

    /// The zero signature (invalid, used as placeholder).
    pub const ZERO: Self = Self([0u8; 64]);
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}...)", &self.to_hex()[..16])
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", STANDARD.encode(self.0), SIGNATURE_SUFFIX)
    }
}

impl Serialize for Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Signature::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// A scoping tag mixed into every signed payload.
///
/// Two protocols using different contexts cannot replay each other's
/// signatures. The empty context means "unscoped".
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SigningContext(Vec<u8>);

impl SigningContext {
    /// Create a context from a tag.
    pub fn new(tag: impl Into<Vec<u8>>) -> Self {
        Self(tag.into())
    }

    /// The unscoped context.
    pub fn none() -> Self {
        Self::default()
    }

    /// Get the raw tag bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Whether this is the unscoped context.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The signing capability consumed by the message factory.
pub trait SigningIdentity {
    /// The public identity messages are authored under.
    fn feed_id(&self) -> FeedId;

    /// Sign a fully prepared payload.
    fn sign(&self, payload: &[u8]) -> Signature;
}

/// A keypair for signing messages.
///
/// This wraps ed25519-dalek's SigningKey.
#[derive(Clone)]
pub struct Keypair {
    signing_key: SigningKey,
}

impl Keypair {
    /// Generate a new random keypair.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let signing_key = SigningKey::generate(&mut rng);
        Self { signing_key }
    }

    /// Create from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self { signing_key }
    }

    /// Get the feed identifier (public key).
    pub fn feed_id(&self) -> FeedId {
        FeedId(self.signing_key.verifying_key().to_bytes())
    }

    /// Sign a message.
    pub fn sign(&self, message: &[u8]) -> Signature {
        let sig = self.signing_key.sign(message);
        Signature(sig.to_bytes())
    }

    /// Get the raw seed bytes (secret key material).
    pub fn seed(&self) -> [u8; 32] {
        self.signing_key.to_bytes()
    }
}

impl SigningIdentity for Keypair {
    fn feed_id(&self) -> FeedId {
        Keypair::feed_id(self)
    }

    fn sign(&self, payload: &[u8]) -> Signature {
        Keypair::sign(self, payload)
    }
}

impl fmt::Debug for Keypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Keypair({:?})", self.feed_id())
    }
}
