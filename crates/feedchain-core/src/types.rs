//! Strong type definitions for Feedchain.
//!
//! All identifiers are newtypes to prevent misuse at compile time.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Number;
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::crypto::Sha256Hash;
use crate::error::CoreError;

/// Sigil that prefixes every message reference.
pub const MESSAGE_SIGIL: char = '%';

/// The digest used to chain messages together.
///
/// Carried on every message so the algorithm can be versioned later.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    #[default]
    Sha256,
}

impl HashAlgorithm {
    /// The wire tag of this algorithm.
    pub const fn tag(self) -> &'static str {
        match self {
            HashAlgorithm::Sha256 => "sha256",
        }
    }
}

/// A 32-byte message identifier, computed as SHA-256(encode(message)).
///
/// This is the content-address of a message and the value a successor stores
/// in its `previous` field. Rendered as `%<base64>.sha256`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MessageId(pub [u8; 32]);

impl MessageId {
    /// Create a new MessageId from raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Hash canonical bytes into a MessageId.
    pub fn from_canonical(bytes: &[u8]) -> Self {
        Self(Sha256Hash::hash(bytes).0)
    }

    /// Get the raw bytes.
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Convert to hex string.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse a `%<base64>.sha256` reference.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = || CoreError::InvalidMessageId(s.to_string());

        let body = s
            .strip_prefix(MESSAGE_SIGIL)
            .and_then(|rest| rest.strip_suffix(".sha256"))
            .ok_or_else(invalid)?;
        let bytes = STANDARD.decode(body).map_err(|_| invalid())?;
        let arr: [u8; 32] = bytes.try_into().map_err(|_| invalid())?;
        Ok(Self(arr))
    }
}

impl fmt::Debug for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageId({})", &self.to_hex()[..16])
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}.{}",
            MESSAGE_SIGIL,
            STANDARD.encode(self.0),
            HashAlgorithm::Sha256.tag()
        )
    }
}

impl FromStr for MessageId {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl AsRef<[u8]> for MessageId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl From<[u8; 32]> for MessageId {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl Serialize for MessageId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for MessageId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        MessageId::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// An author-claimed timestamp in Unix milliseconds.
///
/// Carried as a JSON number so fractional tie-breakers (`1449202158507.001`)
/// survive a decode/encode cycle byte for byte. Integral floats collapse to
/// integers, so `1000.0` and `1000` encode the same way. Ordering is numeric.
#[derive(Clone, Serialize)]
#[serde(transparent)]
pub struct Timestamp(Number);

impl Timestamp {
    /// A whole-millisecond timestamp.
    pub fn from_millis(ms: i64) -> Self {
        Self(Number::from(ms))
    }

    /// A possibly fractional timestamp. `None` for NaN and infinities.
    pub fn from_f64(ms: f64) -> Option<Self> {
        if ms.fract() == 0.0 && ms >= i64::MIN as f64 && ms < i64::MAX as f64 {
            return Some(Self::from_millis(ms as i64));
        }
        Number::from_f64(ms).map(Self)
    }

    /// The value as whole milliseconds, if it has no fractional part.
    pub fn as_i64(&self) -> Option<i64> {
        self.0.as_i64()
    }

    pub fn as_f64(&self) -> f64 {
        self.0.as_f64().unwrap_or(f64::NAN)
    }

    pub fn is_positive(&self) -> bool {
        match self.0.as_i64() {
            Some(ms) => ms > 0,
            None => self.0.as_u64().is_some() || self.as_f64() > 0.0,
        }
    }

    /// Shift by `ms` milliseconds, or `None` on overflow.
    pub fn checked_add_millis(&self, ms: i64) -> Option<Self> {
        match self.0.as_i64() {
            Some(current) => current.checked_add(ms).map(Self::from_millis),
            None => Self::from_f64(self.as_f64() + ms as f64),
        }
    }
}

impl From<i64> for Timestamp {
    fn from(ms: i64) -> Self {
        Self::from_millis(ms)
    }
}

impl PartialEq for Timestamp {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Timestamp {}

impl PartialOrd for Timestamp {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timestamp {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self.0.as_i64(), other.0.as_i64()) {
            (Some(a), Some(b)) => a.cmp(&b),
            _ => self.as_f64().total_cmp(&other.as_f64()),
        }
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({})", self.0)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let number = Number::deserialize(deserializer)?;
        if number.is_f64() {
            let value = number.as_f64().unwrap_or(f64::NAN);
            return Timestamp::from_f64(value)
                .ok_or_else(|| serde::de::Error::custom("timestamp must be finite"));
        }
        Ok(Timestamp(number))
    }
}

/// Check whether a string is a well-formed message reference.
pub fn is_message_id(s: &str) -> bool {
    MessageId::parse(s).is_ok()
}
