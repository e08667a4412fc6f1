//! Message content: either a typed plaintext record or an opaque encrypted blob.

use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::CoreError;

/// Minimum length of a content `type` (inclusive).
pub const MIN_TYPE_LEN: usize = 3;

/// Maximum length of a content `type` (exclusive).
pub const MAX_TYPE_LEN: usize = 52;

/// Marker that terminates the body of an encrypted blob.
pub const BOX_SUFFIX: &str = ".box";

/// The key holding the content type inside a plaintext record.
const TYPE_KEY: &str = "type";

/// The payload a message carries.
///
/// On the wire, `Plaintext` is a JSON object whose `type` key is emitted
/// first, followed by the remaining fields in key order. `Encrypted` is the
/// bare blob string.
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    Plaintext {
        content_type: String,
        fields: Map<String, Value>,
    },
    Encrypted {
        blob: String,
    },
}

impl Content {
    /// A plaintext record. A `type` key inside `fields` is discarded.
    pub fn plaintext(content_type: impl Into<String>, mut fields: Map<String, Value>) -> Self {
        fields.remove(TYPE_KEY);
        Content::Plaintext {
            content_type: content_type.into(),
            fields,
        }
    }

    /// A plaintext record of the form `{ "type": .., "value": .. }`.
    pub fn typed(content_type: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut fields = Map::new();
        fields.insert("value".to_string(), value.into());
        Self::plaintext(content_type, fields)
    }

    /// An encrypted blob. Fails unless `blob` has the encrypted-blob shape.
    pub fn encrypted(blob: impl Into<String>) -> Result<Self, CoreError> {
        let blob = blob.into();
        if !is_encrypted_blob(&blob) {
            return Err(CoreError::InvalidContent(format!(
                "not an encrypted blob: {}",
                blob
            )));
        }
        Ok(Content::Encrypted { blob })
    }

    /// Interpret a wire value as content.
    pub fn from_value(value: Value) -> Result<Self, CoreError> {
        match value {
            Value::Object(mut fields) => match fields.remove(TYPE_KEY) {
                Some(Value::String(content_type)) => Ok(Content::Plaintext {
                    content_type,
                    fields,
                }),
                other => Err(CoreError::InvalidContent(format!(
                    "content type must be a string, was: {}",
                    describe(other.as_ref())
                ))),
            },
            Value::String(blob) => Self::encrypted(blob),
            other => Err(CoreError::InvalidContent(format!(
                "content must be an object or an encrypted blob, was: {}",
                other
            ))),
        }
    }

    /// The content type, if this is plaintext.
    pub fn content_type(&self) -> Option<&str> {
        match self {
            Content::Plaintext { content_type, .. } => Some(content_type),
            Content::Encrypted { .. } => None,
        }
    }

    /// Look up a plaintext field.
    pub fn field(&self, key: &str) -> Option<&Value> {
        match self {
            Content::Plaintext { fields, .. } => fields.get(key),
            Content::Encrypted { .. } => None,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self, Content::Encrypted { .. })
    }
}

impl Serialize for Content {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Content::Plaintext {
                content_type,
                fields,
            } => {
                let mut map = serializer.serialize_map(Some(fields.len() + 1))?;
                map.serialize_entry(TYPE_KEY, content_type)?;
                for (k, v) in fields {
                    map.serialize_entry(k, v)?;
                }
                map.end()
            }
            Content::Encrypted { blob } => serializer.serialize_str(blob),
        }
    }
}

impl<'de> Deserialize<'de> for Content {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Content::from_value(value).map_err(serde::de::Error::custom)
    }
}

/// Whether `s` starts with a base64 body, at most two `=`, then `.box`.
///
/// Anything may follow the marker, so versioned suffixes such as `.box2`
/// are recognised too.
pub fn is_encrypted_blob(s: &str) -> bool {
    let body = s
        .bytes()
        .take_while(|b| b.is_ascii_alphanumeric() || *b == b'+' || *b == b'/')
        .count();
    if body == 0 {
        return false;
    }

    let rest = &s[body..];
    let padding = rest.bytes().take_while(|b| *b == b'=').count();
    padding <= 2 && rest[padding..].starts_with(BOX_SUFFIX)
}

/// Render a possibly-missing JSON value for error messages.
pub(crate) fn describe(value: Option<&Value>) -> String {
    match value {
        None => "missing".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
