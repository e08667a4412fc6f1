//! Message validation: stateless shape checks and chain linkage checks.
//!
//! Both validators are pure decision functions. They never mutate state, so
//! they may run concurrently for any number of feeds. Deciding which of two
//! valid-looking successors becomes the new tip is the caller's job.

use serde_json::Value;

use crate::canonical::{encode, encode_unsigned, signing_payload, MAX_MESSAGE_SIZE};
use crate::content::{describe, Content, MAX_TYPE_LEN, MIN_TYPE_LEN};
use crate::crypto::{is_feed_id, FeedId, SigningContext};
use crate::error::ValidationError;
use crate::message::{Message, StoredMessage};

/// Validate a message's shape without any chain context.
///
/// This performs:
/// - Sequence positivity
/// - Canonical encoding size limit
/// - Content type bounds (plaintext content only)
pub fn validate_shape(message: &Message) -> Result<(), ValidationError> {
    if message.sequence < 1 {
        return Err(ValidationError::InvalidShape(
            "sequence must be a positive integer".into(),
        ));
    }

    let size = encode(message)?.len();
    if size > MAX_MESSAGE_SIZE {
        return Err(ValidationError::EncodedSizeExceeded {
            size,
            limit: MAX_MESSAGE_SIZE,
        });
    }

    validate_content(&message.content)
}

/// Check that plaintext content carries a type of acceptable length.
///
/// Encrypted blobs are opaque and always pass.
pub fn validate_content(content: &Content) -> Result<(), ValidationError> {
    match content {
        Content::Encrypted { .. } => Ok(()),
        Content::Plaintext { content_type, .. } => {
            let len = content_type.chars().count();
            if (MIN_TYPE_LEN..MAX_TYPE_LEN).contains(&len) {
                Ok(())
            } else {
                Err(invalid_type(content_type.clone()))
            }
        }
    }
}

/// Validate an untyped wire value and parse it into a [`Message`].
///
/// Structural problems (not a record, non-integer sequence, malformed author,
/// content that is neither an object nor an encrypted blob) are reported as
/// `InvalidShape`. A content record whose `type` is missing or not a string
/// is reported as `InvalidContentType`. The parsed message then goes through
/// [`validate_shape`].
pub fn validate_shape_value(value: &Value) -> Result<Message, ValidationError> {
    let obj = value
        .as_object()
        .ok_or_else(|| ValidationError::InvalidShape("message must be an object".into()))?;

    if !obj.get("sequence").map_or(false, Value::is_u64) {
        return Err(ValidationError::InvalidShape(
            "sequence must be an integer".into(),
        ));
    }

    if !obj
        .get("author")
        .and_then(Value::as_str)
        .map_or(false, is_feed_id)
    {
        return Err(ValidationError::InvalidShape(
            "author must be a feed id".into(),
        ));
    }

    match obj.get("content") {
        Some(Value::Object(record)) => {
            if !matches!(record.get("type"), Some(Value::String(_))) {
                return Err(invalid_type(describe(record.get("type"))));
            }
        }
        Some(Value::String(blob)) if crate::content::is_encrypted_blob(blob) => {}
        _ => {
            return Err(ValidationError::InvalidShape(
                "content must be an object or an encrypted blob".into(),
            ))
        }
    }

    let message: Message = serde_json::from_value(value.clone())
        .map_err(|e| ValidationError::InvalidShape(e.to_string()))?;

    validate_shape(&message)?;
    Ok(message)
}

/// Validate that `candidate` is the legitimate next entry of `author`'s feed.
///
/// With no `previous` entry the candidate must be a genesis message: no
/// previous reference, sequence 1, positive timestamp. Otherwise it must
/// reference `previous.key`, follow its sequence by exactly one and carry a
/// strictly later timestamp. In both cases the author must match and the
/// signature must verify under `context`.
pub fn validate_against_chain(
    author: &FeedId,
    candidate: &Message,
    previous: Option<&StoredMessage>,
    context: &SigningContext,
) -> Result<(), ValidationError> {
    match previous {
        Some(prev) => {
            if candidate.previous.as_ref() != Some(&prev.key) {
                return Err(ValidationError::PreviousMismatch {
                    expected: prev.key,
                    found: candidate.previous,
                });
            }

            let expected_sequence = prev.value.sequence.checked_add(1);
            if expected_sequence != Some(candidate.sequence)
                || candidate.timestamp <= prev.value.timestamp
            {
                return Err(ValidationError::OutOfOrder {
                    expected_sequence: expected_sequence.unwrap_or(u64::MAX),
                    sequence: candidate.sequence,
                    previous_timestamp: prev.value.timestamp.clone(),
                    timestamp: candidate.timestamp.clone(),
                });
            }
        }
        None => {
            if !(candidate.previous.is_none()
                && candidate.sequence == 1
                && candidate.timestamp.is_positive())
            {
                return Err(ValidationError::ExpectedInitialMessage);
            }
        }
    }

    if &candidate.author != author {
        return Err(ValidationError::AuthorMismatch {
            expected: *author,
            found: candidate.author,
        });
    }

    verify_signature(author, candidate, context)
}

/// Verify a message's signature against `author` under `context`.
pub fn verify_signature(
    author: &FeedId,
    message: &Message,
    context: &SigningContext,
) -> Result<(), ValidationError> {
    let payload = signing_payload(context, &encode_unsigned(message)?)?;
    author
        .verify(&payload, &message.signature)
        .map_err(|_| ValidationError::SignatureInvalid)
}

fn invalid_type(found: String) -> ValidationError {
    ValidationError::InvalidContentType {
        found,
        min: MIN_TYPE_LEN,
        max: MAX_TYPE_LEN,
    }
}
