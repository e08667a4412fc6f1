//! Proptest generators for property-based testing.

use proptest::prelude::*;
use serde_json::{Map, Value};

use feedchain_core::{
    Content, Keypair, Message, MessageBuilder, MessageId, SigningContext, MAX_TYPE_LEN,
    MIN_TYPE_LEN,
};

/// Generate a random keypair.
pub fn keypair() -> impl Strategy<Value = Keypair> {
    any::<[u8; 32]>().prop_map(|seed| Keypair::from_seed(&seed))
}

/// Generate a random MessageId.
pub fn message_id() -> impl Strategy<Value = MessageId> {
    any::<[u8; 32]>().prop_map(MessageId::from_bytes)
}

/// Generate a valid sequence number (1-indexed).
pub fn sequence() -> impl Strategy<Value = u64> {
    1u64..=u64::MAX
}

/// Generate a reasonable timestamp.
pub fn timestamp() -> impl Strategy<Value = i64> {
    0i64..=i64::MAX / 2
}

/// Generate a content type within the accepted length bounds.
pub fn content_type() -> impl Strategy<Value = String> {
    let pattern = format!("[a-z][a-z0-9-]{{{},{}}}", MIN_TYPE_LEN - 1, MAX_TYPE_LEN - 2);
    proptest::string::string_regex(&pattern).expect("valid content type pattern")
}

/// Generate a small JSON value.
pub fn json_value() -> impl Strategy<Value = Value> {
    let leaf = prop_oneof![
        Just(Value::Null),
        any::<bool>().prop_map(Value::from),
        any::<i32>().prop_map(Value::from),
        "[ -~]{0,24}".prop_map(Value::from),
    ];
    leaf.prop_recursive(2, 12, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
            prop::collection::btree_map("[a-z]{1,8}", inner, 0..4)
                .prop_map(|m| Value::Object(m.into_iter().collect())),
        ]
    })
}

/// Generate plaintext content with a few extra fields.
pub fn plaintext_content() -> impl Strategy<Value = Content> {
    (
        content_type(),
        prop::collection::btree_map("[a-z]{1,10}", json_value(), 0..4),
    )
        .prop_map(|(content_type, fields)| {
            let fields: Map<String, Value> = fields.into_iter().collect();
            Content::plaintext(content_type, fields)
        })
}

/// Generate an encrypted blob such as `c2VjcmV0.box` or `YQ==.box2`.
pub fn encrypted_content() -> impl Strategy<Value = Content> {
    "[A-Za-z0-9+/]{4,64}={0,2}\\.box[0-9]?".prop_filter_map("not a blob", |blob| {
        Content::encrypted(blob).ok()
    })
}

/// Generate either kind of content.
pub fn content() -> impl Strategy<Value = Content> {
    prop_oneof![3 => plaintext_content(), 1 => encrypted_content()]
}

/// Parameters for generating a message.
#[derive(Debug, Clone)]
pub struct MessageParams {
    pub keypair: Keypair,
    pub sequence: u64,
    pub timestamp: i64,
    pub previous: Option<MessageId>,
    pub content: Content,
}

impl Arbitrary for MessageParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            any::<[u8; 32]>(),
            1u64..=1000u64,
            0i64..=1_700_000_000_000i64,
            message_id(),
            content(),
        )
            .prop_map(|(seed, sequence, timestamp, prev, content)| MessageParams {
                keypair: Keypair::from_seed(&seed),
                sequence,
                timestamp,
                previous: (sequence > 1).then_some(prev),
                content,
            })
            .boxed()
    }
}

/// Sign a message from parameters under the empty context.
pub fn message_from_params(params: &MessageParams) -> Message {
    MessageBuilder::new(params.keypair.feed_id(), params.sequence, params.content.clone())
        .timestamp(params.timestamp)
        .previous_opt(params.previous)
        .sign(&params.keypair, &SigningContext::none())
        .expect("generated messages always encode")
}
