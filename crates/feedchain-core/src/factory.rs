//! Message factory: builds the next signed message of a feed.
//!
//! The factory derives `sequence` and `previous` from the prior message and
//! draws `timestamp` from its clock, so sequence, linkage and timestamp order
//! hold by construction. The result must still pass the chain validator before it is
//! treated as accepted, since the feed may have advanced concurrently.

use serde_json::Value;

use crate::clock::{Clock, MonotonicClock};
use crate::content::Content;
use crate::crypto::{SigningContext, SigningIdentity};
use crate::error::CoreError;
use crate::message::{Message, MessageBuilder};
use crate::types::MessageId;

/// Creates signed messages under one signing context.
#[derive(Debug)]
pub struct MessageFactory<C: Clock = MonotonicClock> {
    clock: C,
    context: SigningContext,
}

impl MessageFactory<MonotonicClock> {
    /// A factory driven by the process-wide monotonic clock.
    pub fn new(context: SigningContext) -> Self {
        Self::with_clock(MonotonicClock::new(), context)
    }
}

impl Default for MessageFactory<MonotonicClock> {
    fn default() -> Self {
        Self::new(SigningContext::none())
    }
}

impl<C: Clock> MessageFactory<C> {
    pub fn with_clock(clock: C, context: SigningContext) -> Self {
        Self { clock, context }
    }

    pub fn context(&self) -> &SigningContext {
        &self.context
    }

    pub fn clock(&self) -> &C {
        &self.clock
    }

    /// Create the message following `previous` (or a genesis message).
    ///
    /// `previous` is referenced by the hash of its canonical encoding.
    pub fn create_from_content<I: SigningIdentity + ?Sized>(
        &self,
        identity: &I,
        content: Content,
        previous: Option<&Message>,
    ) -> Result<Message, CoreError> {
        let link = match previous {
            Some(prev) => Some((prev.sequence, prev.compute_id()?)),
            None => None,
        };
        self.assemble(identity, content, link)
    }

    /// Create a message with legacy `{ type, value }` content.
    pub fn create_from_typed_payload<I: SigningIdentity + ?Sized>(
        &self,
        identity: &I,
        content_type: &str,
        value: impl Into<Value>,
        previous: Option<&Message>,
    ) -> Result<Message, CoreError> {
        self.create_from_content(identity, Content::typed(content_type, value), previous)
    }

    /// Create the successor of `previous`, linking it by an explicit key
    /// instead of re-hashing `previous`.
    pub fn create_with_previous_key<I: SigningIdentity + ?Sized>(
        &self,
        identity: &I,
        content: Content,
        previous: &Message,
        previous_key: MessageId,
    ) -> Result<Message, CoreError> {
        self.assemble(identity, content, Some((previous.sequence, previous_key)))
    }

    fn assemble<I: SigningIdentity + ?Sized>(
        &self,
        identity: &I,
        content: Content,
        link: Option<(u64, MessageId)>,
    ) -> Result<Message, CoreError> {
        let (sequence, previous) = match link {
            Some((prev_seq, key)) => {
                let seq = prev_seq
                    .checked_add(1)
                    .ok_or(CoreError::SequenceOverflow(prev_seq))?;
                (seq, Some(key))
            }
            None => (1, None),
        };

        MessageBuilder::new(identity.feed_id(), sequence, content)
            .timestamp(self.clock.next())
            .previous_opt(previous)
            .sign(identity, &self.context)
    }
}
