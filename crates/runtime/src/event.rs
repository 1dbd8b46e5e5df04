//! Events: the only vocabulary of control transfer
//!
//! An event is a tag plus a payload checked against the tag's signature.
//! Events are pure rendezvous data; they carry no identity beyond that.
//!
//! ## Catching on tag
//!
//! A suspension point resumes with whatever event arrived. Code that only
//! handles one tag uses `expect`: any other event is rethrown as
//! `Fault::Thrown` and propagates with `?` like an uncaught exception.
//!
//! ```ignore
//! let event = cx.switch(&PING, vec![Value::Int(1)], peer)?;
//! let (payload, peer) = event.expect_yield(&PONG)?;
//! ```

use crate::error::Fault;
use crate::handle::StackRef;
use crate::value::{Value, types_of};
use splice_core::{Tag, Trap};
use std::fmt;

pub struct Event {
    tag: Tag,
    payload: Vec<Value>,
}

impl Event {
    /// Build an event, trapping if the payload does not fit the tag
    pub fn new(tag: &Tag, payload: Vec<Value>) -> Result<Event, Trap> {
        tag.check_params(&types_of(&payload))?;
        Ok(Event::unchecked(tag.clone(), payload))
    }

    pub(crate) fn unchecked(tag: Tag, payload: Vec<Value>) -> Event {
        Event { tag, payload }
    }

    pub fn tag(&self) -> &Tag {
        &self.tag
    }

    pub fn is(&self, tag: &Tag) -> bool {
        self.tag == *tag
    }

    pub fn payload(&self) -> &[Value] {
        &self.payload
    }

    pub fn into_payload(self) -> Vec<Value> {
        self.payload
    }

    /// Accept this event if it carries `tag`, otherwise rethrow it
    pub fn expect(self, tag: &Tag) -> Result<Vec<Value>, Fault> {
        if self.is(tag) {
            Ok(self.payload)
        } else {
            Err(Fault::Thrown(self))
        }
    }

    /// Accept a switch-family event, splitting off the yielding stack reference
    pub fn expect_yield(self, tag: &Tag) -> Result<(Vec<Value>, StackRef), Fault> {
        let mut payload = self.expect(tag)?;
        match payload.pop().and_then(Value::into_stack) {
            Some(yielder) => Ok((payload, yielder)),
            None => Err(Trap::SignatureMismatch {
                tag: tag.name().to_string(),
                expected: tag.params().to_string(),
                found: "(no trailing stack)".to_string(),
            }
            .into()),
        }
    }
}

impl fmt::Debug for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{:?}", self.tag, self.payload)
    }
}

impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag && self.payload == other.payload
    }
}
