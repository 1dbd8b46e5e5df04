//! Faults
//!
//! Every fallible operation on a stack returns `Result<_, Fault>`. A fault is
//! one of:
//!
//! - `Trap`: a fatal runtime error (see `splice_core::Trap`)
//! - `Thrown`: an exception carrying an event, caught by matching its tag
//! - `Teardown`: the current stack is being destroyed or handed off
//!
//! `Teardown` is not an error an application can handle. Code that sees it
//! must propagate it with `?` so every frame of the dying stack unwinds and
//! drops its locals. Swallowing it does not save the stack: every further
//! switch-family call on a doomed stack returns `Teardown` again.

use crate::event::Event;
use splice_core::{Tag, Trap};
use std::fmt;

#[derive(Debug, PartialEq)]
pub enum Fault {
    Trap(Trap),
    Thrown(Event),
    Teardown,
}

/// What a suspension point resumes with
pub type Outcome = Result<Event, Fault>;

impl Fault {
    pub fn is_teardown(&self) -> bool {
        matches!(self, Fault::Teardown)
    }

    pub fn trap(&self) -> Option<&Trap> {
        match self {
            Fault::Trap(trap) => Some(trap),
            _ => None,
        }
    }

    pub fn thrown(&self) -> Option<&Event> {
        match self {
            Fault::Thrown(event) => Some(event),
            _ => None,
        }
    }

    /// Catch a thrown event carrying `tag`; hand any other fault back
    pub fn catch(self, tag: &Tag) -> Result<Event, Fault> {
        match self {
            Fault::Thrown(event) if event.is(tag) => Ok(event),
            other => Err(other),
        }
    }
}

impl From<Trap> for Fault {
    fn from(trap: Trap) -> Self {
        Fault::Trap(trap)
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Fault::Trap(trap) => write!(f, "trap: {}", trap),
            Fault::Thrown(event) => write!(f, "uncaught event {}", event.tag()),
            Fault::Teardown => write!(f, "stack torn down"),
        }
    }
}

impl std::error::Error for Fault {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Fault::Trap(trap) => Some(trap),
            _ => None,
        }
    }
}

/// Format a panic payload into an error message
pub fn format_panic_payload(payload: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
