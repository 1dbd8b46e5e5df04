//! Traps: fatal, unrecoverable runtime errors
//!
//! A trap signals a programming error in the application layer (a linearity
//! violation, a malformed payload, a routine that falls off its end with
//! nowhere to forward its results). Traps are plain values: they travel down
//! a stack as `Err` until they reach the grounding frame, where the host
//! decides what termination means.
//!
//! Nothing in the runtime recovers from a trap automatically.

use std::fmt;

/// Fatal runtime error
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trap {
    /// Clearing read of an empty slot (switching to a null reference)
    NullReference,
    /// Clearing write onto a slot that already holds a value
    SlotOccupied,
    /// Switch to a stack that has no root (detached and not re-attached)
    Detached,
    /// Switch-family operation before the innermost routine reached its start marker
    NotStarted,
    /// Start marker reached a second time
    AlreadyStarted,
    /// Start marker used outside of any routine frame
    NoRoutine,
    /// Routine returned without ever reaching its start marker
    MissingStart,
    /// Routine fell off its end and no forwarding event was configured
    UnforwardedReturn,
    /// `switch_call` function returned and no event was supplied
    MissingEvent,
    /// Payload does not fit the tag signature
    SignatureMismatch {
        tag: String,
        expected: String,
        found: String,
    },
    /// `call_stack` found no applicable answer before reaching a grounding frame
    Unanswered { tag: String },
    /// Detach requested by a responder that cannot split the requesting stack
    DetachCrossesFrame,
    /// Target stack vanished while a reference to it was still live
    StackLost,
    /// Coroutine could not be spawned for a new stack
    Spawn(String),
    /// Application code panicked; payload formatted
    Panicked(String),
}

impl fmt::Display for Trap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trap::NullReference => write!(f, "clearing read of an empty stack slot"),
            Trap::SlotOccupied => write!(f, "clearing write onto an occupied stack slot"),
            Trap::Detached => write!(f, "switch to a detached stack"),
            Trap::NotStarted => {
                write!(f, "switch before the routine reached its start marker")
            }
            Trap::AlreadyStarted => write!(f, "routine start marker reached twice"),
            Trap::NoRoutine => write!(f, "start marker outside of a routine frame"),
            Trap::MissingStart => write!(f, "routine returned without reaching its start marker"),
            Trap::UnforwardedReturn => {
                write!(f, "routine returned with no forwarding event configured")
            }
            Trap::MissingEvent => write!(f, "switch_call function returned with no event"),
            Trap::SignatureMismatch {
                tag,
                expected,
                found,
            } => write!(
                f,
                "payload for '{}' does not match signature: expected {}, found {}",
                tag, expected, found
            ),
            Trap::Unanswered { tag } => write!(f, "no answer for '{}' on the stack", tag),
            Trap::DetachCrossesFrame => {
                write!(f, "detach requested across a frame that cannot be split")
            }
            Trap::StackLost => write!(f, "target stack is no longer alive"),
            Trap::Spawn(msg) => write!(f, "failed to spawn stack: {}", msg),
            Trap::Panicked(msg) => write!(f, "panic on stack: {}", msg),
        }
    }
}

impl std::error::Error for Trap {}
