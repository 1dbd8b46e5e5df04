//! Routine frames
//!
//! A routine is the only kind of frame that can be pushed onto a stack from
//! outside it. It differs from a function in two ways:
//!
//! 1. It must call `StackCtx::start` exactly once. Whatever event entered the
//!    stack is delivered there (thrown, if it was an exception).
//! 2. Its results do not return to a caller. They are packaged as the event
//!    configured at `extend` time and forwarded to the frame it was extended
//!    onto; an escaping fault is forwarded the same way.
//!
//! ```text
//! Extended ──first switch in──► prelude ──start()──► Running ⇄ Suspended
//!                                                      │
//!                                         falls off ───┴──► forwarded as event
//! ```

use crate::context::StackCtx;
use crate::error::Fault;
use crate::value::Value;
use splice_core::Tag;
use std::fmt;

pub trait Routine: Send + 'static {
    fn run(self: Box<Self>, cx: &mut StackCtx, inputs: Vec<Value>) -> Result<Vec<Value>, Fault>;
}

impl<F> Routine for F
where
    F: FnOnce(&mut StackCtx, Vec<Value>) -> Result<Vec<Value>, Fault> + Send + 'static,
{
    fn run(self: Box<Self>, cx: &mut StackCtx, inputs: Vec<Value>) -> Result<Vec<Value>, Fault> {
        (*self)(cx, inputs)
    }
}

/// Observable state of the innermost routine of a stack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoutineState {
    /// Entered, start marker not reached yet
    Extended,
    Running,
    /// Waiting in a switch; observable from code that runs on the stack
    /// meanwhile (a `switch_call` function)
    Suspended,
}

/// A routine waiting on a stack reference to be entered
pub struct RoutineFrame {
    pub(crate) routine: Box<dyn Routine>,
    pub(crate) inputs: Vec<Value>,
    pub(crate) event: Option<Tag>,
}

impl RoutineFrame {
    pub fn new(routine: Box<dyn Routine>, inputs: Vec<Value>, event: Option<&Tag>) -> RoutineFrame {
        RoutineFrame {
            routine,
            inputs,
            event: event.cloned(),
        }
    }

    /// Event the routine's results are forwarded as
    pub fn event(&self) -> Option<&Tag> {
        self.event.as_ref()
    }
}

impl fmt::Debug for RoutineFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RoutineFrame")
            .field("inputs", &self.inputs)
            .field("event", &self.event)
            .finish_non_exhaustive()
    }
}
