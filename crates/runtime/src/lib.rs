//! Splice Runtime: stack switching with linear stack references
//!
//! Key design principles:
//! - StackRef: the sole, non-copyable handle to a suspended stack
//! - Event: a tag plus the values carried across a switch
//! - StackCtx: what code running on a stack uses to switch, start, redirect
//!   and inspect
//!
//! Grounded stacks come from a `Host`; their final outcomes land there.
//! Detached stacks are created from inside the stack world and forward
//! their outcomes through an attachment slot.

pub mod config;
pub mod context;
pub mod diagnostics;
pub mod error;
pub mod event;
pub mod handle;
pub mod host;
pub mod inspect;
pub(crate) mod lifecycle;
pub mod logging;
pub mod redirect;
pub mod routine;
pub mod slot;
pub mod value;

pub use config::RuntimeConfig;
pub use context::StackCtx;
pub use error::{Fault, Outcome};
pub use event::Event;
pub use handle::{StackId, StackRef};
pub use host::{Grounder, Host, Landing};
pub use inspect::{Response, Split};
pub use routine::{Routine, RoutineFrame, RoutineState};
pub use slot::{FnSlot, Slot, SlotAccess};
pub use value::Value;

pub use splice_core::{
    LinearCell, Signature, StackEnd, StackKind, StatsSnapshot, Tag, Trap, ValueType, stack_stats,
};
