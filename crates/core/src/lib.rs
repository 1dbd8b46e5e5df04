//! Splice Core: vocabulary shared by the stack-switching runtime
//!
//! This crate holds the pieces of the execution model that do not depend on
//! the coroutine substrate:
//!
//! - Trap: the fatal error taxonomy
//! - Tag / ValueType: event identities and their payload signatures
//! - LinearCell: get-and-clear / set-only-if-clear storage
//! - StackStats: process-wide lifecycle counters
//!
//! # Modules
//!
//! - `error`: Fatal traps
//! - `tag`: Event tags and signature checks
//! - `linear`: Linear storage cells
//! - `stats`: Stack lifecycle statistics registry

pub mod error;
pub mod linear;
pub mod stats;
pub mod tag;

pub use error::Trap;
pub use linear::LinearCell;
pub use stats::{StackEnd, StackKind, StackStats, StatsSnapshot, stack_stats};
pub use tag::{Signature, Tag, ValueType};
