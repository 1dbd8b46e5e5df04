//! Slots: places a stack reference can be parked
//!
//! Every read of a stored reference is a clearing read and every write is a
//! clearing write, so a reference is never aliased through storage.
//! `SlotAccess` is the generalized form used by redirection: a local `Slot`,
//! or any get/set pair (a table cell, a field, a process-wide variable)
//! adapted with `FnSlot`.

use crate::handle::StackRef;
use splice_core::{LinearCell, Trap};
use std::fmt;

pub trait SlotAccess: Send + Sync {
    /// Take the stored reference, trapping if there is none
    fn get_clear(&self) -> Result<StackRef, Trap>;

    /// Store a reference, trapping if one is already stored
    fn set_cleared(&self, stack: StackRef) -> Result<(), Trap>;
}

/// A single-reference cell
#[derive(Debug, Default)]
pub struct Slot {
    cell: LinearCell<StackRef>,
}

impl Slot {
    pub fn new() -> Slot {
        Slot {
            cell: LinearCell::empty(),
        }
    }

    pub fn holding(stack: StackRef) -> Slot {
        Slot {
            cell: LinearCell::new(stack),
        }
    }

    pub fn is_clear(&self) -> bool {
        self.cell.is_clear()
    }
}

impl SlotAccess for Slot {
    fn get_clear(&self) -> Result<StackRef, Trap> {
        self.cell.get_clear()
    }

    fn set_cleared(&self, stack: StackRef) -> Result<(), Trap> {
        self.cell.set_cleared(stack)
    }
}

/// Slot backed by arbitrary get/set computations
pub struct FnSlot<G, S> {
    get: G,
    set: S,
}

impl<G, S> FnSlot<G, S>
where
    G: Fn() -> Result<StackRef, Trap> + Send + Sync,
    S: Fn(StackRef) -> Result<(), Trap> + Send + Sync,
{
    pub fn new(get: G, set: S) -> Self {
        FnSlot { get, set }
    }
}

impl<G, S> SlotAccess for FnSlot<G, S>
where
    G: Fn() -> Result<StackRef, Trap> + Send + Sync,
    S: Fn(StackRef) -> Result<(), Trap> + Send + Sync,
{
    fn get_clear(&self) -> Result<StackRef, Trap> {
        (self.get)()
    }

    fn set_cleared(&self, stack: StackRef) -> Result<(), Trap> {
        (self.set)(stack)
    }
}

impl<G, S> fmt::Debug for FnSlot<G, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnSlot")
    }
}
