//! Stack walk redirection
//!
//! `redirect(slot, body)` makes the frames below the redirect point
//! irrelevant to walks that start inside `body`. Instead, the walk continues
//! on whatever stack is parked in `slot`:
//!
//! - an inspection walk claims the slot, is served on the stack it held, and
//!   puts the reference back when the answer comes in
//! - an exception escaping `body` claims the slot for good: the current
//!   stack is torn down and the event is thrown at the claimed stack's
//!   suspension point, exactly as if it had been raised there
//!
//! A chain of stacks linked this way behaves like one logical stack.

use crate::context::{Doom, StackCtx};
use crate::error::Fault;
use crate::handle::StackRef;
use crate::inspect::Record;
use crate::slot::{FnSlot, SlotAccess};
use splice_core::Trap;
use std::sync::Arc;
use tracing::debug;

impl StackCtx {
    pub fn redirect<T, B>(&mut self, slot: Arc<dyn SlotAccess>, body: B) -> Result<T, Fault>
    where
        B: FnOnce(&mut StackCtx) -> Result<T, Fault>,
    {
        let depth = self.chain.len();
        self.chain.push(Record::Redirect(Arc::clone(&slot)));
        let result = body(self);
        self.chain.truncate(depth);

        match result {
            Err(Fault::Thrown(event)) if self.doom.is_none() => {
                let target = slot.get_clear()?;
                if target.is_detached() {
                    return Err(Trap::Detached.into());
                }
                debug!(
                    stack = %self.id,
                    to = %target.id(),
                    event = %event.tag(),
                    "exception redirected"
                );
                self.doom = Some(Doom::Handoff {
                    target,
                    outcome: Err(Fault::Thrown(event)),
                });
                Err(Fault::Teardown)
            }
            other => other,
        }
    }

    /// `redirect` through a computed slot
    pub fn redirect_via<G, S, T, B>(&mut self, get: G, set: S, body: B) -> Result<T, Fault>
    where
        G: Fn() -> Result<StackRef, Trap> + Send + Sync + 'static,
        S: Fn(StackRef) -> Result<(), Trap> + Send + Sync + 'static,
        B: FnOnce(&mut StackCtx) -> Result<T, Fault>,
    {
        self.redirect(Arc::new(FnSlot::new(get, set)), body)
    }
}
