//! Stack lifecycle: spawning and the root frame
//!
//! Each stack is a `may` coroutine whose entry point is `root_frame`. The
//! root frame parks until the stack's first delivery, and everything the
//! stack ever runs happens inside that first wait. When the wait returns,
//! control has reached the bottom of the stack, and what happens next
//! depends on how the stack got there:
//!
//! | How it ended              | Root frame action                              |
//! |---------------------------|------------------------------------------------|
//! | last reference dropped    | drop every local, then acknowledge the dropper |
//! | handed off                | drop every local, then deliver to the target   |
//! | grounded, outcome arrived | land the outcome on the host                   |
//! | detached, outcome arrived | forward to the stack in the attachment slot    |
//!
//! A detached stack with nothing in its attachment slot lands on the host
//! as an orphan.

use crate::config::RuntimeConfig;
use crate::context::{Doom, StackCtx, Wake};
use crate::error::{Fault, Outcome, format_panic_payload};
use crate::handle::{Port, StackId, StackRef};
use crate::host::Landing;
use may::coroutine;
use may::sync::mpsc::{self, Sender};
use splice_core::{StackEnd, StackKind, Trap, stack_stats};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

/// Mints stacks; carried by every stack so it can create detached ones
#[derive(Clone)]
pub(crate) struct Spawner {
    config: Arc<RuntimeConfig>,
    landings: Sender<Landing>,
}

impl Spawner {
    pub(crate) fn new(config: Arc<RuntimeConfig>, landings: Sender<Landing>) -> Spawner {
        Spawner { config, landings }
    }

    pub(crate) fn spawn(&self, kind: StackKind) -> Result<StackRef, Trap> {
        let id = StackId::next();
        let (tx, rx) = mpsc::channel();
        let port = Port::new(id, tx);
        let cx = StackCtx::new(id, kind, port.clone(), rx, self.clone());

        let builder = coroutine::Builder::new()
            .name(format!("splice-stack-{}", id.as_u64()))
            .stack_size(self.config.stack_size);

        // Safety: stacks keep no thread-local state across a park; everything
        // a stack owns lives in its StackCtx on the coroutine itself.
        match unsafe { builder.spawn(move || root_frame(cx)) } {
            Ok(_) => {
                stack_stats().record_created(kind);
                debug!(stack = %id, ?kind, "stack created");
                Ok(StackRef::new(port, kind == StackKind::Detached))
            }
            Err(e) => {
                warn!(stack = %id, "coroutine spawn failed: {}", e);
                Err(Trap::Spawn(e.to_string()))
            }
        }
    }

    fn land(&self, stack: StackId, outcome: Outcome, orphaned: bool) {
        if let Err(Fault::Trap(trap)) = &outcome {
            warn!(stack = %stack, orphaned, "trap reached the host: {}", trap);
        } else {
            debug!(stack = %stack, orphaned, "landed");
        }
        let landing = Landing {
            stack,
            outcome,
            orphaned,
        };
        if self.landings.send(landing).is_err() {
            debug!(stack = %stack, "host is gone; landing dropped");
        }
    }
}

fn root_frame(mut cx: StackCtx) {
    let reached = panic::catch_unwind(AssertUnwindSafe(|| cx.park()));
    let outcome = match reached {
        Ok(Ok(Wake::Outcome(outcome))) => outcome,
        Ok(Ok(Wake::Detached { .. })) => Err(Trap::DetachCrossesFrame.into()),
        Ok(Err(fault)) => Err(fault),
        Err(payload) => Err(Trap::Panicked(format_panic_payload(&payload)).into()),
    };

    let id = cx.id;
    let kind = cx.kind;
    let spawner = cx.spawner.clone();
    match cx.doom.take() {
        Some(Doom::Teardown(ack)) => {
            drop(outcome);
            drop(cx);
            stack_stats().record_ended(StackEnd::TornDown);
            let _ = ack.send(());
        }
        Some(Doom::Handoff {
            target,
            outcome: handed,
        }) => {
            drop(outcome);
            drop(cx);
            stack_stats().record_ended(StackEnd::TornDown);
            debug!(stack = %id, to = %target.id(), "handed off");
            if let Err(trap) = target.resume(handed, Some(id)) {
                warn!(stack = %id, "handoff failed: {}", trap);
            }
        }
        None => {
            let forward = match kind {
                StackKind::Grounded => None,
                StackKind::Detached => cx.root_slot.take().and_then(|slot| slot.get_clear().ok()),
            };
            drop(cx);
            stack_stats().record_ended(StackEnd::Exited);
            match forward {
                Some(target) => {
                    debug!(stack = %id, to = %target.id(), "forwarded from root");
                    if let Err(trap) = target.resume(outcome, Some(id)) {
                        warn!(stack = %id, "forward from root failed: {}", trap);
                    }
                }
                None => spawner.land(id, outcome, kind == StackKind::Detached),
            }
        }
    }
}
