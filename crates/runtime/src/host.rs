//! Host capability
//!
//! Grounded stacks can only be minted through a `Host` (or a `Grounder`
//! cloned from one). The host owns the grounding frames: whatever reaches
//! the bottom of a grounded stack (results, uncaught exceptions, traps,
//! panics) is sent to the host as a `Landing`, and the stack ends there.
//!
//! `Host::enter` is the bridge from ordinary threads into the stack world:
//! it delivers one event and blocks until something lands.
//!
//! ```ignore
//! let mut host = Host::from_env();
//! let stack = host
//!     .create_grounded()?
//!     .extend(|cx, _| {
//!         let go = cx.start()?;
//!         Ok(go.into_payload())
//!     }, vec![], Some(&DONE));
//! let landing = host.enter(stack, Event::new(&GO, vec![Value::Int(1)])?)?;
//! ```

use crate::config::{self, RuntimeConfig};
use crate::error::Outcome;
use crate::event::Event;
use crate::handle::{StackId, StackRef};
use crate::lifecycle::Spawner;
use may::sync::mpsc::{self, Receiver};
use splice_core::{StackKind, Trap, stack_stats};
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// An outcome that reached the bottom of a stack with nowhere else to go
#[derive(Debug)]
pub struct Landing {
    pub stack: StackId,
    pub outcome: Outcome,
    /// A detached stack with an empty attachment slot, not a grounded one
    pub orphaned: bool,
}

impl Landing {
    /// The landed event, if the stack ended with one
    pub fn into_event(self) -> Option<Event> {
        self.outcome.ok()
    }
}

/// Capability to mint grounded stacks
#[derive(Clone)]
pub struct Grounder {
    spawner: Spawner,
}

impl Grounder {
    pub fn create_grounded(&self) -> Result<StackRef, Trap> {
        self.spawner.spawn(StackKind::Grounded)
    }
}

impl fmt::Debug for Grounder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Grounder")
    }
}

pub struct Host {
    grounder: Grounder,
    landings: Receiver<Landing>,
}

impl Host {
    /// Create a host; the first host in the process configures the scheduler
    pub fn new(config: RuntimeConfig) -> Host {
        config::init_scheduler(&config);
        let (tx, rx) = mpsc::channel();
        Host {
            grounder: Grounder {
                spawner: Spawner::new(Arc::new(config), tx),
            },
            landings: rx,
        }
    }

    pub fn from_env() -> Host {
        Host::new(RuntimeConfig::from_env())
    }

    pub fn grounder(&self) -> Grounder {
        self.grounder.clone()
    }

    pub fn create_grounded(&self) -> Result<StackRef, Trap> {
        self.grounder.create_grounded()
    }

    /// Switch into `target` with `event` and wait for the next landing
    ///
    /// The landing comes from whichever stack first reaches its bottom with
    /// nowhere else to go. That is often not `target`: a stack it switched to
    /// may land first, and so may an orphaned detached stack. Check
    /// `Landing::stack` to tell them apart.
    pub fn enter(&mut self, target: StackRef, event: Event) -> Result<Landing, Trap> {
        let parts = target.into_parts()?;
        stack_stats().record_switch();
        debug!(to = %parts.port.id, event = %event.tag(), "host enter");
        parts.resume(Ok(event), None)?;
        self.landings.recv().map_err(|_| Trap::StackLost)
    }
}

impl fmt::Debug for Host {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Host").finish_non_exhaustive()
    }
}
