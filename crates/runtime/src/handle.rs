//! Stack references
//!
//! A `StackRef` is the sole handle to a suspended stack. It owns:
//!
//! - a port: the sending half of the stack's inbox
//! - the routine frames extended onto it and not yet entered
//! - an optional attachment slot to install when the stack is next entered
//!
//! Switching to a reference consumes it and posts one `Delivery` to the
//! inbox. Dropping it tears the stack down: pending frames go first, then the
//! stack's coroutine is told to unwind and the dropper blocks until every
//! local on that stack has been dropped.

use crate::context::StackCtx;
use crate::error::{Fault, Outcome};
use crate::inspect::InspectRequest;
use crate::routine::{Routine, RoutineFrame};
use crate::slot::SlotAccess;
use crate::value::Value;
use may::sync::mpsc::{self, Sender};
use splice_core::{Tag, Trap};
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique stack identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(u64);

impl StackId {
    pub(crate) fn next() -> StackId {
        StackId(NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// What a stack's inbox carries
pub(crate) enum Delivery {
    /// Resume at the suspension point with `outcome`, after entering `frames`
    Resume {
        frames: Vec<RoutineFrame>,
        attach: Option<Arc<dyn SlotAccess>>,
        outcome: Outcome,
    },
    /// Run `call` at the leaf first; its results become the resuming event
    Call {
        frames: Vec<RoutineFrame>,
        attach: Option<Arc<dyn SlotAccess>>,
        call: Box<dyn Routine>,
        inputs: Vec<Value>,
        event: Option<Tag>,
    },
    /// Serve an inspection walk without resuming
    Inspect(InspectRequest),
    /// Unwind everything and acknowledge once the locals are gone
    Teardown { ack: Sender<()> },
}

#[derive(Clone)]
pub(crate) struct Port {
    pub(crate) id: StackId,
    tx: Sender<Delivery>,
}

impl Port {
    pub(crate) fn new(id: StackId, tx: Sender<Delivery>) -> Port {
        Port { id, tx }
    }

    /// Post `delivery` to the inbox
    ///
    /// `sender` is the stack posting it, if any. A delivery that cannot be
    /// posted is discarded: every reference it carries is torn down, except
    /// the ones back to `sender`, which is still running the discard.
    pub(crate) fn deliver(&self, delivery: Delivery, sender: Option<StackId>) -> Result<(), Trap> {
        match self.tx.send(delivery) {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(stack = %self.id, "delivery to a stack that has already finished");
                err.0.discard(sender);
                Err(Trap::StackLost)
            }
        }
    }
}

impl Delivery {
    fn discard(self, sender: Option<StackId>) {
        let values = match self {
            Delivery::Resume {
                outcome: Ok(event),
                ..
            } => event.into_payload(),
            Delivery::Call { inputs, .. } => inputs,
            _ => return,
        };
        for value in values {
            match value {
                // Tearing this one down would wait on our own acknowledgement
                Value::Stack(stack) if Some(stack.id) == sender => stack.forget(),
                other => drop(other),
            }
        }
    }
}

/// A reference taken apart for delivery
pub(crate) struct Parts {
    pub(crate) port: Port,
    pub(crate) frames: Vec<RoutineFrame>,
    pub(crate) attach: Option<Arc<dyn SlotAccess>>,
}

impl Parts {
    pub(crate) fn resume(self, outcome: Outcome, sender: Option<StackId>) -> Result<(), Trap> {
        let delivery = Delivery::Resume {
            frames: self.frames,
            attach: self.attach,
            outcome,
        };
        self.port.deliver(delivery, sender)
    }
}

/// Linear handle to a suspended stack
pub struct StackRef {
    id: StackId,
    port: Option<Port>,
    frames: Vec<RoutineFrame>,
    detached: bool,
    attach: Option<Arc<dyn SlotAccess>>,
}

impl StackRef {
    pub(crate) fn new(port: Port, detached: bool) -> StackRef {
        StackRef {
            id: port.id,
            port: Some(port),
            frames: Vec::new(),
            detached,
            attach: None,
        }
    }

    /// A detached reference to a stack suspended inside an inspection,
    /// with the routine that completes the inspection already extended
    pub(crate) fn continuation(port: Port, completion: RoutineFrame) -> StackRef {
        StackRef {
            id: port.id,
            port: Some(port),
            frames: vec![completion],
            detached: true,
            attach: None,
        }
    }

    pub fn id(&self) -> StackId {
        self.id
    }

    /// Whether the stack has no root to return to and cannot be switched to
    pub fn is_detached(&self) -> bool {
        self.detached && self.attach.is_none()
    }

    /// Routine frames extended onto this reference and not entered yet
    pub fn pending_frames(&self) -> usize {
        self.frames.len()
    }

    /// Push a routine frame onto the stack; no switch happens
    ///
    /// `event` is the tag the routine's results are forwarded as when it
    /// falls off its end. Without one, falling off the end traps.
    pub fn extend<F>(self, routine: F, inputs: Vec<Value>, event: Option<&Tag>) -> StackRef
    where
        F: FnOnce(&mut StackCtx, Vec<Value>) -> Result<Vec<Value>, Fault> + Send + 'static,
    {
        self.extend_routine(Box::new(routine), inputs, event)
    }

    pub fn extend_routine(
        mut self,
        routine: Box<dyn Routine>,
        inputs: Vec<Value>,
        event: Option<&Tag>,
    ) -> StackRef {
        self.frames.push(RoutineFrame::new(routine, inputs, event));
        self
    }

    /// Give a detached stack a root: whatever reaches its bottom is forwarded
    /// to the stack held in `slot`, and inspection walks continue there
    pub fn attach(mut self, slot: Arc<dyn SlotAccess>) -> StackRef {
        self.attach = Some(slot);
        self
    }

    pub(crate) fn port(&self) -> Option<Port> {
        self.port.clone()
    }

    /// Consume the reference for a switch
    pub(crate) fn into_parts(mut self) -> Result<Parts, Trap> {
        if self.is_detached() {
            return Err(Trap::Detached);
        }
        let port = self.port.take().ok_or(Trap::StackLost)?;
        Ok(Parts {
            port,
            frames: std::mem::take(&mut self.frames),
            attach: self.attach.take(),
        })
    }

    pub(crate) fn resume(self, outcome: Outcome, sender: Option<StackId>) -> Result<(), Trap> {
        self.into_parts()?.resume(outcome, sender)
    }

    /// Let go of the reference without tearing the stack down.
    ///
    /// Only for a reference to a stack that is running again by other means.
    pub(crate) fn forget(mut self) {
        self.port = None;
    }
}

impl Drop for StackRef {
    fn drop(&mut self) {
        // Anything captured by pending frames goes down before this stack
        self.frames.clear();
        let Some(port) = self.port.take() else {
            return;
        };
        let (ack_tx, ack_rx) = mpsc::channel();
        let teardown = Delivery::Teardown { ack: ack_tx };
        if port.deliver(teardown, None).is_ok() {
            // Err means the stack finished without acknowledging; it is gone either way
            let _ = ack_rx.recv();
            debug!(stack = %self.id, "torn down");
        }
    }
}

impl fmt::Debug for StackRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StackRef({}", self.id)?;
        if !self.frames.is_empty() {
            write!(f, ", frames: {}", self.frames.len())?;
        }
        if self.is_detached() {
            write!(f, ", detached")?;
        }
        write!(f, ")")
    }
}
