//! Stack context and the switch family
//!
//! Every stack runs on its own `may` coroutine and owns one `StackCtx`. All
//! code running on the stack (routines, `switch_call` functions) gets
//! `&mut StackCtx`; it is the only way to suspend the stack.
//!
//! ## Suspension
//!
//! A switch posts a `Delivery` to the target's inbox, then blocks on its own
//! inbox. The coroutine stays parked until one of these arrives:
//!
//! - `Resume` / `Call`: frames extended onto our reference are entered,
//!   leaf first, and the resulting outcome is what the switch returns
//! - `Inspect`: a walk diverted here is served, and we keep waiting
//! - `Teardown`: the stack is doomed and the switch returns `Fault::Teardown`
//!
//! Only one stack of a graph is ever runnable: the yielder parks right after
//! its delivery is posted, and nothing else holds a reference to it.
//!
//! ## Doom
//!
//! A stack stops being usable when its last reference is dropped, or when it
//! hands itself off (`switch_drop`, or an exception leaving a `redirect`).
//! Either way the frames unwind through `Err(Fault::Teardown)` and the root
//! frame finishes the job once every local is gone.

use crate::error::{Fault, Outcome};
use crate::event::Event;
use crate::handle::{Delivery, Port, StackId, StackRef};
use crate::inspect::Record;
use crate::lifecycle::Spawner;
use crate::routine::{Routine, RoutineFrame, RoutineState};
use crate::slot::SlotAccess;
use crate::value::{Value, types_of};
use may::sync::mpsc::{Receiver, Sender};
use splice_core::{StackKind, Tag, Trap, stack_stats};
use std::convert::Infallible;
use std::sync::Arc;
use tracing::{debug, trace};

pub(crate) enum Doom {
    /// Last reference dropped; acknowledge once unwound
    Teardown(Sender<()>),
    /// Hand `outcome` to `target` once unwound
    Handoff { target: StackRef, outcome: Outcome },
}

/// How a parked stack was woken
pub(crate) enum Wake {
    Outcome(Outcome),
    /// A split served here detached its child
    Detached {
        payload: Vec<Value>,
        continuation: StackRef,
    },
}

struct RoutineSlot {
    first: Option<Outcome>,
    started: bool,
    suspended: bool,
}

pub struct StackCtx {
    pub(crate) id: StackId,
    pub(crate) kind: StackKind,
    pub(crate) port: Port,
    inbox: Receiver<Delivery>,
    pub(crate) spawner: Spawner,
    pub(crate) chain: Vec<Record>,
    routines: Vec<RoutineSlot>,
    pub(crate) root_slot: Option<Arc<dyn SlotAccess>>,
    pub(crate) doom: Option<Doom>,
    /// Nesting depth of parked waits on this stack
    pub(crate) waits: usize,
}

impl StackCtx {
    pub(crate) fn new(
        id: StackId,
        kind: StackKind,
        port: Port,
        inbox: Receiver<Delivery>,
        spawner: Spawner,
    ) -> StackCtx {
        StackCtx {
            id,
            kind,
            port,
            inbox,
            spawner,
            chain: Vec::new(),
            routines: Vec::new(),
            root_slot: None,
            doom: None,
            waits: 0,
        }
    }

    pub fn id(&self) -> StackId {
        self.id
    }

    pub fn is_grounded(&self) -> bool {
        self.kind == StackKind::Grounded
    }

    /// Whether the stack is unwinding towards teardown or a handoff
    pub fn is_doomed(&self) -> bool {
        self.doom.is_some()
    }

    /// The slot this stack was last attached to, if any
    pub fn root_slot(&self) -> Option<Arc<dyn SlotAccess>> {
        self.root_slot.clone()
    }

    /// State of the innermost routine frame, `None` outside any routine
    pub fn routine_state(&self) -> Option<RoutineState> {
        self.routines.last().map(|r| {
            if !r.started {
                RoutineState::Extended
            } else if r.suspended {
                RoutineState::Suspended
            } else {
                RoutineState::Running
            }
        })
    }

    /// Start marker of the innermost routine
    ///
    /// Returns the event that first switched into the frame, or its fault.
    pub fn start(&mut self) -> Outcome {
        if self.doom.is_some() {
            return Err(Fault::Teardown);
        }
        let depth = self.routines.len();
        let top = self.routines.last_mut().ok_or(Trap::NoRoutine)?;
        if top.started {
            return Err(Trap::AlreadyStarted.into());
        }
        top.started = true;
        let first = top.first.take();
        trace!(stack = %self.id, depth, "routine started");
        match first {
            Some(first) => first,
            None => Err(Trap::AlreadyStarted.into()),
        }
    }

    /// Mint an empty stack with no grounding frame
    pub fn create_detached(&self) -> Result<StackRef, Trap> {
        self.spawner.spawn(StackKind::Detached)
    }

    /// Transfer `values` plus a reference to this stack, tagged `tag`, to `target`
    ///
    /// Returns the event that eventually switches back in.
    pub fn switch(&mut self, tag: &Tag, values: Vec<Value>, target: StackRef) -> Outcome {
        match self.switch_inner(tag, values, target)? {
            Wake::Outcome(outcome) => outcome,
            Wake::Detached { .. } => Err(Trap::DetachCrossesFrame.into()),
        }
    }

    /// Run `func` on `target` with `values` plus a reference to this stack;
    /// its results are delivered at the target's leaf as `event`
    pub fn switch_call<F>(
        &mut self,
        func: F,
        mut values: Vec<Value>,
        target: StackRef,
        event: Option<&Tag>,
    ) -> Outcome
    where
        F: FnOnce(&mut StackCtx, Vec<Value>) -> Result<Vec<Value>, Fault> + Send + 'static,
    {
        self.ensure_running()?;
        let parts = target.into_parts()?;
        values.push(Value::Stack(self.self_ref()));
        stack_stats().record_switch();
        debug!(from = %self.id, to = %parts.port.id, "switch_call");
        let call = Delivery::Call {
            frames: parts.frames,
            attach: parts.attach,
            call: Box::new(func),
            inputs: values,
            event: event.cloned(),
        };
        parts.port.deliver(call, Some(self.id))?;
        match self.park()? {
            Wake::Outcome(outcome) => outcome,
            Wake::Detached { .. } => Err(Trap::DetachCrossesFrame.into()),
        }
    }

    /// Transfer `values` tagged `tag` to `target` and tear this stack down
    ///
    /// Always returns `Err`: `Teardown` once the handoff is arranged, which
    /// must be propagated so the frames unwind before `target` runs.
    pub fn switch_drop(
        &mut self,
        tag: &Tag,
        values: Vec<Value>,
        target: StackRef,
    ) -> Result<Infallible, Fault> {
        self.ensure_running()?;
        let event = Event::new(tag, values)?;
        if target.is_detached() {
            return Err(Trap::Detached.into());
        }
        stack_stats().record_switch();
        debug!(from = %self.id, to = %target.id(), event = %tag, "switch_drop");
        self.doom = Some(Doom::Handoff {
            target,
            outcome: Ok(event),
        });
        Err(Fault::Teardown)
    }

    pub(crate) fn ensure_running(&self) -> Result<(), Fault> {
        if self.doom.is_some() {
            return Err(Fault::Teardown);
        }
        match self.routines.last() {
            Some(top) if !top.started => Err(Trap::NotStarted.into()),
            _ => Ok(()),
        }
    }

    /// Reference to this stack, handed to whoever we switch to
    fn self_ref(&self) -> StackRef {
        let rootless = self.kind == StackKind::Detached && self.root_slot.is_none();
        StackRef::new(self.port.clone(), rootless)
    }

    pub(crate) fn switch_inner(
        &mut self,
        tag: &Tag,
        mut values: Vec<Value>,
        target: StackRef,
    ) -> Result<Wake, Fault> {
        self.ensure_running()?;
        tag.check_yield(&types_of(&values))?;
        let parts = target.into_parts()?;
        values.push(Value::Stack(self.self_ref()));
        stack_stats().record_switch();
        debug!(from = %self.id, to = %parts.port.id, event = %tag, "switch");
        let event = Event::unchecked(tag.clone(), values);
        parts.resume(Ok(event), Some(self.id))?;
        self.park()
    }

    /// Block until something switches back in
    pub(crate) fn park(&mut self) -> Result<Wake, Fault> {
        if let Some(top) = self.routines.last_mut() {
            top.suspended = true;
        }
        self.waits += 1;
        let wake = self.wait();
        self.waits -= 1;
        if let Some(top) = self.routines.last_mut() {
            top.suspended = false;
        }
        wake
    }

    fn wait(&mut self) -> Result<Wake, Fault> {
        loop {
            let delivery = self.inbox.recv().map_err(|_| Trap::StackLost)?;
            match delivery {
                Delivery::Resume {
                    frames,
                    attach,
                    outcome,
                } => {
                    self.install(attach);
                    return self.resume(frames, outcome);
                }
                Delivery::Call {
                    frames,
                    attach,
                    call,
                    inputs,
                    event,
                } => {
                    self.install(attach);
                    let first = self.invoke(call, inputs, event);
                    return self.resume(frames, first);
                }
                Delivery::Inspect(request) => {
                    if let Some(wake) = self.serve(request) {
                        return Ok(wake);
                    }
                }
                Delivery::Teardown { ack } => {
                    debug!(stack = %self.id, "teardown requested");
                    self.doom = Some(Doom::Teardown(ack));
                    return Err(Fault::Teardown);
                }
            }
        }
    }

    fn install(&mut self, attach: Option<Arc<dyn SlotAccess>>) {
        if let Some(slot) = attach {
            self.root_slot = Some(slot);
        }
    }

    fn resume(&mut self, frames: Vec<RoutineFrame>, outcome: Outcome) -> Result<Wake, Fault> {
        let outcome = self.run_frames(frames, outcome);
        if self.doom.is_some() {
            return Err(Fault::Teardown);
        }
        Ok(Wake::Outcome(outcome))
    }

    fn invoke(
        &mut self,
        call: Box<dyn Routine>,
        inputs: Vec<Value>,
        event: Option<Tag>,
    ) -> Outcome {
        let values = call.run(self, inputs)?;
        if self.doom.is_some() {
            return Err(Fault::Teardown);
        }
        match event {
            Some(tag) => Ok(Event::new(&tag, values)?),
            None => Err(Trap::MissingEvent.into()),
        }
    }

    /// Enter pending frames leaf first; each one's outcome enters the next
    fn run_frames(&mut self, mut frames: Vec<RoutineFrame>, first: Outcome) -> Outcome {
        let mut outcome = first;
        while let Some(frame) = frames.pop() {
            if self.doom.is_some() {
                return Err(Fault::Teardown);
            }
            outcome = self.enter(frame, outcome);
        }
        outcome
    }

    fn enter(&mut self, frame: RoutineFrame, first: Outcome) -> Outcome {
        let RoutineFrame {
            routine,
            inputs,
            event,
        } = frame;
        self.routines.push(RoutineSlot {
            first: Some(first),
            started: false,
            suspended: false,
        });
        let result = routine.run(self, inputs);
        let slot = self.routines.pop();
        if self.doom.is_some() {
            return Err(Fault::Teardown);
        }
        let started = slot.is_some_and(|s| s.started);
        match result {
            Ok(_) if !started => Err(Trap::MissingStart.into()),
            Ok(values) => match event {
                Some(tag) => Ok(Event::new(&tag, values)?),
                None => Err(Trap::UnforwardedReturn.into()),
            },
            Err(fault) => Err(fault),
        }
    }
}
