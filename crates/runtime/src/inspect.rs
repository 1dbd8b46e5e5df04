//! Stack inspection
//!
//! `answer(tag, responder, body)` registers a responder for `tag` while
//! `body` runs. `call_stack(tag, inputs)` anywhere below finds the innermost
//! answer for `tag` and gets the responder's outputs back, without unwinding
//! anything in between.
//!
//! The walk goes down the stack's record chain:
//!
//! ```text
//!   call_stack ──► [answer $a] ──► [redirect slot] ──► [answer $b] ──► bottom
//!                                        │
//!                                        └──► claimed; walk continues on the
//!                                             stack parked in the slot
//! ```
//!
//! At the bottom a detached stack continues through its attachment slot; a
//! grounded stack traps with `Unanswered`. A diverted walk is served by the
//! parked stack's own coroutine, which answers from its suspension point and
//! stays parked.
//!
//! ## Splitting
//!
//! `split` runs its body on a fresh detached stack attached to the caller,
//! under an answer whose responder may detach. Detaching hands the body's
//! remaining continuation back to the `split` call site as a reference,
//! parked at the `call_stack` with a completion routine extended on top.
//! When the continuation is resumed, the completion's results become the
//! outputs of that `call_stack`.

use crate::context::{StackCtx, Wake};
use crate::error::Fault;
use crate::event::Event;
use crate::handle::{Delivery, Port, StackId, StackRef};
use crate::routine::RoutineFrame;
use crate::slot::{Slot, SlotAccess};
use crate::value::{Value, types_of};
use may::sync::mpsc::{self, Sender};
use splice_core::{StackKind, Tag, Trap, ValueType, stack_stats};
use std::fmt;
use std::sync::{Arc, LazyLock};
use tracing::{debug, trace};

static SPLIT_ENTER: LazyLock<Tag> = LazyLock::new(|| Tag::new("split-enter", [ValueType::Stack]));
static INSPECT_REPLY: LazyLock<Tag> = LazyLock::new(|| Tag::variadic("inspect-reply"));

type Respond = Box<dyn FnMut(Vec<Value>) -> Result<Vec<Value>, Fault> + Send>;
type RespondDetaching = Box<dyn FnMut(Vec<Value>) -> Result<Response, Fault> + Send>;

/// One entry of a stack's dynamic record chain
pub(crate) enum Record {
    Answer { tag: Tag, responder: Responder },
    Redirect(Arc<dyn SlotAccess>),
}

pub(crate) enum Responder {
    Plain(Respond),
    /// Installed by `split`; may only detach its own child, served directly
    /// from the wait the split is parked in
    Detaching {
        child: StackId,
        waits: usize,
        respond: RespondDetaching,
    },
}

/// What a splitting responder decides
pub enum Response {
    Reply(Vec<Value>),
    Detach {
        payload: Vec<Value>,
        completion: RoutineFrame,
    },
}

impl Response {
    /// Detach the requesting continuation
    ///
    /// `payload` goes to the `split` call site. `completion` runs on the
    /// continuation when it is next switched into; it must reach its start
    /// marker, and its results are returned from the pending `call_stack`.
    pub fn detach<F>(payload: Vec<Value>, completion: F) -> Response
    where
        F: FnOnce(&mut StackCtx, Vec<Value>) -> Result<Vec<Value>, Fault> + Send + 'static,
    {
        Response::Detach {
            payload,
            completion: RoutineFrame::new(Box::new(completion), Vec::new(), Some(&*INSPECT_REPLY)),
        }
    }
}

impl fmt::Debug for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::Reply(values) => f.debug_tuple("Reply").field(values).finish(),
            Response::Detach { payload, .. } => {
                f.debug_struct("Detach").field("payload", payload).finish()
            }
        }
    }
}

/// How a `split` came back
#[derive(Debug)]
pub enum Split {
    /// The body finished; its results as the `done` event
    Returned(Event),
    /// The body's continuation was detached by the responder
    Detached {
        payload: Vec<Value>,
        continuation: StackRef,
    },
}

/// The stack a diverted walk started on
pub(crate) struct Origin {
    id: StackId,
    port: Port,
    /// Redirections crossed since the origin
    hops: usize,
}

pub(crate) struct InspectRequest {
    tag: Tag,
    inputs: Vec<Value>,
    reply: Sender<Reply>,
    origin: Origin,
}

enum Reply {
    Values(Vec<Value>),
    Raised(Fault),
    Detached,
}

enum Walked {
    Values(Vec<Value>),
    /// Served here: a splitting responder detached the origin
    Detach {
        payload: Vec<Value>,
        completion: RoutineFrame,
    },
    /// Diverted from here: our own continuation was detached
    Detached,
}

impl StackCtx {
    /// Run `body` with `responder` answering `call_stack(tag, ..)` beneath it
    pub fn answer<T, R, B>(&mut self, tag: &Tag, responder: R, body: B) -> Result<T, Fault>
    where
        R: FnMut(Vec<Value>) -> Result<Vec<Value>, Fault> + Send + 'static,
        B: FnOnce(&mut StackCtx) -> Result<T, Fault>,
    {
        let depth = self.chain.len();
        self.chain.push(Record::Answer {
            tag: tag.clone(),
            responder: Responder::Plain(Box::new(responder)),
        });
        let result = body(self);
        self.chain.truncate(depth);
        result
    }

    /// Invoke the innermost answer for `tag`
    pub fn call_stack(&mut self, tag: &Tag, inputs: Vec<Value>) -> Result<Vec<Value>, Fault> {
        if self.doom.is_some() {
            return Err(Fault::Teardown);
        }
        tag.check_params(&types_of(&inputs))?;
        stack_stats().record_inspection();

        let outputs = match self.walk(tag, inputs, None)? {
            Walked::Values(values) => values,
            Walked::Detached => {
                debug!(stack = %self.id, tag = %tag, "continuation detached");
                match self.park()? {
                    Wake::Outcome(outcome) => outcome?.expect(&INSPECT_REPLY)?,
                    Wake::Detached { .. } => return Err(Trap::DetachCrossesFrame.into()),
                }
            }
            Walked::Detach { .. } => return Err(Trap::DetachCrossesFrame.into()),
        };
        tag.check_results(&types_of(&outputs))?;
        Ok(outputs)
    }

    /// Run `body` on its own stack, under a responder for `tag` that may
    /// detach it
    ///
    /// The body's results come back as `Split::Returned(done(results))`; an
    /// exception escaping the body is thrown here.
    pub fn split<R, B>(
        &mut self,
        tag: &Tag,
        responder: R,
        done: &Tag,
        body: B,
    ) -> Result<Split, Fault>
    where
        R: FnMut(Vec<Value>) -> Result<Response, Fault> + Send + 'static,
        B: FnOnce(&mut StackCtx) -> Result<Vec<Value>, Fault> + Send + 'static,
    {
        self.ensure_running()?;
        let child = self.create_detached()?;
        let child_id = child.id();
        let child = child
            .extend(
                move |cx: &mut StackCtx, _inputs: Vec<Value>| {
                    let entry = cx.start()?;
                    let (_, parent) = entry.expect_yield(&SPLIT_ENTER)?;
                    cx.root_slot().ok_or(Trap::Detached)?.set_cleared(parent)?;
                    body(cx)
                },
                Vec::new(),
                Some(done),
            )
            .attach(Arc::new(Slot::new()));

        let depth = self.chain.len();
        self.chain.push(Record::Answer {
            tag: tag.clone(),
            responder: Responder::Detaching {
                child: child_id,
                waits: self.waits + 1,
                respond: Box::new(responder),
            },
        });
        let wake = self.switch_inner(&SPLIT_ENTER, Vec::new(), child);
        self.chain.truncate(depth);

        match wake? {
            Wake::Outcome(outcome) => Ok(Split::Returned(outcome?)),
            Wake::Detached {
                payload,
                continuation,
            } => Ok(Split::Detached {
                payload,
                continuation,
            }),
        }
    }

    fn walk(
        &mut self,
        tag: &Tag,
        inputs: Vec<Value>,
        origin: Option<&Origin>,
    ) -> Result<Walked, Fault> {
        let top = self.chain.len();
        let waits = self.waits;
        for depth in (0..top).rev() {
            let slot = match &mut self.chain[depth] {
                Record::Redirect(slot) => Arc::clone(slot),
                Record::Answer { tag: answered, .. } if *answered != *tag => continue,
                Record::Answer {
                    responder: Responder::Plain(respond),
                    ..
                } => {
                    trace!(stack = %self.id, tag = %tag, "answered");
                    return respond(inputs).map(Walked::Values);
                }
                Record::Answer {
                    responder:
                        Responder::Detaching {
                            child,
                            waits: parked,
                            respond,
                        },
                    ..
                } => {
                    return match respond(inputs)? {
                        Response::Reply(values) => Ok(Walked::Values(values)),
                        Response::Detach {
                            payload,
                            completion,
                        } => {
                            let direct = origin.is_some_and(|o| o.hops == 0 && o.id == *child);
                            if direct && depth + 1 == top && *parked == waits {
                                Ok(Walked::Detach {
                                    payload,
                                    completion,
                                })
                            } else {
                                Err(Trap::DetachCrossesFrame.into())
                            }
                        }
                    };
                }
            };
            return self.divert(&slot, tag, inputs, origin);
        }

        match (self.kind, self.root_slot.clone()) {
            (StackKind::Detached, Some(slot)) => self.divert(&slot, tag, inputs, origin),
            _ => Err(Trap::Unanswered {
                tag: tag.name().to_string(),
            }
            .into()),
        }
    }

    /// Continue a walk on the stack parked in `slot`
    fn divert(
        &mut self,
        slot: &Arc<dyn SlotAccess>,
        tag: &Tag,
        inputs: Vec<Value>,
        origin: Option<&Origin>,
    ) -> Result<Walked, Fault> {
        let target = slot.get_clear()?;
        let port = target.port().ok_or(Trap::StackLost)?;
        let origin = match origin {
            Some(o) => Origin {
                id: o.id,
                port: o.port.clone(),
                hops: o.hops + 1,
            },
            None => Origin {
                id: self.id,
                port: self.port.clone(),
                hops: 0,
            },
        };
        let requester = origin.hops == 0;
        trace!(stack = %self.id, to = %port.id, tag = %tag, hops = origin.hops, "walk diverted");

        let (reply_tx, reply_rx) = mpsc::channel();
        let request = InspectRequest {
            tag: tag.clone(),
            inputs,
            reply: reply_tx,
            origin,
        };
        port.deliver(Delivery::Inspect(request), Some(self.id))?;
        let reply = reply_rx.recv().map_err(|_| Trap::StackLost)?;

        match reply {
            Reply::Values(values) => {
                slot.set_cleared(target)?;
                Ok(Walked::Values(values))
            }
            Reply::Raised(fault) => {
                slot.set_cleared(target)?;
                Err(fault)
            }
            // The stack we walked into is running again; its old reference is void
            Reply::Detached if requester => {
                target.forget();
                Ok(Walked::Detached)
            }
            Reply::Detached => {
                slot.set_cleared(target)?;
                Err(Trap::DetachCrossesFrame.into())
            }
        }
    }

    /// Answer a walk diverted to this parked stack
    pub(crate) fn serve(&mut self, request: InspectRequest) -> Option<Wake> {
        let InspectRequest {
            tag,
            inputs,
            reply,
            origin,
        } = request;
        trace!(stack = %self.id, from = %origin.id, tag = %tag, "serving walk");

        let (answer, wake) = match self.walk(&tag, inputs, Some(&origin)) {
            Ok(Walked::Values(values)) => (Reply::Values(values), None),
            Ok(Walked::Detach {
                payload,
                completion,
            }) => {
                debug!(stack = %self.id, child = %origin.id, "split detached");
                let continuation = StackRef::continuation(origin.port, completion);
                (
                    Reply::Detached,
                    Some(Wake::Detached {
                        payload,
                        continuation,
                    }),
                )
            }
            Ok(Walked::Detached) => (Reply::Raised(Trap::DetachCrossesFrame.into()), None),
            Err(fault) => (Reply::Raised(fault), None),
        };
        if reply.send(answer).is_err() {
            debug!(stack = %self.id, "walk origin vanished before the reply");
        }
        wake
    }
}
