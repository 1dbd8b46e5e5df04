//! Redirection: exceptions and walks continue on the stack in the slot

mod common;

use common::{Guard, entries, host, ints, log};
use splice_runtime::{
    Event, Fault, LinearCell, Slot, SlotAccess, StackCtx, Tag, Trap, Value, ValueType,
};
use std::sync::{Arc, LazyLock};

static GO: LazyLock<Tag> = LazyLock::new(|| Tag::new("go", []));
static ENTER: LazyLock<Tag> = LazyLock::new(|| Tag::new("enter", [ValueType::Stack]));
static OOPS: LazyLock<Tag> = LazyLock::new(|| Tag::new("oops", [ValueType::Int]));
static RESULT: LazyLock<Tag> = LazyLock::new(|| Tag::new("result", [ValueType::Int]));
static PEEK: LazyLock<Tag> = LazyLock::new(|| Tag::new("peek", []).returning([ValueType::Bool]));
static REPORT: LazyLock<Tag> = LazyLock::new(|| Tag::variadic("report"));
static DONE: LazyLock<Tag> = LazyLock::new(|| Tag::variadic("done"));

#[test]
fn test_exception_crosses_redirect() {
    let mut host = host();
    let grounder = host.grounder();
    let log = log();
    let seen = log.clone();

    let main = host.create_grounded().unwrap().extend(
        move |cx: &mut StackCtx, _| {
            cx.start()?.expect(&GO)?;
            let worker = grounder.create_grounded()?.extend(
                move |cx: &mut StackCtx, _| {
                    let (_, back) = cx.start()?.expect_yield(&ENTER)?;
                    let _local = Guard::new(&log, "worker");
                    cx.redirect(
                        Arc::new(Slot::holding(back)),
                        |_: &mut StackCtx| -> Result<Vec<Value>, Fault> {
                            Err(Fault::Thrown(Event::new(&OOPS, vec![Value::Int(7)])?))
                        },
                    )
                },
                vec![],
                Some(&*DONE),
            );

            // Thrown here as if raised at the switch
            let fault = match cx.switch(&ENTER, vec![], worker) {
                Ok(event) => return Err(Fault::Thrown(event)),
                Err(fault) => fault,
            };
            let mut out = fault.catch(&OOPS)?.into_payload();
            out.push(Value::Bool(entries(&seen) == vec!["worker"]));
            Ok(out)
        },
        vec![],
        Some(&*DONE),
    );

    let event = host
        .enter(main, Event::new(&GO, vec![]).unwrap())
        .unwrap()
        .into_event()
        .unwrap();
    assert_eq!(event.payload(), &[Value::Int(7), Value::Bool(true)]);
}

#[test]
fn test_normal_return_keeps_slot() {
    let mut host = host();
    let grounder = host.grounder();

    let main = host.create_grounded().unwrap().extend(
        move |cx: &mut StackCtx, _| {
            cx.start()?.expect(&GO)?;
            let worker = grounder.create_grounded()?.extend(
                |cx: &mut StackCtx, _| {
                    let (_, back) = cx.start()?.expect_yield(&ENTER)?;
                    let slot = Arc::new(Slot::holding(back));
                    let n = cx.redirect(slot.clone(), |_: &mut StackCtx| Ok(5))?;
                    let back = slot.get_clear()?;
                    match cx.switch_drop(&RESULT, vec![Value::Int(n)], back)? {}
                },
                vec![],
                Some(&*DONE),
            );
            Ok(cx.switch(&ENTER, vec![], worker)?.expect(&RESULT)?)
        },
        vec![],
        Some(&*DONE),
    );

    let event = host
        .enter(main, Event::new(&GO, vec![]).unwrap())
        .unwrap()
        .into_event()
        .unwrap();
    assert_eq!(ints(event.payload()), vec![5]);
}

#[test]
fn test_exception_into_empty_slot_traps() {
    let mut host = host();
    let stack = host.create_grounded().unwrap().extend(
        |cx: &mut StackCtx, _| {
            cx.start()?;
            cx.redirect(
                Arc::new(Slot::new()),
                |_: &mut StackCtx| -> Result<Vec<Value>, Fault> {
                    Err(Fault::Thrown(Event::new(&OOPS, vec![Value::Int(1)])?))
                },
            )
        },
        vec![],
        Some(&*DONE),
    );

    let landing = host.enter(stack, Event::new(&GO, vec![]).unwrap()).unwrap();
    assert_eq!(landing.outcome, Err(Fault::Trap(Trap::NullReference)));
}

#[test]
fn test_traps_pass_through_redirect() {
    let mut host = host();
    let grounder = host.grounder();
    let stack = host.create_grounded().unwrap().extend(
        move |cx: &mut StackCtx, _| {
            cx.start()?;
            let parked = grounder.create_grounded()?;
            let slot = Arc::new(Slot::holding(parked));
            let result = cx.redirect(slot.clone(), |_: &mut StackCtx| -> Result<(), Fault> {
                Err(Trap::MissingEvent.into())
            });
            // Only exceptions claim the slot
            Ok(vec![
                Value::Bool(result == Err(Fault::Trap(Trap::MissingEvent))),
                Value::Bool(!slot.is_clear()),
            ])
        },
        vec![],
        Some(&*DONE),
    );

    let event = host
        .enter(stack, Event::new(&GO, vec![]).unwrap())
        .unwrap()
        .into_event()
        .unwrap();
    assert_eq!(event.payload(), &[Value::Bool(true), Value::Bool(true)]);
}

#[test]
fn test_redirect_via_computed_slot() {
    let mut host = host();
    let grounder = host.grounder();

    let main = host.create_grounded().unwrap().extend(
        move |cx: &mut StackCtx, _| {
            cx.start()?.expect(&GO)?;
            let worker = grounder.create_grounded()?.extend(
                |cx: &mut StackCtx, _| {
                    let (_, back) = cx.start()?.expect_yield(&ENTER)?;
                    let cell = Arc::new(LinearCell::new(back));
                    let (get, set) = (cell.clone(), cell.clone());
                    cx.redirect_via(
                        move || get.get_clear(),
                        move |stack| set.set_cleared(stack),
                        |_: &mut StackCtx| -> Result<(), Fault> {
                            Err(Fault::Thrown(Event::new(&OOPS, vec![Value::Int(3)])?))
                        },
                    )?;
                    Ok(vec![])
                },
                vec![],
                Some(&*DONE),
            );
            match cx.switch(&ENTER, vec![], worker) {
                Err(fault) => Ok(fault.catch(&OOPS)?.into_payload()),
                Ok(event) => Err(Fault::Thrown(event)),
            }
        },
        vec![],
        Some(&*DONE),
    );

    let event = host
        .enter(main, Event::new(&GO, vec![]).unwrap())
        .unwrap()
        .into_event()
        .unwrap();
    assert_eq!(ints(event.payload()), vec![3]);
}

#[test]
fn test_walk_holds_slot_until_answered() {
    let mut host = host();
    let grounder = host.grounder();
    let slot = Arc::new(Slot::new());
    let (parking, watched) = (slot.clone(), slot.clone());

    let main = host.create_grounded().unwrap().extend(
        move |cx: &mut StackCtx, _| {
            cx.start()?.expect(&GO)?;
            let worker = grounder.create_grounded()?.extend(
                move |cx: &mut StackCtx, _| {
                    let (_, back) = cx.start()?.expect_yield(&ENTER)?;
                    parking.set_cleared(back)?;
                    let walked = parking.clone();
                    let mut seen = cx.redirect(walked, |cx| cx.call_stack(&PEEK, vec![]))?;
                    seen.push(Value::Bool(!parking.is_clear()));
                    let back = parking.get_clear()?;
                    match cx.switch_drop(&REPORT, seen, back)? {}
                },
                vec![],
                Some(&*DONE),
            );
            // Runs while the walk has the caller's reference out of the slot
            cx.answer(
                &PEEK,
                move |_| Ok(vec![Value::Bool(watched.is_clear())]),
                |cx| cx.switch(&ENTER, vec![], worker)?.expect(&REPORT),
            )
        },
        vec![],
        Some(&*DONE),
    );

    let event = host
        .enter(main, Event::new(&GO, vec![]).unwrap())
        .unwrap()
        .into_event()
        .unwrap();
    assert_eq!(event.payload(), &[Value::Bool(true), Value::Bool(true)]);
    assert!(slot.is_clear());
}

#[test]
fn test_slot_filled_during_walk_traps_on_restore() {
    let mut host = host();
    let grounder = host.grounder();
    let spare = host.grounder();
    let slot = Arc::new(Slot::new());
    let (parking, intruder) = (slot.clone(), slot.clone());

    let main = host.create_grounded().unwrap().extend(
        move |cx: &mut StackCtx, _| {
            cx.start()?.expect(&GO)?;
            let worker = grounder.create_grounded()?.extend(
                move |cx: &mut StackCtx, _| {
                    let (_, back) = cx.start()?.expect_yield(&ENTER)?;
                    parking.set_cleared(back)?;
                    let result = cx.redirect(parking, |cx| cx.call_stack(&PEEK, vec![]));
                    let occupied = result == Err(Fault::Trap(Trap::SlotOccupied));
                    Ok(vec![Value::Bool(occupied)])
                },
                vec![],
                Some(&*DONE),
            );
            cx.answer(
                &PEEK,
                move |_| {
                    intruder.set_cleared(spare.create_grounded()?)?;
                    Ok(vec![Value::Bool(true)])
                },
                |cx| {
                    cx.switch(&ENTER, vec![], worker)?;
                    Ok(vec![])
                },
            )
        },
        vec![],
        Some(&*DONE),
    );

    // The slot refuses the caller's reference, which tears the caller down;
    // what lands is the worker's own result
    let landing = host.enter(main, Event::new(&GO, vec![]).unwrap()).unwrap();
    let event = landing.into_event().unwrap();
    assert_eq!(event.payload(), &[Value::Bool(true)]);
    assert!(!slot.is_clear());
}
