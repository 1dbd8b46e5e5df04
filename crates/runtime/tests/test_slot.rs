//! Linear storage of stack references

mod common;

use common::{Guard, entries, host, log};
use splice_runtime::{FnSlot, LinearCell, Slot, SlotAccess, StackCtx, StackRef, Tag, Trap};
use std::sync::{Arc, LazyLock};

static DONE: LazyLock<Tag> = LazyLock::new(|| Tag::variadic("done"));

#[test]
fn test_slot_reads_clear() {
    let host = host();
    let stack = host.create_grounded().unwrap();
    let id = stack.id();

    let slot = Slot::holding(stack);
    assert!(!slot.is_clear());
    assert_eq!(slot.get_clear().unwrap().id(), id);
    assert!(slot.is_clear());
    assert_eq!(slot.get_clear().unwrap_err(), Trap::NullReference);
}

#[test]
fn test_slot_refuses_overwrite() {
    let host = host();
    let first = host.create_grounded().unwrap();
    let first_id = first.id();
    let slot = Slot::holding(first);

    let second = host.create_grounded().unwrap();
    assert_eq!(slot.set_cleared(second), Err(Trap::SlotOccupied));
    assert_eq!(slot.get_clear().unwrap().id(), first_id);
}

#[test]
fn test_rejected_reference_is_torn_down() {
    let host = host();
    let log = log();
    let guard = Guard::new(&log, "rejected");
    let slot = Slot::holding(host.create_grounded().unwrap());
    let rejected = host.create_grounded().unwrap().extend(
        move |cx: &mut StackCtx, _| {
            let _guard = guard;
            cx.start()?;
            Ok(vec![])
        },
        vec![],
        Some(&*DONE),
    );

    assert!(slot.set_cleared(rejected).is_err());
    assert_eq!(entries(&log), vec!["rejected"]);
}

#[test]
fn test_fn_slot_over_shared_cell() {
    let host = host();
    let cell = Arc::new(LinearCell::<StackRef>::empty());
    let (get, set) = (cell.clone(), cell.clone());
    let slot: Arc<dyn SlotAccess> = Arc::new(FnSlot::new(
        move || get.get_clear(),
        move |stack| set.set_cleared(stack),
    ));

    assert_eq!(slot.get_clear().unwrap_err(), Trap::NullReference);
    slot.set_cleared(host.create_grounded().unwrap()).unwrap();
    assert!(!cell.is_clear());
    assert!(slot.get_clear().is_ok());
    assert!(cell.is_clear());
}
