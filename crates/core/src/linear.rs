//! Linear storage cells
//!
//! A `LinearCell` holds at most one value and only supports the two
//! operations that keep a non-duplicable value unique:
//!
//! - `get_clear`: take the value out, leaving the cell empty
//! - `set_cleared`: store a value, only if the cell is empty
//!
//! Reading an empty cell traps with `NullReference`; writing a full cell
//! traps with `SlotOccupied`. There is no aliasing read.

use crate::error::Trap;
use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

pub struct LinearCell<T> {
    value: Mutex<Option<T>>,
}

impl<T> LinearCell<T> {
    pub const fn empty() -> Self {
        LinearCell {
            value: Mutex::new(None),
        }
    }

    pub fn new(value: T) -> Self {
        LinearCell {
            value: Mutex::new(Some(value)),
        }
    }

    // A panic while the lock is held cannot leave a half-moved Option behind,
    // so a poisoned cell is still consistent.
    fn lock(&self) -> MutexGuard<'_, Option<T>> {
        self.value.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Clearing read
    pub fn get_clear(&self) -> Result<T, Trap> {
        self.lock().take().ok_or(Trap::NullReference)
    }

    /// Clearing write
    ///
    /// On conflict the rejected value is dropped after the lock is released,
    /// so a value whose destructor touches this cell cannot deadlock.
    pub fn set_cleared(&self, value: T) -> Result<(), Trap> {
        let mut guard = self.lock();
        if guard.is_some() {
            drop(guard);
            drop(value);
            return Err(Trap::SlotOccupied);
        }
        *guard = Some(value);
        Ok(())
    }

    pub fn is_clear(&self) -> bool {
        self.lock().is_none()
    }

    /// Take whatever is stored without trapping on an empty cell
    pub fn take(&self) -> Option<T> {
        self.lock().take()
    }
}

impl<T> Default for LinearCell<T> {
    fn default() -> Self {
        LinearCell::empty()
    }
}

impl<T> fmt::Debug for LinearCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = if self.is_clear() { "clear" } else { "set" };
        f.debug_struct("LinearCell").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_get_clear_empties_cell() {
        let cell = LinearCell::new(7);
        assert_eq!(cell.get_clear(), Ok(7));
        assert!(cell.is_clear());
        assert_eq!(cell.get_clear(), Err(Trap::NullReference));
    }

    #[test]
    fn test_set_cleared_rejects_occupied() {
        let cell = LinearCell::empty();
        assert!(cell.set_cleared(1).is_ok());
        assert_eq!(cell.set_cleared(2), Err(Trap::SlotOccupied));
        // The original value survives the rejected write
        assert_eq!(cell.get_clear(), Ok(1));
    }

    struct CountDrop(Arc<AtomicUsize>);

    impl Drop for CountDrop {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_rejected_value_is_dropped() {
        let drops = Arc::new(AtomicUsize::new(0));
        let cell = LinearCell::new(CountDrop(drops.clone()));
        assert!(cell.set_cleared(CountDrop(drops.clone())).is_err());
        assert_eq!(drops.load(Ordering::SeqCst), 1);
        drop(cell);
        assert_eq!(drops.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_debug_shows_state() {
        let cell: LinearCell<u8> = LinearCell::default();
        assert!(format!("{:?}", cell).contains("clear"));
        cell.set_cleared(3).unwrap();
        assert!(format!("{:?}", cell).contains("set"));
    }
}
