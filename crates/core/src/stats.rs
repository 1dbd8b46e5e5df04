//! Stack lifecycle statistics registry
//!
//! Process-wide counters for stack creation, teardown and control transfer.
//! Stacks run on `may` worker threads while diagnostics are read from a
//! separate signal handler thread, so every counter is a plain atomic.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            StackStats (global)                │
//! ├───────────────────────────────────────────────┤
//! │ created_grounded   created_detached           │
//! │ torn_down          exited                     │
//! │ switches           inspections                │
//! │ live ──────────────► peak (high-water mark)   │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! Updates are single relaxed atomic operations; reads happen only when a
//! snapshot is requested.

use serde::Serialize;
use std::sync::OnceLock;
use std::sync::atomic::{AtomicU64, Ordering};

/// How a stack was minted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StackKind {
    Grounded,
    Detached,
}

/// How a stack's coroutine ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StackEnd {
    /// Its last reference was dropped, or it switched away with `switch_drop`
    TornDown,
    /// Control reached its root frame
    Exited,
}

#[derive(Debug, Default)]
pub struct StackStats {
    created_grounded: AtomicU64,
    created_detached: AtomicU64,
    torn_down: AtomicU64,
    exited: AtomicU64,
    switches: AtomicU64,
    inspections: AtomicU64,
    live: AtomicU64,
    peak: AtomicU64,
}

impl StackStats {
    pub const fn new() -> Self {
        StackStats {
            created_grounded: AtomicU64::new(0),
            created_detached: AtomicU64::new(0),
            torn_down: AtomicU64::new(0),
            exited: AtomicU64::new(0),
            switches: AtomicU64::new(0),
            inspections: AtomicU64::new(0),
            live: AtomicU64::new(0),
            peak: AtomicU64::new(0),
        }
    }

    pub fn record_created(&self, kind: StackKind) {
        match kind {
            StackKind::Grounded => self.created_grounded.fetch_add(1, Ordering::Relaxed),
            StackKind::Detached => self.created_detached.fetch_add(1, Ordering::Relaxed),
        };
        let live = self.live.fetch_add(1, Ordering::Relaxed) + 1;

        // Update peak via CAS loop
        let mut peak = self.peak.load(Ordering::Relaxed);
        while live > peak {
            match self
                .peak
                .compare_exchange_weak(peak, live, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => break,
                Err(current) => peak = current,
            }
        }
    }

    pub fn record_ended(&self, end: StackEnd) {
        match end {
            StackEnd::TornDown => self.torn_down.fetch_add(1, Ordering::Relaxed),
            StackEnd::Exited => self.exited.fetch_add(1, Ordering::Relaxed),
        };
        // Saturate instead of wrapping if a test resets the registry mid-flight
        let _ = self
            .live
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1));
    }

    #[inline]
    pub fn record_switch(&self) {
        self.switches.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_inspection(&self) {
        self.inspections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            created_grounded: self.created_grounded.load(Ordering::Relaxed),
            created_detached: self.created_detached.load(Ordering::Relaxed),
            torn_down: self.torn_down.load(Ordering::Relaxed),
            exited: self.exited.load(Ordering::Relaxed),
            switches: self.switches.load(Ordering::Relaxed),
            inspections: self.inspections.load(Ordering::Relaxed),
            live: self.live.load(Ordering::Relaxed),
            peak: self.peak.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub created_grounded: u64,
    pub created_detached: u64,
    pub torn_down: u64,
    pub exited: u64,
    pub switches: u64,
    pub inspections: u64,
    pub live: u64,
    pub peak: u64,
}

impl StatsSnapshot {
    pub fn created(&self) -> u64 {
        self.created_grounded + self.created_detached
    }

    pub fn ended(&self) -> u64 {
        self.torn_down + self.exited
    }
}

static STACK_STATS: OnceLock<StackStats> = OnceLock::new();

/// Get the global stack statistics registry
pub fn stack_stats() -> &'static StackStats {
    STACK_STATS.get_or_init(StackStats::new)
}
