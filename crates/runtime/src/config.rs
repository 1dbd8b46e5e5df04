//! Runtime configuration
//!
//! | Variable               | Default   | Meaning                              |
//! |------------------------|-----------|--------------------------------------|
//! | `SPLICE_STACK_SIZE`    | `0x20000` | machine stack per stack, in bytes    |
//! | `SPLICE_POOL_CAPACITY` | `10000`   | coroutine stacks kept for reuse      |
//! | `SPLICE_WORKERS`       | `1`       | `may` worker threads                 |
//!
//! Invalid or zero values are warned about and replaced by the default.
//! The scheduler is configured once per process, by the first `Host`.

use std::sync::{Once, OnceLock};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Default machine stack size per stack: 128KB (0x20000 bytes)
pub const DEFAULT_STACK_SIZE: usize = 0x20000;

/// Default coroutine pool capacity.
/// May reuses finished coroutine stacks from this pool to avoid allocations.
pub const DEFAULT_POOL_CAPACITY: usize = 10000;

/// One worker: a stack graph never has more than one runnable stack
pub const DEFAULT_WORKERS: usize = 1;

static SCHEDULER_INIT: Once = Once::new();
static SCHEDULER_START_TIME: OnceLock<Instant> = OnceLock::new();

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeConfig {
    pub stack_size: usize,
    pub pool_capacity: usize,
    pub workers: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            stack_size: DEFAULT_STACK_SIZE,
            pool_capacity: DEFAULT_POOL_CAPACITY,
            workers: DEFAULT_WORKERS,
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        RuntimeConfig {
            stack_size: parse_env_usize(
                "SPLICE_STACK_SIZE",
                std::env::var("SPLICE_STACK_SIZE").ok(),
                DEFAULT_STACK_SIZE,
            ),
            pool_capacity: parse_env_usize(
                "SPLICE_POOL_CAPACITY",
                std::env::var("SPLICE_POOL_CAPACITY").ok(),
                DEFAULT_POOL_CAPACITY,
            ),
            workers: parse_env_usize(
                "SPLICE_WORKERS",
                std::env::var("SPLICE_WORKERS").ok(),
                DEFAULT_WORKERS,
            ),
        }
    }

    pub fn with_stack_size(mut self, bytes: usize) -> Self {
        if bytes > 0 {
            self.stack_size = bytes;
        }
        self
    }

    pub fn with_pool_capacity(mut self, capacity: usize) -> Self {
        if capacity > 0 {
            self.pool_capacity = capacity;
        }
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        if workers > 0 {
            self.workers = workers;
        }
        self
    }
}

/// Parse a positive size from an optional environment value.
/// Returns `default` if the value is missing, zero, or invalid.
fn parse_env_usize(name: &str, value: Option<String>, default: usize) -> usize {
    match value {
        Some(val) => match val.parse::<usize>() {
            Ok(0) => {
                warn!("{}=0 is invalid, using default {}", name, default);
                default
            }
            Ok(n) => n,
            Err(_) => {
                warn!(
                    "{}='{}' is not a valid number, using default {}",
                    name, val, default
                );
                default
            }
        },
        None => default,
    }
}

/// Configure the `may` scheduler; only the first call has any effect
pub(crate) fn init_scheduler(config: &RuntimeConfig) {
    SCHEDULER_INIT.call_once(|| {
        may::config()
            .set_workers(config.workers)
            .set_stack_size(config.stack_size)
            .set_pool_capacity(config.pool_capacity);

        SCHEDULER_START_TIME.get_or_init(Instant::now);
        debug!(
            workers = config.workers,
            stack_size = config.stack_size,
            pool_capacity = config.pool_capacity,
            "scheduler configured"
        );

        // SIGQUIT dumps lifecycle counters (kill -3)
        #[cfg(feature = "diagnostics")]
        crate::diagnostics::install_signal_handler();
    });
}

/// Time since the scheduler was configured
pub fn scheduler_elapsed() -> Option<Duration> {
    SCHEDULER_START_TIME.get().map(|start| start.elapsed())
}
