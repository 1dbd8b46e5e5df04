//! Runtime diagnostics for production debugging
//!
//! With the `diagnostics` feature, a SIGQUIT (kill -3) handler dumps the
//! stack lifecycle counters to stderr and the process keeps running:
//!
//! ```bash
//! kill -3 <pid>
//! ```
//!
//! ## Signal Safety
//!
//! `dump_diagnostics` does I/O and takes the stderr lock, which is not
//! async-signal-safe. The handler is a dedicated thread waiting on
//! signal-hook's iterator instead of a raw signal handler.

use splice_core::{StatsSnapshot, stack_stats};
use std::io::Write;
use std::sync::Once;

static SIGNAL_HANDLER_INIT: Once = Once::new();

/// Install the SIGQUIT handler; called by the first `Host`, idempotent
pub fn install_signal_handler() {
    SIGNAL_HANDLER_INIT.call_once(|| {
        #[cfg(all(unix, feature = "diagnostics"))]
        {
            use signal_hook::consts::SIGQUIT;
            use signal_hook::iterator::Signals;

            let mut signals = match Signals::new([SIGQUIT]) {
                Ok(s) => s,
                Err(e) => {
                    tracing::warn!("SIGQUIT handler not installed: {}", e);
                    return;
                }
            };

            std::thread::Builder::new()
                .name("splice-diagnostics".to_string())
                .spawn(move || {
                    for sig in signals.forever() {
                        if sig == SIGQUIT {
                            dump_diagnostics();
                        }
                    }
                })
                .ok();
        }
    });
}

/// Dump lifecycle counters to stderr
pub fn dump_diagnostics() {
    let mut out = std::io::stderr().lock();
    let _ = write_diagnostics(&mut out, &stack_stats().snapshot());
}

fn write_diagnostics(out: &mut impl Write, stats: &StatsSnapshot) -> std::io::Result<()> {
    writeln!(out, "\n=== Splice Runtime Diagnostics ===")?;
    writeln!(out, "Timestamp: {:?}", std::time::SystemTime::now())?;
    if let Some(elapsed) = crate::config::scheduler_elapsed() {
        writeln!(out, "Uptime:    {:.3}s", elapsed.as_secs_f64())?;
    }

    writeln!(out, "\n[Stacks]")?;
    writeln!(out, "  Live:      {}", stats.live)?;
    writeln!(out, "  Peak:      {} (high-water mark)", stats.peak)?;
    writeln!(
        out,
        "  Created:   {} ({} grounded, {} detached)",
        stats.created(),
        stats.created_grounded,
        stats.created_detached
    )?;
    writeln!(
        out,
        "  Ended:     {} ({} torn down, {} exited)",
        stats.ended(),
        stats.torn_down,
        stats.exited
    )?;

    // Every created stack is either live or ended
    let accounted = stats.ended() + stats.live;
    if stats.created() > accounted {
        writeln!(
            out,
            "  WARNING: {} stacks unaccounted for (coroutine died without ending)",
            stats.created() - accounted
        )?;
    }

    writeln!(out, "\n[Control]")?;
    writeln!(out, "  Switches:    {}", stats.switches)?;
    writeln!(out, "  Inspections: {}", stats.inspections)?;

    writeln!(out, "\n=== End Diagnostics ===\n")
}

/// Lifecycle counters as a JSON object
#[cfg(feature = "report-json")]
pub fn stats_json() -> Result<String, serde_json::Error> {
    serde_json::to_string(&stack_stats().snapshot())
}
