//! Logging setup
//!
//! The runtime only emits `tracing` events; it never installs a subscriber
//! on its own. Embedders that want the output call `init`, which installs a
//! stderr formatter filtered by `SPLICE_LOG` (same syntax as `RUST_LOG`,
//! default `warn`).

use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "SPLICE_LOG";

/// Install the default subscriber; a no-op if one is already installed
pub fn init() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}
