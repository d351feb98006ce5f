//! Diagnostic logging to stderr.
//!
//! Quiet by default. The `debug` setting turns on this crate's debug
//! events; `RUST_LOG` overrides both.

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub fn default_directive(debug: bool) -> &'static str {
    if debug {
        "vaultbridge=debug"
    } else {
        "warn"
    }
}

/// Install the global subscriber. Safe to call more than once; later
/// calls are ignored.
pub fn init(debug: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(debug)));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
