//! Diagnostic logging.
//!
//! Channel and select internals emit `tracing` events; the demos keep their
//! progress lines on stdout, so the subscriber writes to stderr. The filter
//! comes from `RUST_LOG` and defaults to warnings only.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_FILTER: &str = "chanselect=warn";

/// Installs the stderr subscriber. Calling it again is a no-op.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let _ = tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_thread_names(true)
                .with_timer(fmt::time::uptime()),
        )
        .with(filter)
        .try_init();
}
