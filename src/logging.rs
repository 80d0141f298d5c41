//! Diagnostics via `tracing`, written to stderr.
//!
//! `RUST_LOG` wins when set. Otherwise pharc logs at `info`, or `debug`
//! with `--verbose`.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize the global subscriber. Calling it twice is a no-op.
pub fn init(verbose: bool) {
    let default = if verbose { "pharc=debug" } else { "pharc=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .without_time()
                .compact(),
        )
        .try_init();
}
