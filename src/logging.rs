//! Diagnostic logging to stderr.
//!
//! Saved responses and the final summary are product output; everything
//! here is progress and debugging detail, filtered by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise progress is shown at `info`, and
/// `verbose` adds every prompt and response at `debug`.
pub fn init(verbose: bool) {
    let default_level = if verbose {
        concat!(env!("CARGO_CRATE_NAME"), "=debug,info")
    } else {
        "info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
