//! Diagnostic tracing for pipeline runs.
//!
//! Product output (step banners, listings, reports) goes to stdout;
//! save/skip notices and warnings go through `tracing` to stderr and can be
//! silenced or widened with `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Reads `RUST_LOG`. Defaults to `info` so saved/skipped output notices are
/// visible. Output: stderr, compact format.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
