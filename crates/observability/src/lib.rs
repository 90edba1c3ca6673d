//! Tracing and logging (shared setup).

use tracing_subscriber::EnvFilter;

/// Initialize process-wide observability (tracing/logging).
///
/// Structured JSON logs, filtered via `RUST_LOG` (default `info`). Safe to
/// call multiple times; subsequent calls become no-ops, so tests and the
/// binary can both call it unconditionally.
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .json()
        .with_timer(tracing_subscriber::fmt::time::SystemTime)
        .with_current_span(true)
        .with_target(false)
        .try_init();
}
