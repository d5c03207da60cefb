//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! Behavior:
//! - LOG_LEVEL controls the filter (e.g. "debug" or directives such as
//!   "info,selector=trace,oracle=debug").
//! - LOG_FORMAT selects "pretty" (default) or "json" structured logs.
//!
//! Event targets in use: vocab_trainer, selector, progress, oracle, auth, store.
//! Tower HTTP TraceLayer adds the per-request spans around them.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "info,vocab_trainer=debug,selector=debug,progress=debug,tower_http=info,axum=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    // Two concrete subscriber types; init each in its own arm.
    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().with_current_span(true).init(),
        _ => builder.init(),
    }
}
