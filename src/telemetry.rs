//! Telemetry initialization (tracing/tracing-subscriber).
//!
//! - LOG_LEVEL holds the filter directives, e.g. "debug" or
//!   "info,lesson=debug,progress=debug,lingvo_backend=debug".
//! - LOG_FORMAT selects "pretty" (default) or "json".
//!
//! Targets used across the crate: `lingvo_backend` (startup, transport),
//! `lesson` (runner), `progress` (recorder, XP), `users` (onboarding).

use tracing_subscriber::EnvFilter;

pub const DEFAULT_DIRECTIVES: &str =
    "info,lesson=debug,progress=debug,lingvo_backend=debug,tower_http=info,axum=info";

pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("LOG_LEVEL").unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.json().init(),
        _ => builder.init(),
    }
}
