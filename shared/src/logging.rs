//! Shared logging utilities for consistent tracing output

/// Initialize the tracing subscriber for stdout logging.
///
/// `log_level` overrides the base level for the engine crates; HTTP client
/// noise stays at warn regardless.
pub fn init_tracing(log_level: Option<&str>) {
    use tracing_subscriber::{fmt, EnvFilter};

    let base_level = log_level.unwrap_or("info");
    let env_filter = format!("engine={base_level},shared={base_level},reqwest=warn");

    fmt()
        .with_env_filter(EnvFilter::new(&env_filter))
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .init();
}
