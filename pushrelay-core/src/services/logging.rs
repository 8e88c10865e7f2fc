//! Logging service

use crate::models::LogLevel;
use tracing_subscriber::EnvFilter;

/// Initialize logging with the specified level. `RUST_LOG` takes precedence when set.
pub fn init_logging(level: LogLevel) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let level = level.as_str();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "pushrelay={level},pushrelay_core={level},warp=warn"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}

/// Log a registry lifecycle event. `target` must already be redacted.
pub fn log_registration_event(event_type: &str, target: Option<&str>) {
    tracing::info!(
        event_type = event_type,
        target = target.unwrap_or(""),
        "Registration event"
    );
}

/// Log the outcome of one dispatch call. `target` must already be redacted.
pub fn log_dispatch(provider: &str, target: &str, outcome: &str, details: Option<&str>) {
    tracing::info!(
        provider = provider,
        target = target,
        outcome = outcome,
        details = details.unwrap_or(""),
        "Dispatch completed"
    );
}

/// Log a system error
pub fn log_error(error: &str, context: Option<&str>) {
    tracing::error!(
        error = error,
        context = context.unwrap_or(""),
        "System error occurred"
    );
}
