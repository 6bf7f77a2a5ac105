//! Tracing subscriber bootstrap.

use tracing_subscriber::{EnvFilter, fmt};

use docrepo_core::config::LoggingConfig;
use docrepo_core::error::AppError;
use docrepo_core::result::AppResult;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level. The format is `json` or
/// anything else for human-readable output. Returns `Ok(false)` when a
/// global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> AppResult<bool> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| {
            AppError::configuration(format!("Invalid log level '{}': {e}", config.level))
        })?,
    };

    let installed = match config.format.as_str() {
        "json" => fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .with_thread_ids(true)
            .try_init(),
        _ => fmt()
            .pretty()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };
    Ok(installed.is_ok())
}
