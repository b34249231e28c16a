//! Logging setup
//!
//! Installs a `tracing_subscriber::fmt` subscriber driven by `LoggingConfig`.
//! `RUST_LOG` takes precedence over the configured filter.

use crate::config::LoggingConfig;
use crate::utils::error::{BatchError, Result};
use tracing_subscriber::EnvFilter;

/// Build the filter: `RUST_LOG` if set, otherwise the configured directive
pub fn env_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&config.filter)
            .map_err(|e| BatchError::Config(format!("Invalid log filter: {}", e))),
    }
}

/// Install the global subscriber.
///
/// Fails if a global subscriber is already set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| BatchError::Config(format!("Failed to install tracing subscriber: {}", e)))
}
