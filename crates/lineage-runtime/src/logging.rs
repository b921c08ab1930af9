//! Logging setup

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::LogConfig;

#[derive(Error, Debug)]
pub enum LogError {
    #[error("invalid log filter {directive:?}: {reason}")]
    Filter { directive: String, reason: String },

    #[error("a global subscriber is already installed")]
    AlreadyInstalled,
}

/// Build the filter: `RUST_LOG` when set, else the configured level
pub fn env_filter(config: &LogConfig) -> Result<EnvFilter, LogError> {
    let directive = std::env::var(EnvFilter::DEFAULT_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| config.level.clone());

    EnvFilter::try_new(&directive).map_err(|e| LogError::Filter {
        directive,
        reason: e.to_string(),
    })
}

/// Install the global `tracing` subscriber
pub fn init(config: &LogConfig) -> Result<(), LogError> {
    let filter = env_filter(config)?;
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.compact().try_init()
    };
    installed.map_err(|_| LogError::AlreadyInstalled)
}
