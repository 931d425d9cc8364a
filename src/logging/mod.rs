//! Structured logging
//!
//! Installs a `tracing` subscriber with an env filter and either JSON or
//! human-readable output.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Registry};

/// Logging error types
#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Invalid log filter '{filter}': {message}")]
    InvalidFilter { filter: String, message: String },

    #[error("Initialization error: {0}")]
    InitError(String),
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Filter directive, e.g. `info` or `pollcast=debug,tower_http=info`
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

/// Output format for log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Plain text format
    #[default]
    Text,
    /// JSON format (structured logging)
    Json,
}

/// Build the filter: `RUST_LOG` if set, otherwise the configured level.
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter, LoggingError> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level).map_err(|e| LoggingError::InvalidFilter {
        filter: config.level.clone(),
        message: e.to_string(),
    })
}

/// Install the global subscriber.
pub fn init_logging(config: &LoggingConfig) -> Result<(), LoggingError> {
    let env_filter = build_filter(config)?;

    match config.format {
        LogFormat::Json => Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .try_init(),
        LogFormat::Text => Registry::default()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .try_init(),
    }
    .map_err(|e| LoggingError::InitError(e.to_string()))?;

    tracing::debug!(level = %config.level, format = ?config.format, "logging initialized");
    Ok(())
}
