//! Configuration loading
//!
//! Reads a JSON5 file (optional), then applies `POLLCAST_*` environment
//! overrides and validates the result.

pub mod types;

pub use types::{Config, CorsConfig, ListenerConfig, VotingConfig};

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "POLLCAST_CONFIG_PATH";

const CONFIG_FILE_NAME: &str = "pollcast.json5";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidEnv { key: String, value: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Resolve the config file path.
///
/// `POLLCAST_CONFIG_PATH` wins; otherwise `<config dir>/pollcast/pollcast.json5`,
/// falling back to the working directory when no config dir is known.
pub fn get_config_path() -> PathBuf {
    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return PathBuf::from(path);
        }
    }
    dirs::config_dir()
        .map(|dir| dir.join("pollcast").join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME))
}

/// Load configuration from the resolved path and the process environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load `path`, apply environment overrides and validate.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let mut config = load_config_file(path)?;
    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    config.validate().map_err(ConfigError::Invalid)?;
    Ok(config)
}

/// Parse a config file. A missing file yields the defaults.
pub fn load_config_file(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no config file, using defaults");
        return Ok(Config::default());
    }

    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&raw).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })
}

/// Parse JSON5 text into a config. Blank input yields the defaults.
pub fn parse_config(raw: &str) -> Result<Config, String> {
    if raw.trim().is_empty() {
        return Ok(Config::default());
    }
    json5::from_str::<Config>(raw).map_err(|e| e.to_string())
}

/// Apply `POLLCAST_*` overrides using `lookup` to read variables.
pub fn apply_env_overrides<F>(config: &mut Config, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(addr) = addr_override(&lookup, "POLLCAST_DISPLAY_ADDR")? {
        config.display.bind = addr;
    }
    if let Some(addr) = addr_override(&lookup, "POLLCAST_DASHBOARD_ADDR")? {
        config.dashboard.bind = addr;
    }
    if let Some(addr) = addr_override(&lookup, "POLLCAST_VOTING_ADDR")? {
        config.voting.bind = addr;
    }
    if let Some(raw) = lookup("POLLCAST_COOLDOWN_SECS") {
        config.voting.cooldown_secs =
            raw.trim().parse().map_err(|_| ConfigError::InvalidEnv {
                key: "POLLCAST_COOLDOWN_SECS".to_string(),
                value: raw.clone(),
            })?;
    }
    if let Some(level) = lookup("POLLCAST_LOG_LEVEL") {
        config.logging.level = level;
    }
    Ok(())
}

fn addr_override<F>(lookup: &F, key: &str) -> Result<Option<SocketAddr>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<SocketAddr>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv {
                key: key.to_string(),
                value: raw,
            }),
        None => Ok(None),
    }
}
