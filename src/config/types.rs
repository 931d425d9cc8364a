//! Typed configuration structures
//!
//! Every section has defaults, so an empty file (or no file) yields a
//! working setup on the classic ports.

use crate::logging::LoggingConfig;
use crate::polls::MAX_COOLDOWN;
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;

/// Root configuration structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    /// Broadcast overlay listener (serves `/api/poll`)
    pub display: ListenerConfig,

    /// Operator listener (serves start/stop/reset)
    pub dashboard: ListenerConfig,

    /// Public voting listener
    pub voting: VotingConfig,

    /// Cross-origin settings shared by all listeners
    pub cors: CorsConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl Default for Config {
    /// Display 5000, dashboard 5001, voting 5002, all on loopback.
    fn default() -> Self {
        Self {
            display: ListenerConfig::new(local(5000)),
            dashboard: ListenerConfig::new(local(5001)),
            voting: VotingConfig::default(),
            cors: CorsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Config {
    /// Check values that serde cannot.
    pub fn validate(&self) -> Result<(), String> {
        if self.voting.cooldown_secs == 0 {
            return Err("voting.cooldownSecs must be greater than 0".to_string());
        }
        if self.voting.cooldown_secs > MAX_COOLDOWN.as_secs() {
            return Err(format!(
                "voting.cooldownSecs must be at most {}",
                MAX_COOLDOWN.as_secs()
            ));
        }
        if self.voting.sweep_interval_secs == 0 {
            return Err("voting.sweepIntervalSecs must be greater than 0".to_string());
        }
        if self.voting.sweep_interval_secs > MAX_SWEEP_INTERVAL_SECS {
            return Err(format!(
                "voting.sweepIntervalSecs must be at most {}",
                MAX_SWEEP_INTERVAL_SECS
            ));
        }

        let binds = [
            ("display", self.display.bind),
            ("dashboard", self.dashboard.bind),
            ("voting", self.voting.bind),
        ];
        for (i, (name, addr)) in binds.iter().enumerate() {
            for (other, other_addr) in &binds[i + 1..] {
                if addr == other_addr && addr.port() != 0 {
                    return Err(format!(
                        "{} and {} listeners both bind {}",
                        name, other, addr
                    ));
                }
            }
        }
        Ok(())
    }
}

/// Longest accepted sweep interval (one day)
pub const MAX_SWEEP_INTERVAL_SECS: u64 = 86_400;

/// Address of a plain listener
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListenerConfig {
    pub bind: SocketAddr,
}

impl ListenerConfig {
    pub fn new(bind: SocketAddr) -> Self {
        Self { bind }
    }
}

/// Voting listener and cooldown policy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VotingConfig {
    pub bind: SocketAddr,
    /// Seconds a voter must wait after an accepted vote
    pub cooldown_secs: u64,
    /// How often expired cooldown entries are swept
    pub sweep_interval_secs: u64,
    /// Take the voter address from `X-Forwarded-For` (only behind a trusted proxy)
    pub trust_forwarded_for: bool,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            bind: local(5002),
            cooldown_secs: 30,
            sweep_interval_secs: 60,
            trust_forwarded_for: false,
        }
    }
}

/// CORS configuration. An empty origin list allows any origin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

fn local(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}
