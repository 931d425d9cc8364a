//! Command line interface.
//!
//! `pollcast` with no subcommand runs the server. The other subcommands talk
//! to a running instance or inspect the resolved configuration.

use crate::config::{self, Config, ConfigError};
use crate::polls::PollSnapshot;
use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Live audience polls for broadcast overlays.
#[derive(Parser, Debug)]
#[command(name = "pollcast", version, about)]
pub struct Cli {
    /// Config file to use instead of the default location.
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

impl Cli {
    /// Explicit `--config`, else `POLLCAST_CONFIG_PATH` or the user config dir.
    pub fn config_path(&self) -> PathBuf {
        self.config.clone().unwrap_or_else(config::get_config_path)
    }

    pub fn load_config(&self) -> Result<Config, ConfigError> {
        config::load_config_from(&self.config_path())
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the display, dashboard and voting listeners (default).
    Start,

    /// Show the poll of a running instance.
    Status(StatusArgs),

    /// Inspect the resolved configuration.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Print version and build details.
    Version,
}

#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct StatusArgs {
    /// Host running pollcast.
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// Display listener port; taken from the config when omitted.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Print the raw poll JSON instead of a table.
    #[arg(long)]
    pub json: bool,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print the effective configuration as JSON.
    Show,
    /// Print one value, addressed like `voting.cooldownSecs`.
    Get { key: String },
    /// Print the config file location.
    Path,
}

/// Errors reported by the client subcommands
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("no config value at '{0}'")]
    KeyNotFound(String),

    #[error("could not reach pollcast at {url} (is `pollcast start` running?): {source}")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} answered HTTP {status}")]
    BadStatus {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("unexpected poll payload: {0}")]
    Payload(#[source] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Dispatch `config <action>`.
pub fn run_config(action: &ConfigAction, path: &Path) -> Result<(), CliError> {
    match action {
        ConfigAction::Path => println!("{}", path.display()),
        ConfigAction::Show => {
            let cfg = config::load_config_from(path)?;
            println!("{}", serde_json::to_string_pretty(&cfg)?);
        }
        ConfigAction::Get { key } => {
            let cfg = config::load_config_from(path)?;
            let value = lookup_key(&cfg, key)?;
            println!("{}", serde_json::to_string_pretty(&value)?);
        }
    }
    Ok(())
}

/// Dispatch `status`. `display_port` is the configured display port.
pub async fn run_status(args: &StatusArgs, display_port: u16) -> Result<(), CliError> {
    let url = poll_url(&args.host, args.port.unwrap_or(display_port));
    let snapshot = fetch_poll(&url).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", format_poll_summary(&snapshot));
    }
    Ok(())
}

pub fn print_version() {
    print!("{}", version_info());
}

/// Version block printed by `pollcast version`
pub fn version_info() -> String {
    format!(
        "pollcast {} ({} {}-{})\ncommit {}, built {}\n",
        env!("CARGO_PKG_VERSION"),
        if cfg!(debug_assertions) { "debug" } else { "release" },
        std::env::consts::OS,
        std::env::consts::ARCH,
        env!("POLLCAST_GIT_HASH"),
        env!("POLLCAST_BUILD_DATE"),
    )
}

fn poll_url(host: &str, port: u16) -> String {
    format!("http://{}:{}/api/poll", host, port)
}

async fn fetch_poll(url: &str) -> Result<PollSnapshot, CliError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(|source| CliError::Unreachable {
            url: url.to_string(),
            source,
        })?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| CliError::Unreachable {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(CliError::BadStatus {
            url: url.to_string(),
            status,
        });
    }
    response.json().await.map_err(CliError::Payload)
}

/// Resolve a dotted key against the serialized config.
fn lookup_key(cfg: &Config, key: &str) -> Result<serde_json::Value, CliError> {
    let pointer = format!("/{}", key.replace('.', "/"));
    serde_json::to_value(cfg)?
        .pointer(&pointer)
        .cloned()
        .ok_or_else(|| CliError::KeyNotFound(key.to_string()))
}

/// Render a poll as text, one line per option with its share of the vote.
pub fn format_poll_summary(snapshot: &PollSnapshot) -> String {
    let mut out = String::new();
    if snapshot.options.is_empty() {
        out.push_str("No poll has been started.\n");
        return out;
    }

    let state = if snapshot.active { "active" } else { "stopped" };
    let _ = writeln!(out, "Poll ({}): {}", state, snapshot.question);

    let total = snapshot.total_votes();
    let width = snapshot.options.iter().map(|o| o.len()).max().unwrap_or(0);
    for option in &snapshot.options {
        let votes = snapshot.votes_for(option).unwrap_or(0);
        let share = if total == 0 {
            0.0
        } else {
            votes as f64 * 100.0 / total as f64
        };
        let _ = writeln!(out, "  {:<width$}  {:>5}  {:>5.1}%", option, votes, share);
    }
    let _ = writeln!(out, "Total votes: {}", total);
    out
}
