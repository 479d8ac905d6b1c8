//! CLI argument definitions for the Parley binary.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

use parley_chat::EntryKey;
use parley_core::{TenantId, ThreadId, ThreadStatus};

/// Parley: property-manager messaging over a tenant roster.
#[derive(Parser, Debug)]
#[command(name = "parley", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,

    /// Property whose roster and threads are loaded.
    #[arg(short = 'p', long = "property")]
    pub property: Option<i64>,

    /// JSON fixture seeding the in-memory gateway. Uses the bundled demo
    /// data when absent.
    #[arg(short = 'f', long = "fixture")]
    pub fixture: Option<PathBuf>,

    /// Conversation to open, as `thread:<id>` or `placeholder:<tenant id>`.
    #[arg(short = 's', long = "select", value_parser = parse_entry_key)]
    pub select: Option<EntryKey>,

    /// Message to send to the selected conversation.
    #[arg(short = 'm', long = "send", requires = "select")]
    pub send: Option<String>,

    /// Mark the selected conversation read.
    #[arg(long = "mark-read", requires = "select")]
    pub mark_read: bool,

    /// Set the selected thread's status (active, archived, closed).
    #[arg(long = "status", requires = "select", value_parser = parse_status)]
    pub status: Option<ThreadStatus>,

    /// Print the merged view as JSON.
    #[arg(long = "json")]
    pub json: bool,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PARLEY_CONFIG env var > ~/.parley/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PARLEY_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }

    /// Resolve the property id.
    ///
    /// Priority: --property flag > config file value.
    pub fn resolve_property(&self, config_property: i64) -> i64 {
        self.property.unwrap_or(config_property)
    }
}

/// Parse `thread:55` or `placeholder:1`.
pub fn parse_entry_key(value: &str) -> Result<EntryKey, String> {
    let (kind, id) = value
        .split_once(':')
        .ok_or_else(|| format!("expected <kind>:<id>, got '{}'", value))?;
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid id in '{}'", value))?;
    match kind.trim() {
        "thread" => Ok(EntryKey::Thread(ThreadId(id))),
        "placeholder" | "tenant" => Ok(EntryKey::Placeholder(TenantId(id))),
        other => Err(format!("unknown entry kind '{}'", other)),
    }
}

/// Parse a thread status name.
pub fn parse_status(value: &str) -> Result<ThreadStatus, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "active" => Ok(ThreadStatus::Active),
        "archived" => Ok(ThreadStatus::Archived),
        "closed" => Ok(ThreadStatus::Closed),
        other => Err(format!("unknown status '{}'", other)),
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".parley").join("config.toml");
    }
    PathBuf::from("config.toml")
}
