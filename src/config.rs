//! Server configuration.
//!
//! Settings come from three tiers, lowest priority first: built-in
//! defaults, an optional YAML file (`--config`, else `shameboard.yaml` in
//! the working directory), and `SHAMEBOARD_*` environment variables. CLI
//! flags override everything and are applied in `main`.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default port for the board server.
pub const DEFAULT_PORT: u16 = 3001;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub punishment: PunishmentConfig,
}

/// HTTP server and storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Port for the board UI and task API (default: 3001).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            db_path: default_db_path(),
        }
    }
}

/// Punishment sweep settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PunishmentConfig {
    /// Seconds between sweep ticks (default: 60).
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Per-delivery timeout in seconds (default: 5).
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Default webhook target for tasks without their own. Blank means
    /// unconfigured: overdue tasks without a target are skipped.
    #[serde(default)]
    pub webhook_url: String,

    /// Default shame text for tasks whose own message is blank.
    #[serde(default = "default_shame_message")]
    pub shame_message: String,
}

impl Default for PunishmentConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            send_timeout_secs: default_send_timeout_secs(),
            webhook_url: String::new(),
            shame_message: default_shame_message(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_db_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|dir| dir.join("shameboard").join("tasks.db"))
        .unwrap_or_else(|| PathBuf::from("tasks.db"))
}

fn default_interval_secs() -> u64 {
    60
}

fn default_send_timeout_secs() -> u64 {
    5
}

fn default_shame_message() -> String {
    "How shameful...".to_string()
}

impl Config {
    /// Load configuration: explicit file if given, else `shameboard.yaml`
    /// in the working directory if present, else defaults. Environment
    /// variables override file values.
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let mut config = match explicit_path {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = Path::new("shameboard.yaml");
                if local.exists() {
                    Self::from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env();
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        serde_yaml::from_str(&raw)
            .with_context(|| format!("cannot parse config file {}", path.display()))
    }

    fn apply_env(&mut self) {
        if let Ok(db_path) = std::env::var("SHAMEBOARD_DB_PATH") {
            self.server.db_path = db_path.into();
        }
        if let Ok(port) = std::env::var("SHAMEBOARD_PORT")
            && let Ok(port) = port.parse()
        {
            self.server.port = port;
        }
        if let Ok(url) = std::env::var("SHAMEBOARD_WEBHOOK_URL") {
            self.punishment.webhook_url = url;
        }
        if let Ok(message) = std::env::var("SHAMEBOARD_SHAME_MESSAGE") {
            self.punishment.shame_message = message;
        }
    }

    /// Create the database file's parent directory if needed.
    pub fn ensure_db_dir(&self) -> Result<()> {
        if let Some(parent) = self.server.db_path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("cannot create database dir {}", parent.display()))?;
        }
        Ok(())
    }
}
