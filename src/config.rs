//! Configuration loading and management
//!
//! Handles parsing of `taskboard.toml` from the data directory.

use std::net::IpAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::lock::DEFAULT_LOCK_TIMEOUT_MS;

pub const CONFIG_FILE: &str = "taskboard.toml";
pub const DATA_DIR_ENV: &str = "TASKBOARD_DATA";
pub const PORT_ENV: &str = "PORT";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Sheet store configuration
    #[serde(default)]
    pub store: StoreConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

/// Sheet store configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Sheet file name, relative to the data directory
    #[serde(default = "default_sheet")]
    pub sheet: String,

    /// How long to wait for the sheet lock
    #[serde(default = "default_lock_timeout_ms")]
    pub lock_timeout_ms: u64,
}

fn default_sheet() -> String {
    "tasks.sheet.json".to_string()
}

fn default_lock_timeout_ms() -> u64 {
    DEFAULT_LOCK_TIMEOUT_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            sheet: default_sheet(),
            lock_timeout_ms: default_lock_timeout_ms(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load `taskboard.toml` from the data directory, or return defaults when absent
    pub fn load_from_dir(data_dir: &Path) -> Result<Self> {
        let path = data_dir.join(CONFIG_FILE);
        if path.exists() {
            Self::load(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Apply the `PORT` override used by hosting platforms
    pub fn apply_env(&mut self, port: Option<&str>) -> Result<()> {
        if let Some(raw) = port.map(str::trim).filter(|raw| !raw.is_empty()) {
            self.server.port = raw.parse().map_err(|_| {
                Error::InvalidConfig(format!("{PORT_ENV} must be a port number, got '{raw}'"))
            })?;
        }
        self.validate()
    }

    /// Path of the sheet file inside `data_dir`
    pub fn sheet_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.store.sheet)
    }

    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(Error::InvalidConfig("server.port must be > 0".to_string()));
        }
        self.server.bind.trim().parse::<IpAddr>().map_err(|_| {
            Error::InvalidConfig(format!(
                "server.bind must be an IP address, got '{}'",
                self.server.bind
            ))
        })?;
        if self.store.sheet.trim().is_empty() {
            return Err(Error::InvalidConfig(
                "store.sheet cannot be empty".to_string(),
            ));
        }
        if self.store.lock_timeout_ms == 0 {
            return Err(Error::InvalidConfig(
                "store.lock_timeout_ms must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the data directory: explicit flag/env, then the platform data dir,
/// then `./.taskboard`.
pub fn resolve_data_dir(explicit: Option<PathBuf>) -> PathBuf {
    if let Some(dir) = explicit {
        return dir;
    }
    directories::ProjectDirs::from("", "", "taskboard")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".taskboard"))
}
