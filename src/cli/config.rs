//! Configuration file
//!
//! `livevote.json`, every field optional except the admin secret. The
//! environment variables `LIVEVOTE_ADMIN_SECRET` and `LIVEVOTE_PORT`
//! override the file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::errors::{CliError, CliResult};
use crate::http_server::HttpServerConfig;
use crate::store::DEFAULT_HISTORY_CAP;

pub const ENV_ADMIN_SECRET: &str = "LIVEVOTE_ADMIN_SECRET";
pub const ENV_PORT: &str = "LIVEVOTE_PORT";

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Bind address and CORS
    #[serde(default)]
    pub server: HttpServerConfig,

    /// Directory of the file backend; absent keeps state in memory
    #[serde(default)]
    pub data_dir: Option<String>,

    /// Shared secret for admin routes (required)
    #[serde(default)]
    pub admin_secret: String,

    /// Maximum retained vote records (default 100)
    #[serde(default = "default_history_cap")]
    pub history_cap: usize,

    /// Events buffered per feed subscriber (default 256)
    #[serde(default = "default_bus_capacity")]
    pub bus_capacity: usize,

    /// Emit logs as JSON lines
    #[serde(default)]
    pub log_json: bool,
}

fn default_history_cap() -> usize {
    DEFAULT_HISTORY_CAP
}

fn default_bus_capacity() -> usize {
    256
}

impl Config {
    /// Default configuration with a freshly generated admin secret
    pub fn generate() -> Self {
        Self {
            server: HttpServerConfig::default(),
            data_dir: Some("./data".to_string()),
            admin_secret: uuid::Uuid::new_v4().simple().to_string(),
            history_cap: default_history_cap(),
            bus_capacity: default_bus_capacity(),
            log_json: false,
        }
    }

    /// Load configuration from file, apply environment overrides, validate
    pub fn load(path: &Path) -> CliResult<Self> {
        let content = fs::read_to_string(path)
            .map_err(|e| CliError::config_error(format!("Failed to read config: {}", e)))?;

        let mut config: Config = serde_json::from_str(&content)
            .map_err(|e| CliError::config_error(format!("Invalid config JSON: {}", e)))?;

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Apply overrides from a variable lookup
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> CliResult<()> {
        if let Some(secret) = lookup(ENV_ADMIN_SECRET) {
            self.admin_secret = secret;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.server.port = port.trim().parse().map_err(|_| {
                CliError::config_error(format!("Invalid {}: '{}'", ENV_PORT, port))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> CliResult<()> {
        if self.admin_secret.trim().is_empty() {
            return Err(CliError::config_error(format!(
                "admin_secret must not be empty (set it in the file or via {})",
                ENV_ADMIN_SECRET
            )));
        }

        if self.history_cap == 0 {
            return Err(CliError::config_error("history_cap must be > 0"));
        }

        if self.bus_capacity == 0 {
            return Err(CliError::config_error("bus_capacity must be > 0"));
        }

        Ok(())
    }

    /// Data directory as a path, when persistence is configured
    pub fn data_path(&self) -> Option<PathBuf> {
        self.data_dir
            .as_deref()
            .filter(|d| !d.trim().is_empty())
            .map(PathBuf::from)
    }

    /// Write the configuration as pretty JSON
    pub fn write(&self, path: &Path) -> CliResult<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| {
            CliError::config_error(format!("Failed to write {}: {}", path.display(), e))
        })
    }
}
