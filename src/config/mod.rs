//! Configuration module for the Logstash exporter.
//!
//! Settings come from three layers, later layers winning:
//! built-in defaults, then environment variables or a TOML file
//! (`--config.file`), then command-line flags.

mod cli;
mod logstash_config;
mod web_config;

pub use cli::Args;
pub use logstash_config::{DEFAULT_HOST, DEFAULT_TIMEOUT, LogstashEnvConfig};
pub use web_config::{DEFAULT_LISTEN_ADDRESS, DEFAULT_TELEMETRY_PATH, WebEnvConfig};

use crate::infrastructure::http_server::PING_PATH;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub logstash: LogstashEnvConfig,
    pub web: WebEnvConfig,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            logstash: LogstashEnvConfig::from_env().context("Failed to load logstash config")?,
            web: WebEnvConfig::from_env(),
        })
    }

    /// Parse a TOML document with optional `[logstash]` and `[web]` tables.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config TOML")
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .context(format!("Failed to read config file: {}", path.display()))?;
        Self::from_toml_str(&content)
            .context(format!("Invalid config file: {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        if self.logstash.hosts.is_empty() {
            anyhow::bail!("At least one Logstash host must be configured");
        }
        if self.logstash.hosts.iter().any(|h| h.trim().is_empty()) {
            anyhow::bail!("Logstash hosts must not be blank");
        }
        if self.logstash.timeout.is_zero() {
            anyhow::bail!("Logstash timeout must be greater than zero");
        }
        if self.logstash.max_depth == 0 {
            anyhow::bail!("Max depth must be at least 1");
        }

        let path = &self.web.telemetry_path;
        if !path.starts_with('/') {
            anyhow::bail!("Telemetry path must start with '/': {}", path);
        }
        if path == "/" || path == PING_PATH {
            anyhow::bail!("Telemetry path must not shadow {}", path);
        }

        self.web.socket_addr()?;
        Ok(())
    }

    /// Whether every series carries an `instance` label.
    /// Forced on with several hosts so their series stay distinct.
    pub fn instance_label(&self) -> bool {
        self.logstash.instance_label || self.logstash.hosts.len() > 1
    }
}
