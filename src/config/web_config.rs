//! HTTP listener configuration.
//!
//! - `WEB_LISTEN_ADDRESS`: `host:port`, or `:port` for every interface
//! - `WEB_TELEMETRY_PATH`: path that serves the metrics

use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::net::SocketAddr;

pub const DEFAULT_LISTEN_ADDRESS: &str = ":9304";
pub const DEFAULT_TELEMETRY_PATH: &str = "/metrics";

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebEnvConfig {
    pub listen_address: String,
    pub telemetry_path: String,
}

impl Default for WebEnvConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
            telemetry_path: DEFAULT_TELEMETRY_PATH.to_string(),
        }
    }
}

impl WebEnvConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            listen_address: lookup("WEB_LISTEN_ADDRESS").unwrap_or(defaults.listen_address),
            telemetry_path: lookup("WEB_TELEMETRY_PATH").unwrap_or(defaults.telemetry_path),
        }
    }

    /// Resolves the listen address, treating a bare `:port` as `0.0.0.0:port`.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        let address = self.listen_address.trim();
        let address = if address.starts_with(':') {
            format!("0.0.0.0{}", address)
        } else {
            address.to_string()
        };
        address
            .parse::<SocketAddr>()
            .context(format!("Invalid listen address: {}", self.listen_address))
    }
}
