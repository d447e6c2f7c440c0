//! Upstream Logstash configuration.
//!
//! Loaded from environment variables or from the `[logstash]` table of a config file:
//! - `LOGSTASH_HOSTS`: comma separated `host[:port]` targets
//! - `LOGSTASH_TIMEOUT`: fetch timeout, e.g. `5s` or `500ms`
//! - `LOGSTASH_MAX_DEPTH`: nesting limit for the stats tree
//! - `LOGSTASH_INSTANCE_LABEL`: add `instance=<host>` to every series

use crate::application::flattener::DEFAULT_MAX_DEPTH;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::time::Duration;

pub const DEFAULT_HOST: &str = "localhost:9600";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogstashEnvConfig {
    pub hosts: Vec<String>,
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,
    pub max_depth: usize,
    pub instance_label: bool,
}

impl Default for LogstashEnvConfig {
    fn default() -> Self {
        Self {
            hosts: vec![DEFAULT_HOST.to_string()],
            timeout: DEFAULT_TIMEOUT,
            max_depth: DEFAULT_MAX_DEPTH,
            instance_label: false,
        }
    }
}

impl LogstashEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let defaults = Self::default();

        let hosts = lookup("LOGSTASH_HOSTS")
            .map(|v| split_list(&v))
            .unwrap_or(defaults.hosts);

        let timeout = match lookup("LOGSTASH_TIMEOUT") {
            Some(v) => humantime::parse_duration(v.trim())
                .context(format!("Failed to parse LOGSTASH_TIMEOUT: {}", v))?,
            None => defaults.timeout,
        };

        let max_depth = match lookup("LOGSTASH_MAX_DEPTH") {
            Some(v) => v
                .trim()
                .parse::<usize>()
                .context(format!("Failed to parse LOGSTASH_MAX_DEPTH: {}", v))?,
            None => defaults.max_depth,
        };

        let instance_label = lookup("LOGSTASH_INSTANCE_LABEL")
            .and_then(|v| v.trim().parse::<bool>().ok())
            .unwrap_or(defaults.instance_label);

        Ok(Self {
            hosts,
            timeout,
            max_depth,
            instance_label,
        })
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
