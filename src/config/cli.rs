use super::Config;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Prometheus exporter for Logstash node statistics
#[derive(Parser, Debug, Default)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// TOML config file; replaces environment variables when given
    #[arg(long = "config.file")]
    pub config_file: Option<PathBuf>,

    /// Logstash host[:port], repeat for several nodes
    #[arg(long = "logstash.host")]
    pub hosts: Vec<String>,

    /// Fetch timeout per scrape (e.g. 5s, 500ms)
    #[arg(long = "logstash.timeout", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Nesting limit when flattening stats
    #[arg(long = "logstash.max-depth")]
    pub max_depth: Option<usize>,

    /// Add an instance label to every series
    #[arg(long = "logstash.instance-label")]
    pub instance_label: bool,

    /// Address to listen on, host:port or :port
    #[arg(long = "web.listen-address")]
    pub listen_address: Option<String>,

    /// Path under which metrics are served
    #[arg(long = "web.telemetry-path")]
    pub telemetry_path: Option<String>,

    /// Log filter directive (e.g. info, debug, logstash_exporter=trace)
    #[arg(long = "log.level", default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// Resolve the effective configuration and validate it.
    pub fn load_config(&self) -> Result<Config> {
        let base = match &self.config_file {
            Some(path) => Config::from_file(path)?,
            None => Config::from_env().context("Failed to load configuration from environment")?,
        };
        let config = self.apply(base);
        config.validate()?;
        Ok(config)
    }

    /// Overlay the flags that were given on top of `config`.
    pub fn apply(&self, mut config: Config) -> Config {
        if !self.hosts.is_empty() {
            config.logstash.hosts = self.hosts.clone();
        }
        if let Some(timeout) = self.timeout {
            config.logstash.timeout = timeout;
        }
        if let Some(depth) = self.max_depth {
            config.logstash.max_depth = depth;
        }
        if self.instance_label {
            config.logstash.instance_label = true;
        }
        if let Some(address) = &self.listen_address {
            config.web.listen_address = address.clone();
        }
        if let Some(path) = &self.telemetry_path {
            config.web.telemetry_path = path.clone();
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_override_config() {
        let args = Args::try_parse_from([
            "logstash_exporter",
            "--logstash.host",
            "ls-a:9600",
            "--logstash.host",
            "ls-b:9600",
            "--logstash.timeout",
            "2s",
            "--web.telemetry-path",
            "/stats",
        ])
        .unwrap();

        let config = args.apply(Config::default());
        assert_eq!(config.logstash.hosts, vec!["ls-a:9600", "ls-b:9600"]);
        assert_eq!(config.logstash.timeout, Duration::from_secs(2));
        assert_eq!(config.web.telemetry_path, "/stats");
        assert_eq!(config.web.listen_address, ":9304");
        assert!(config.instance_label());
    }

    #[test]
    fn test_no_flags_keeps_config() {
        let args = Args::try_parse_from(["logstash_exporter"]).unwrap();
        let config = args.apply(Config::default());
        assert_eq!(config, Config::default());
        assert_eq!(args.log_level, "info");
    }

    #[test]
    fn test_bad_timeout_flag_rejected() {
        let result = Args::try_parse_from(["logstash_exporter", "--logstash.timeout", "later"]);
        assert!(result.is_err());
    }
}
