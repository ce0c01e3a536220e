//! Command-line interface.
//!
//! Flags are layered over an optional TOML file, which is layered over the
//! built-in defaults. Only flags given explicitly override the file.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::config::loader::read_config;
use crate::config::{validate_config, ConfigError, LogFormat, ProxyConfig};

#[derive(Debug, Parser)]
#[command(
    name = "batqa-proxy",
    version,
    about = "Transparent TCP relay for TeamSpeak/TeaSpeak ServerQuery",
    long_about = None
)]
pub struct Cli {
    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Address to listen on, e.g. ":10202" [default: 0.0.0.0:10202]
    #[arg(long, value_name = "ADDR")]
    pub listen: Option<String>,

    /// ServerQuery address to relay to [default: 127.0.0.1:10011]
    #[arg(long, value_name = "ADDR")]
    pub target: Option<String>,

    /// Maximum simultaneous connections [default: 100]
    #[arg(long = "max-conns", value_name = "N")]
    pub max_conns: Option<usize>,

    /// Backend connect timeout, e.g. "30s" [default: 30s]
    #[arg(long, value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub timeout: Option<Duration>,

    /// Connections per second per source address, 0 for unlimited [default: 0]
    #[arg(long = "rate-limit", value_name = "N")]
    pub rate_limit: Option<u32>,

    /// Interval between statistics log lines [default: 5m]
    #[arg(long = "stats-interval", value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub stats_interval: Option<Duration>,

    /// Give up waiting for sessions this long after shutdown starts [default: wait forever]
    #[arg(long = "drain-timeout", value_name = "DURATION", value_parser = humantime::parse_duration)]
    pub drain_timeout: Option<Duration>,

    /// Log level: trace, debug, info, warn, error [default: info]
    #[arg(long = "log", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Log format: pretty or json [default: pretty]
    #[arg(long = "log-format", value_name = "FORMAT")]
    pub log_format: Option<LogFormat>,
}

impl Cli {
    /// Build the validated configuration: defaults, then file, then flags.
    pub fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };
        self.apply(&mut config);
        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }

    fn apply(self, config: &mut ProxyConfig) {
        if let Some(listen) = self.listen {
            config.listener.bind_address = listen;
        }
        if let Some(target) = self.target {
            config.backend.address = target;
        }
        if let Some(max_conns) = self.max_conns {
            config.listener.max_connections = max_conns;
        }
        if let Some(timeout) = self.timeout {
            config.backend.connect_timeout = timeout;
        }
        if let Some(rate_limit) = self.rate_limit {
            config.rate_limit.requests_per_second = rate_limit;
        }
        if let Some(interval) = self.stats_interval {
            config.observability.stats_interval = interval;
        }
        if let Some(drain) = self.drain_timeout {
            config.shutdown.drain_timeout = Some(drain);
        }
        if let Some(level) = self.log_level {
            config.observability.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.observability.log_format = format;
        }
    }
}
