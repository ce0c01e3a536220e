//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the relay.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::duration_format;

/// Root configuration for the relay.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, admission capacity).
    pub listener: ListenerConfig,

    /// The line-oriented service every session is relayed to.
    pub backend: BackendConfig,

    /// Per-source rate limiting.
    pub rate_limit: RateLimitConfig,

    /// Logging and statistics emission.
    pub observability: ObservabilityConfig,

    /// Shutdown behaviour.
    pub shutdown: ShutdownConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:10202"). A Go-style ":10202" binds all interfaces.
    pub bind_address: String,

    /// Maximum concurrent relayed connections.
    pub max_connections: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:10202".to_string(),
            max_connections: 100,
        }
    }
}

impl ListenerConfig {
    /// Bind address with an empty host expanded to the unspecified address.
    pub fn normalized_bind_address(&self) -> String {
        normalize_address(&self.bind_address)
    }
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BackendConfig {
    /// Backend address (e.g., "127.0.0.1:10011").
    pub address: String,

    /// Dial timeout. Established sessions have no idle timeout.
    #[serde(with = "duration_format")]
    pub connect_timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            address: "127.0.0.1:10011".to_string(),
            connect_timeout: Duration::from_secs(30),
        }
    }
}

impl BackendConfig {
    pub fn normalized_address(&self) -> String {
        normalize_address(&self.address)
    }
}

/// Rate limiting configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Maximum admitted connections per source address per window. 0 disables limiting.
    pub requests_per_second: u32,

    /// Sliding window length.
    #[serde(with = "duration_format")]
    pub window: Duration,

    /// How often stale source addresses are swept.
    #[serde(with = "duration_format")]
    pub sweep_interval: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 0,
            window: Duration::from_secs(1),
            sweep_interval: Duration::from_secs(60),
        }
    }
}

impl RateLimitConfig {
    pub fn enabled(&self) -> bool {
        self.requests_per_second > 0
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected pretty or json)", other)),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log line format.
    pub log_format: LogFormat,

    /// Interval between statistics log lines.
    #[serde(with = "duration_format")]
    pub stats_interval: Duration,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            stats_interval: Duration::from_secs(300),
        }
    }
}

/// Shutdown configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Upper bound on waiting for sessions to finish on their own before
    /// their sockets are closed. Unset waits indefinitely.
    #[serde(default, with = "duration_format::option")]
    pub drain_timeout: Option<Duration>,
}

/// Expand an empty host (":10202") to the IPv4 unspecified address.
fn normalize_address(address: &str) -> String {
    match address.strip_prefix(':') {
        Some(port) => format!("0.0.0.0:{}", port),
        None => address.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_command_line_defaults() {
        let config = ProxyConfig::default();
        assert_eq!(config.listener.bind_address, "0.0.0.0:10202");
        assert_eq!(config.listener.max_connections, 100);
        assert_eq!(config.backend.address, "127.0.0.1:10011");
        assert_eq!(config.backend.connect_timeout, Duration::from_secs(30));
        assert!(!config.rate_limit.enabled());
        assert_eq!(config.rate_limit.window, Duration::from_secs(1));
        assert_eq!(config.observability.stats_interval, Duration::from_secs(300));
        assert_eq!(config.shutdown.drain_timeout, None);
    }

    #[test]
    fn empty_host_binds_all_interfaces() {
        let listener = ListenerConfig {
            bind_address: ":10202".into(),
            max_connections: 1,
        };
        assert_eq!(listener.normalized_bind_address(), "0.0.0.0:10202");

        let backend = BackendConfig {
            address: "localhost:10011".into(),
            connect_timeout: Duration::from_secs(1),
        };
        assert_eq!(backend.normalized_address(), "localhost:10011");
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config: ProxyConfig = toml::from_str(
            r#"
            [listener]
            max_connections = 5

            [observability]
            log_format = "json"
            stats_interval = "90s"

            [shutdown]
            drain_timeout = "250ms"
            "#,
        )
        .unwrap();

        assert_eq!(config.listener.max_connections, 5);
        assert_eq!(config.listener.bind_address, "0.0.0.0:10202");
        assert_eq!(config.observability.log_format, LogFormat::Json);
        assert_eq!(config.observability.stats_interval, Duration::from_secs(90));
        assert_eq!(config.shutdown.drain_timeout, Some(Duration::from_millis(250)));
        assert_eq!(config.backend, BackendConfig::default());
    }

    #[test]
    fn log_format_parses_case_insensitively() {
        assert_eq!("JSON".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
