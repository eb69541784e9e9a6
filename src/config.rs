//! Exporter configuration.
//!
//! Settings come from three layers: built-in defaults, an optional TOML
//! file, and command-line flags. Later layers win.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default seconds between two polling passes.
pub const DEFAULT_SCRAPE_INTERVAL_SECS: u64 = 30;

/// Default HTTP listen address.
pub const DEFAULT_LISTEN_ADDRESS: &str = ":9299";

/// Configuration for the exporter process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExporterConfig {
    /// Seconds to sleep between two polling passes.
    pub scrape_interval_secs: u64,
    /// Address to serve metrics on, `[host]:port`.
    pub listen_address: String,
}

impl Default for ExporterConfig {
    fn default() -> Self {
        Self {
            scrape_interval_secs: DEFAULT_SCRAPE_INTERVAL_SECS,
            listen_address: DEFAULT_LISTEN_ADDRESS.to_string(),
        }
    }
}

impl ExporterConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileRead(e.to_string()))?;
        toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scrape_interval_secs == 0 {
            return Err(ConfigError::InvalidInterval);
        }
        match self.listen_address.rsplit_once(':') {
            Some((_, port)) if port.parse::<u16>().is_ok() => Ok(()),
            _ => Err(ConfigError::InvalidListenAddress(
                self.listen_address.clone(),
            )),
        }
    }

    /// Returns the address handed to the TCP listener.
    ///
    /// An empty host (`:9299`) means every interface.
    pub fn bind_address(&self) -> String {
        if self.listen_address.starts_with(':') {
            format!("0.0.0.0{}", self.listen_address)
        } else {
            self.listen_address.clone()
        }
    }

    /// Polling interval as a [`std::time::Duration`].
    pub fn scrape_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.scrape_interval_secs)
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// Interval of zero seconds.
    #[error("scrape interval must be at least one second")]
    InvalidInterval,
    /// Listen address without a numeric port.
    #[error("invalid listen address {0:?} (expected [host]:port)")]
    InvalidListenAddress(String),
    /// Config file could not be read.
    #[error("failed to read config file: {0}")]
    FileRead(String),
    /// Config file is not valid TOML for this schema.
    #[error("failed to parse config file: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ExporterConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scrape_interval_secs, 30);
        assert_eq!(config.listen_address, ":9299");
    }

    #[test]
    fn test_zero_interval_invalid() {
        let config = ExporterConfig {
            scrape_interval_secs: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidInterval)));
    }

    #[test]
    fn test_listen_address_without_port_invalid() {
        for addr in ["localhost", ":http", "127.0.0.1:99999", ""] {
            let config = ExporterConfig {
                listen_address: addr.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(
                    config.validate(),
                    Err(ConfigError::InvalidListenAddress(_))
                ),
                "{addr} should be rejected"
            );
        }
    }

    #[test]
    fn test_bind_address_fills_empty_host() {
        let config = ExporterConfig::default();
        assert_eq!(config.bind_address(), "0.0.0.0:9299");

        let config = ExporterConfig {
            listen_address: "127.0.0.1:8080".to_string(),
            ..Default::default()
        };
        assert_eq!(config.bind_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: ExporterConfig = toml::from_str("scrape_interval_secs = 5").unwrap();
        assert_eq!(config.scrape_interval_secs, 5);
        assert_eq!(config.listen_address, DEFAULT_LISTEN_ADDRESS);
    }

    #[test]
    fn test_from_missing_file() {
        let result = ExporterConfig::from_file("/nonexistent/exporter.toml");
        assert!(matches!(result, Err(ConfigError::FileRead(_))));
    }
}
