//! Proxy configuration.
//!
//! Configuration is loaded in the following order (later overrides earlier):
//! 1. Default values
//! 2. YAML config file (if specified via P11TAP_CONFIG or --config)
//! 3. Environment variables
//! 4. Command-line flags (applied by the binary)

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Proxy configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Listener configuration.
    pub listen: ListenConfig,
    /// Upstream server configuration.
    pub upstream: UpstreamConfig,
}

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {0}: {1}")]
    Io(PathBuf, std::io::Error),

    #[error("failed to parse config file {0}: {1}")]
    Parse(PathBuf, String),
}

impl Config {
    /// Loads configuration from file (if `P11TAP_CONFIG` is set), then
    /// applies environment variable overrides.
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("P11TAP_CONFIG") {
            config = Self::from_file(&path)?;
        }
        config.apply_env_overrides();
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Config = serde_yaml::from_str(&content)
            .map_err(|e| ConfigError::Parse(path.to_path_buf(), e.to_string()))?;
        Ok(config)
    }

    /// Applies environment variable overrides.
    pub fn apply_env_overrides(&mut self) {
        self.listen.apply_env_overrides();
        self.upstream.apply_env_overrides();
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenConfig {
    /// Address to bind to.
    pub bind_addr: SocketAddr,
    /// How long one accept wait may block before the loop re-checks for
    /// shutdown, in seconds.
    pub accept_timeout_secs: u64,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:2345".parse().unwrap(),
            accept_timeout_secs: 5,
        }
    }
}

impl ListenConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("P11TAP_LISTEN") {
            if let Ok(parsed) = addr.parse() {
                self.bind_addr = parsed;
            }
        }
        if let Ok(secs) = std::env::var("P11TAP_ACCEPT_TIMEOUT_SECS") {
            if let Ok(parsed) = secs.parse() {
                self.accept_timeout_secs = parsed;
            }
        }
    }

    pub fn accept_timeout(&self) -> Duration {
        Duration::from_secs(self.accept_timeout_secs)
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Address of the real PKCS#11 RPC server.
    pub addr: SocketAddr,
    /// Connection timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            addr: "127.0.0.1:2346".parse().unwrap(),
            connect_timeout_secs: 10,
        }
    }
}

impl UpstreamConfig {
    fn apply_env_overrides(&mut self) {
        if let Ok(addr) = std::env::var("P11TAP_UPSTREAM") {
            if let Ok(parsed) = addr.parse() {
                self.addr = parsed;
            }
        }
        if let Ok(secs) = std::env::var("P11TAP_CONNECT_TIMEOUT_SECS") {
            if let Ok(parsed) = secs.parse() {
                self.connect_timeout_secs = parsed;
            }
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.listen.bind_addr, "127.0.0.1:2345".parse().unwrap());
        assert_eq!(config.listen.accept_timeout(), Duration::from_secs(5));
        assert_eq!(config.upstream.addr, "127.0.0.1:2346".parse().unwrap());
        assert_eq!(config.upstream.connect_timeout(), Duration::from_secs(10));
    }

    #[test]
    fn test_yaml_roundtrip() {
        let yaml = r#"
listen:
  bind_addr: "0.0.0.0:9999"
upstream:
  addr: "10.0.0.1:2346"
  connect_timeout_secs: 3
"#;
        let config: Config = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.listen.bind_addr, "0.0.0.0:9999".parse().unwrap());
        // Unspecified fields keep their defaults.
        assert_eq!(config.listen.accept_timeout_secs, 5);
        assert_eq!(config.upstream.addr, "10.0.0.1:2346".parse().unwrap());
        assert_eq!(config.upstream.connect_timeout_secs, 3);

        let rendered = serde_yaml::to_string(&config).unwrap();
        let reparsed: Config = serde_yaml::from_str(&rendered).unwrap();
        assert_eq!(reparsed.listen.bind_addr, config.listen.bind_addr);
    }

    #[test]
    fn test_from_file_missing() {
        let err = Config::from_file("/nonexistent/p11tap.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_, _)));
    }
}
