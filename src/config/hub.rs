//! Hub configuration
//!
//! Loads hub settings from notify.toml. A missing file yields defaults;
//! CLI flags override whatever the file provides.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Default configuration file name
pub const DEFAULT_CONFIG_FILE: &str = "notify.toml";

const DEFAULT_BIND: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8081;
const DEFAULT_BIND_TIMEOUT_SECS: u64 = 30;

/// Errors that can occur during config operations
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Read(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Hub configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubConfig {
    /// Address to bind to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds an unbound connection may idle before being closed (0 disables)
    #[serde(default = "default_bind_timeout_secs")]
    pub bind_timeout_secs: u64,
}

fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_bind_timeout_secs() -> u64 {
    DEFAULT_BIND_TIMEOUT_SECS
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
            bind_timeout_secs: default_bind_timeout_secs(),
        }
    }
}

impl HubConfig {
    /// Load configuration from a file path
    ///
    /// A missing file is not an error; defaults apply. A file that exists
    /// but does not parse is a startup error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        let config: HubConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// The bind handshake deadline, if enabled
    pub fn bind_timeout(&self) -> Option<Duration> {
        match self.bind_timeout_secs {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = HubConfig::default();
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.port, 8081);
        assert_eq!(config.bind_timeout(), Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = HubConfig::load(Path::new("/nonexistent/notify.toml")).unwrap();
        assert_eq!(config.port, 8081);
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind = \"0.0.0.0\"\nport = 9100\nbind_timeout_secs = 5").unwrap();

        let config = HubConfig::load(file.path()).unwrap();
        assert_eq!(config.bind, "0.0.0.0");
        assert_eq!(config.port, 9100);
        assert_eq!(config.bind_timeout(), Some(Duration::from_secs(5)));
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = 9100").unwrap();

        let config = HubConfig::load(file.path()).unwrap();
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.port, 9100);
        assert_eq!(config.bind_timeout_secs, 30);
    }

    #[test]
    fn test_zero_timeout_disables_deadline() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "bind_timeout_secs = 0").unwrap();

        let config = HubConfig::load(file.path()).unwrap();
        assert_eq!(config.bind_timeout(), None);
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "port = \"not a number\"").unwrap();

        let result = HubConfig::load(file.path());
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }
}
