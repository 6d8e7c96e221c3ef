//! Server configuration, loaded from a TOML file.

use serde::Deserialize;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level server configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Server identity.
    pub server: ServerConfig,
    /// Listener settings.
    pub listen: ListenConfig,
}

/// Identity of this server.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Server name, used as the prefix on replies (e.g. "irc.example.com").
    pub name: String,
    /// Network name, shown in the welcome reply.
    pub network: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
}

/// Listener settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ListenConfig {
    /// Address to bind, e.g. "0.0.0.0:6667". Port 0 picks an ephemeral port.
    pub address: SocketAddr,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = r#"
[server]
name = "test"
network = "Test"
description = "A test server"

[listen]
address = "127.0.0.1:6667"
"#;

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = Config::load(file.path()).unwrap();
        assert_eq!(config.server.name, "test");
        assert_eq!(config.server.network, "Test");
        assert_eq!(config.listen.address.port(), 6667);
    }

    #[test]
    fn description_defaults_to_empty() {
        let config: Config = toml::from_str(
            r#"
[server]
name = "irc.example.com"
network = "Example"

[listen]
address = "0.0.0.0:0"
"#,
        )
        .unwrap();
        assert!(config.server.description.is_empty());
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = Config::load("/nonexistent/relayd.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    fn bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"not toml at all [[[").unwrap();
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
