//! Configuration loading for txrelay.
//!
//! Configuration is loaded from a TOML file (default: `txrelay.toml`).
//! Every section and field is optional.

use serde::Deserialize;
use std::path::PathBuf;

/// Root configuration for txrelay.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Public (peer-facing) listener.
    pub network: NetworkConfig,
    /// Local (application-facing) listener.
    pub local: LocalConfig,
    /// Request handling limits shared by both listeners.
    pub http: HttpConfig,
    /// Party directory seed.
    pub directory: DirectoryConfig,
    /// Party directory gossip task.
    pub gossip: GossipConfig,
}

/// Public listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// TCP bind address (default: 127.0.0.1:9000).
    pub bind_address: String,
}

/// Local listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Path of the Unix domain socket (default: txrelay.ipc).
    pub socket_path: PathBuf,
    /// Echo the submitted payload in `send` error responses (default: false).
    ///
    /// When off, only the payload length is reported.
    pub echo_payload_in_errors: bool,
}

/// Request handling limits.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Maximum request body size in bytes (default: 10MB).
    pub max_body_size: usize,
    /// Seconds allowed for reading a request body (default: 30).
    pub body_read_timeout_secs: u64,
}

/// Party directory configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// URL other nodes use to reach this node's public listener.
    pub url: String,
    /// URLs of peer nodes known at startup.
    pub peers: Vec<String>,
}

/// Gossip task configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GossipConfig {
    /// Enable periodic party info exchange (default: true).
    pub enabled: bool,
    /// Seconds between exchanges (default: 120).
    pub interval_secs: u64,
    /// Timeout for each outbound peer request in seconds (default: 10).
    pub request_timeout_secs: u64,
}

// Default value functions
fn default_bind_address() -> String {
    "127.0.0.1:9000".to_string()
}

fn default_socket_path() -> PathBuf {
    PathBuf::from("txrelay.ipc")
}

fn default_max_body_size() -> usize {
    10 * 1024 * 1024 // 10MB
}

fn default_body_read_timeout() -> u64 {
    30
}

fn default_directory_url() -> String {
    "http://127.0.0.1:9000/".to_string()
}

fn default_gossip_interval() -> u64 {
    120
}

fn default_request_timeout() -> u64 {
    10
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

impl Default for LocalConfig {
    fn default() -> Self {
        Self {
            socket_path: default_socket_path(),
            echo_payload_in_errors: false,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            max_body_size: default_max_body_size(),
            body_read_timeout_secs: default_body_read_timeout(),
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        Self {
            url: default_directory_url(),
            peers: Vec::new(),
        }
    }
}

impl Default for GossipConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_gossip_interval(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Replace the port of the public bind address.
    ///
    /// # Errors
    ///
    /// Returns an error if the configured bind address is not `host:port`.
    pub fn set_network_port(&mut self, port: u16) -> Result<(), ConfigError> {
        let addr: std::net::SocketAddr =
            self.network
                .bind_address
                .parse()
                .map_err(|_| ConfigError::InvalidAddress {
                    address: self.network.bind_address.clone(),
                })?;
        self.network.bind_address = std::net::SocketAddr::new(addr.ip(), port).to_string();
        Ok(())
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// Bind address is not a socket address.
    #[error("invalid bind address: {address}")]
    InvalidAddress {
        /// The configured address.
        address: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = Config::default();
        assert_eq!(config.network.bind_address, "127.0.0.1:9000");
        assert_eq!(config.local.socket_path, PathBuf::from("txrelay.ipc"));
        assert!(!config.local.echo_payload_in_errors);
        assert_eq!(config.http.max_body_size, 10 * 1024 * 1024);
        assert!(config.gossip.enabled);
    }

    #[test]
    fn config_from_toml_string() {
        let toml = r#"
[network]
bind_address = "0.0.0.0:9100"

[local]
socket_path = "/run/txrelay/tm.ipc"
echo_payload_in_errors = true

[http]
max_body_size = 1048576

[directory]
url = "http://node-a:9100/"
peers = ["http://node-b:9100/", "http://node-c:9100/"]

[gossip]
interval_secs = 30
"#;

        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.network.bind_address, "0.0.0.0:9100");
        assert_eq!(
            config.local.socket_path,
            PathBuf::from("/run/txrelay/tm.ipc")
        );
        assert!(config.local.echo_payload_in_errors);
        assert_eq!(config.http.max_body_size, 1048576);
        assert_eq!(config.http.body_read_timeout_secs, 30);
        assert_eq!(config.directory.url, "http://node-a:9100/");
        assert_eq!(config.directory.peers.len(), 2);
        assert_eq!(config.gossip.interval_secs, 30);
        assert_eq!(config.gossip.request_timeout_secs, 10);
    }

    #[test]
    fn empty_file_uses_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.network.bind_address, "127.0.0.1:9000");
        assert_eq!(config.gossip.interval_secs, 120);
    }

    #[test]
    fn set_network_port_keeps_host() {
        let mut config = Config::default();
        config.set_network_port(9555).unwrap();
        assert_eq!(config.network.bind_address, "127.0.0.1:9555");
    }

    #[test]
    fn set_network_port_rejects_hostname() {
        let mut config = Config::default();
        config.network.bind_address = "localhost:9000".to_string();
        assert!(matches!(
            config.set_network_port(1),
            Err(ConfigError::InvalidAddress { .. })
        ));
    }

    #[test]
    fn missing_file_is_read_error() {
        let result = Config::from_file(std::path::Path::new("/nonexistent/txrelay.toml"));
        assert!(matches!(result, Err(ConfigError::ReadError { .. })));
    }
}
