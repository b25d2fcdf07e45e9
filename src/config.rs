//! Configuration management for metrics-relay
//!
//! Handles loading and validating configuration from YAML files, and
//! applying command-line overrides on top.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use url::Url;

use crate::cli::Cli;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Error reading the configuration file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Error parsing the configuration file
    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] serde_yaml::Error),

    /// Configuration validation error
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Upstream metrics daemon configuration
    #[serde(default)]
    pub upstream: UpstreamConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,
}

/// Upstream metrics daemon configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpstreamConfig {
    /// Snapshot endpoint URL
    #[serde(default = "default_upstream_url")]
    pub url: String,

    /// Request timeout in milliseconds
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

/// HTTP server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Relayed metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,

    /// Server bind address
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Directory of static dashboard assets (`null` disables)
    #[serde(default = "default_static_dir")]
    pub static_dir: Option<String>,

    /// TLS settings
    #[serde(default)]
    pub tls: TlsConfig,
}

/// TLS configuration for the HTTP server
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsConfig {
    /// Serve HTTPS instead of HTTP
    #[serde(default)]
    pub enabled: bool,

    /// PEM certificate chain
    pub cert_file: Option<String>,

    /// PEM private key
    pub key_file: Option<String>,
}

// Default value functions
fn default_upstream_url() -> String {
    "http://localhost:5555/metrics".to_string()
}

fn default_timeout() -> u64 {
    5000
}

fn default_port() -> u16 {
    3000
}

fn default_metrics_path() -> String {
    "/api/metrics".to_string()
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_static_dir() -> Option<String> {
    Some("public".to_string())
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: default_upstream_url(),
            timeout_ms: default_timeout(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            path: default_metrics_path(),
            bind_address: default_bind_address(),
            static_dir: default_static_dir(),
            tls: TlsConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    ///
    /// # Arguments
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed
    ///
    /// # Note
    /// - If the file doesn't exist, returns `ConfigError::ReadError`
    /// - Use `Config::load_or_default()` if you want fallback to defaults
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml(&contents)
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a YAML file, falling back to defaults if not found
    ///
    /// Use this for optional configuration files (e.g., when running without explicit config)
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "Config file not found, using defaults"
            );
            return Ok(Self::default());
        }

        Self::load(path)
    }

    /// Apply command-line (and environment) overrides
    ///
    /// Call [`Config::validate`] afterwards; overrides are not validated here.
    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(port) = cli.port {
            self.server.port = port;
        }
        if let Some(ref address) = cli.bind_address {
            self.server.bind_address = address.clone();
        }
        if let Some(ref path) = cli.metrics_path {
            self.server.path = path.clone();
        }
        if let Some(ref dir) = cli.static_dir {
            self.server.static_dir = Some(dir.clone());
        }
        if let Some(ref url) = cli.upstream_url {
            self.upstream.url = url.clone();
        }
        if let Some(timeout) = cli.upstream_timeout {
            self.upstream.timeout_ms = timeout;
        }
        if let Some(enabled) = cli.tls_enabled {
            self.server.tls.enabled = enabled;
        }
        if let Some(ref cert) = cli.tls_cert_file {
            self.server.tls.cert_file = Some(cert.clone());
        }
        if let Some(ref key) = cli.tls_key_file {
            self.server.tls.key_file = Some(key.clone());
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        if !self.server.path.starts_with('/') {
            return Err(ConfigError::ValidationError(
                "Metrics path must start with '/'".to_string(),
            ));
        }

        if self.server.path == "/" || self.server.path == "/health" {
            return Err(ConfigError::ValidationError(format!(
                "Metrics path '{}' conflicts with a built-in route",
                self.server.path
            )));
        }

        if self.upstream.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "Upstream timeout must be greater than 0".to_string(),
            ));
        }

        let url = Url::parse(&self.upstream.url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "Invalid upstream url '{}': {}",
                self.upstream.url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "Upstream url must use http or https, got '{}'",
                url.scheme()
            )));
        }

        let tls = &self.server.tls;
        if tls.enabled && (tls.cert_file.is_none() || tls.key_file.is_none()) {
            return Err(ConfigError::ValidationError(
                "TLS requires both cert_file and key_file".to_string(),
            ));
        }

        Ok(())
    }
}
