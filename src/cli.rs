//! CLI argument parsing for metrics-relay
//!
//! This module provides the command-line interface using clap derive macros.
//!
//! # Options
//!
//! - `--config` / `-c`: Configuration file path (default: config.yaml, env: METRICS_RELAY_CONFIG)
//! - `--port` / `-p`: Server port (overrides config file, env: METRICS_RELAY_PORT)
//! - `--bind-address`: Server bind address (env: METRICS_RELAY_BIND_ADDRESS)
//! - `--metrics-path`: Relayed metrics endpoint path (env: METRICS_RELAY_METRICS_PATH)
//! - `--static-dir`: Static asset directory (env: METRICS_RELAY_STATIC_DIR)
//! - `--upstream-url`: Upstream snapshot URL (env: METRICS_RELAY_UPSTREAM_URL)
//! - `--upstream-timeout`: Upstream timeout in milliseconds (env: METRICS_RELAY_UPSTREAM_TIMEOUT)
//! - `--tls-enabled`: Serve HTTPS (env: METRICS_RELAY_TLS_ENABLED)
//! - `--tls-cert-file`: Path to TLS certificate file (env: METRICS_RELAY_TLS_CERT_FILE)
//! - `--tls-key-file`: Path to TLS private key file (env: METRICS_RELAY_TLS_KEY_FILE)
//! - `--validate`: Validate configuration without starting server
//! - `--dry-run`: Fetch and transform one snapshot, print it and exit
//! - `--log-level` / `-l`: Log level (trace/debug/info/warn/error, env: METRICS_RELAY_LOG_LEVEL)
//! - `--log-format`: Log output format (text/json, env: METRICS_RELAY_LOG_FORMAT)
//! - `--output-format`: Output format for validate (text/json/yaml)
//!
//! # Precedence
//!
//! Configuration values are resolved in the following order (highest to lowest priority):
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Configuration file
//! 4. Default values

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::Config;

/// metrics-relay - Filtered, aggregated metrics over HTTP
///
/// Fetches a JSON snapshot from a local metrics daemon on every request,
/// drops noisy keys, aggregates CPU clusters, derives memory percentages
/// and serves the result alongside a static dashboard.
///
/// Environment variables can be used for all configuration options.
/// CLI arguments take precedence over environment variables,
/// which take precedence over config file values.
#[derive(Parser, Debug)]
#[command(name = "metrics-relay")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to configuration file
    #[arg(
        short,
        long,
        value_name = "FILE",
        default_value = "config.yaml",
        env = "METRICS_RELAY_CONFIG"
    )]
    pub config: PathBuf,

    /// Server port (overrides config file)
    #[arg(short, long, value_name = "PORT", env = "METRICS_RELAY_PORT")]
    pub port: Option<u16>,

    /// Server bind address (overrides config file)
    /// Supported values: IP addresses (0.0.0.0, 127.0.0.1, ::1) or "localhost"
    #[arg(long, value_name = "ADDRESS", env = "METRICS_RELAY_BIND_ADDRESS")]
    pub bind_address: Option<String>,

    /// Relayed metrics endpoint path (overrides config file)
    /// Must start with '/' and not conflict with '/' or '/health'
    #[arg(long, value_name = "PATH", env = "METRICS_RELAY_METRICS_PATH")]
    pub metrics_path: Option<String>,

    /// Static dashboard asset directory (overrides config file)
    #[arg(long, value_name = "DIR", env = "METRICS_RELAY_STATIC_DIR")]
    pub static_dir: Option<String>,

    /// Upstream snapshot URL (overrides config file)
    #[arg(long, value_name = "URL", env = "METRICS_RELAY_UPSTREAM_URL")]
    pub upstream_url: Option<String>,

    /// Upstream HTTP timeout in milliseconds (overrides config file)
    #[arg(long, value_name = "MS", env = "METRICS_RELAY_UPSTREAM_TIMEOUT")]
    pub upstream_timeout: Option<u64>,

    /// Enable TLS/HTTPS (overrides config file)
    #[arg(long, env = "METRICS_RELAY_TLS_ENABLED")]
    pub tls_enabled: Option<bool>,

    /// Path to TLS certificate file in PEM format (overrides config file)
    #[arg(long, value_name = "FILE", env = "METRICS_RELAY_TLS_CERT_FILE")]
    pub tls_cert_file: Option<String>,

    /// Path to TLS private key file in PEM format (overrides config file)
    #[arg(long, value_name = "FILE", env = "METRICS_RELAY_TLS_KEY_FILE")]
    pub tls_key_file: Option<String>,

    /// Validate configuration without starting server
    #[arg(long)]
    pub validate: bool,

    /// Fetch and transform a single snapshot, print it and exit
    #[arg(long, conflicts_with = "validate")]
    pub dry_run: bool,

    /// Log level
    #[arg(
        short,
        long,
        value_enum,
        default_value = "info",
        env = "METRICS_RELAY_LOG_LEVEL"
    )]
    pub log_level: LogLevel,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "text",
        env = "METRICS_RELAY_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Output format for --validate
    #[arg(long, value_enum, default_value = "text")]
    pub output_format: OutputFormat,
}

/// Log level options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    /// Trace level - most verbose
    Trace,
    /// Debug level
    Debug,
    /// Info level - default
    Info,
    /// Warn level
    Warn,
    /// Error level - least verbose
    Error,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Trace => write!(f, "trace"),
            LogLevel::Debug => write!(f, "debug"),
            LogLevel::Info => write!(f, "info"),
            LogLevel::Warn => write!(f, "warn"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

/// Log output format
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Text,
    /// One JSON object per event
    Json,
}

/// Output format options for validate mode
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output
    Text,
    /// JSON output
    Json,
    /// YAML output
    Yaml,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Yaml => write!(f, "yaml"),
        }
    }
}

/// Render the `--validate` report for an already validated configuration
pub fn render_validation(config: &Config, format: OutputFormat) -> anyhow::Result<String> {
    let report = match format {
        OutputFormat::Text => {
            let tls = if config.server.tls.enabled { "on" } else { "off" };
            format!(
                "Configuration is valid\n  \
                 upstream:    {} (timeout {}ms)\n  \
                 listen:      {}:{} (tls {})\n  \
                 metrics:     {}\n  \
                 static dir:  {}\n",
                config.upstream.url,
                config.upstream.timeout_ms,
                config.server.bind_address,
                config.server.port,
                tls,
                config.server.path,
                config.server.static_dir.as_deref().unwrap_or("(disabled)"),
            )
        }
        OutputFormat::Json => {
            let value = serde_json::json!({ "valid": true, "config": config });
            format!("{}\n", serde_json::to_string_pretty(&value)?)
        }
        OutputFormat::Yaml => {
            #[derive(serde::Serialize)]
            struct Report<'a> {
                valid: bool,
                config: &'a Config,
            }
            serde_yaml::to_string(&Report {
                valid: true,
                config,
            })?
        }
    };
    Ok(report)
}
