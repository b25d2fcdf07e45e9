//! metrics-relay - filtered metrics snapshot relay
//!
//! This binary serves the transformed snapshot of a local metrics daemon
//! over HTTP, next to a static dashboard.

use anyhow::Result;
use clap::Parser;
use tracing::info;

use metrics_relay::cli::{render_validation, Cli};
use metrics_relay::collector::MetricsClient;
use metrics_relay::config::Config;
use metrics_relay::server;
use metrics_relay::transformer::MetricsTransformer;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments
    let cli = Cli::parse();

    // Initialize logging
    metrics_relay::init_logging(&cli.log_level.to_string(), cli.log_format)?;

    info!(version = env!("CARGO_PKG_VERSION"), "Starting metrics-relay");

    // Load configuration, then layer CLI/env overrides on top
    let mut config = Config::load_or_default(&cli.config)?;
    config.apply_cli(&cli);
    config.validate()?;

    if cli.validate {
        print!("{}", render_validation(&config, cli.output_format)?);
        return Ok(());
    }

    if cli.dry_run {
        let client = MetricsClient::new(&config.upstream.url, config.upstream.timeout_ms)?;
        let snapshot = client.fetch_snapshot().await?;
        let relayed = MetricsTransformer::new().transform(snapshot);
        println!("{}", serde_json::to_string_pretty(&relayed)?);
        return Ok(());
    }

    server::run(config).await
}
