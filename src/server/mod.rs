//! HTTP server module
//!
//! Provides the Axum-based HTTP server for relaying metrics and hosting
//! the static dashboard.

pub mod handlers;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::{routing::get, Router};
use axum_server::tls_rustls::RustlsConfig;
use tokio::signal;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::collector::MetricsClient;
use crate::config::Config;
use crate::error::AppResult;
use crate::transformer::MetricsTransformer;

/// Grace period for in-flight requests after a shutdown signal (TLS listener)
const SHUTDOWN_GRACE: Duration = Duration::from_secs(10);

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Upstream metrics client
    pub client: Arc<MetricsClient>,
    /// Metrics transformer
    pub transformer: Arc<MetricsTransformer>,
}

impl AppState {
    /// Build the shared state, rejecting an invalid configuration
    pub fn new(config: Config) -> AppResult<Self> {
        config.validate()?;
        let client = MetricsClient::new(&config.upstream.url, config.upstream.timeout_ms)?;

        Ok(Self {
            config: Arc::new(config),
            client: Arc::new(client),
            transformer: Arc::new(MetricsTransformer::new()),
        })
    }
}

/// Build the application router
///
/// Routes: `/health`, the configured metrics path, and either the static
/// asset directory (when it exists) or a small info page at `/`.
pub fn router(state: AppState) -> Router {
    let metrics_path = state.config.server.path.clone();

    let app = Router::new()
        .route("/health", get(handlers::health))
        .route(&metrics_path, get(handlers::metrics));

    let static_dir = state
        .config
        .server
        .static_dir
        .as_deref()
        .filter(|dir| Path::new(dir).is_dir());

    let app = match static_dir {
        Some(dir) => {
            info!(static_dir = %dir, "Serving static assets");
            app.fallback_service(ServeDir::new(dir))
        }
        None => {
            if let Some(ref dir) = state.config.server.static_dir {
                warn!(static_dir = %dir, "Static asset directory not found, serving info page");
            }
            app.route("/", get(handlers::root))
        }
    };

    app.layer(TraceLayer::new_for_http()).with_state(state)
}

/// Resolve the configured bind address
///
/// Handles "localhost" specially, otherwise parses as an IP address.
fn bind_addr(bind_address: &str, port: u16) -> Result<SocketAddr> {
    let ip: IpAddr = if bind_address == "localhost" {
        IpAddr::V4(Ipv4Addr::LOCALHOST)
    } else {
        bind_address
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid bind_address '{}': {}. Use an IP address (e.g., '0.0.0.0', '127.0.0.1') or 'localhost'.", bind_address, e))?
    };
    Ok(SocketAddr::from((ip, port)))
}

/// Run the HTTP server
///
/// # Arguments
/// * `config` - Validated application configuration
///
/// # Errors
/// Returns an error if the server fails to start
pub async fn run(config: Config) -> Result<()> {
    let addr = bind_addr(&config.server.bind_address, config.server.port)?;
    let metrics_path = config.server.path.clone();
    let upstream = config.upstream.url.clone();
    let tls = config.server.tls.clone();

    let app = router(AppState::new(config)?);

    if tls.enabled {
        let (Some(cert), Some(key)) = (tls.cert_file.as_deref(), tls.key_file.as_deref()) else {
            anyhow::bail!("TLS enabled without cert_file and key_file");
        };
        let rustls = RustlsConfig::from_pem_file(cert, key).await?;

        let handle = axum_server::Handle::new();
        let shutdown = handle.clone();
        tokio::spawn(async move {
            shutdown_signal().await;
            shutdown.graceful_shutdown(Some(SHUTDOWN_GRACE));
        });

        info!(address = %addr, metrics_path = %metrics_path, upstream = %upstream, "Server listening (TLS)");

        axum_server::bind_rustls(addr, rustls)
            .handle(handle)
            .serve(app.into_make_service())
            .await?;
    } else {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(address = %addr, metrics_path = %metrics_path, upstream = %upstream, "Server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        }
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        }
    }
}
