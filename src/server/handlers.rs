//! HTTP request handlers
//!
//! Contains handlers for all HTTP endpoints.

use std::time::Instant;

use axum::{extract::State, response::Html, Json};
use serde::Serialize;
use tracing::{debug, instrument};

use super::AppState;
use crate::error::AppResult;
use crate::transformer::RelaySnapshot;

/// Health check response
#[derive(Serialize)]
pub struct HealthResponse {
    /// Health status
    status: String,
    /// Application version
    version: String,
}

/// Root endpoint - displays basic info when no static dashboard is present
pub async fn root(State(state): State<AppState>) -> Html<String> {
    let html = format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>metrics-relay</title>
</head>
<body>
    <h1>metrics-relay</h1>
    <p>Version: {}</p>
    <p>Upstream: <code>{}</code></p>
    <ul>
        <li><a href="/health">Health Check</a></li>
        <li><a href="{}">Metrics</a></li>
    </ul>
</body>
</html>"#,
        env!("CARGO_PKG_VERSION"),
        state.client.url(),
        state.config.server.path
    );
    Html(html)
}

/// Health check endpoint
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Metrics endpoint - fetches one upstream snapshot and returns it transformed
#[instrument(skip(state), name = "metrics_handler")]
pub async fn metrics(State(state): State<AppState>) -> AppResult<Json<RelaySnapshot>> {
    let start = Instant::now();

    let snapshot = state.client.fetch_snapshot().await?;
    let relayed = state.transformer.transform(snapshot);

    debug!(
        duration_ms = start.elapsed().as_millis() as u64,
        metrics_count = relayed.metrics.len(),
        "Metrics relayed"
    );

    Ok(Json(relayed))
}
