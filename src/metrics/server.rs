//! HTTP server for the Prometheus scrape endpoint.

use crate::metrics::MetricsRegistry;
use axum::{
    extract::State,
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

const TEXT_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind to address: {0}")]
    Bind(#[from] std::io::Error),

    #[error("server error: {0}")]
    Server(String),
}

/// Configuration for the metrics server.
#[derive(Debug, Clone)]
pub struct MetricsServerConfig {
    /// Address to bind the server to.
    pub bind_addr: SocketAddr,
    /// Path the metrics are served on.
    pub path: String,
}

impl Default for MetricsServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], 9090).into(),
            path: "/".to_string(),
        }
    }
}

impl MetricsServerConfig {
    /// Creates a config with a custom port.
    pub fn with_port(port: u16) -> Self {
        Self {
            bind_addr: ([0, 0, 0, 0], port).into(),
            ..Default::default()
        }
    }
}

/// HTTP server exposing a [`MetricsRegistry`] to scrapers.
pub struct MetricsServer {
    config: MetricsServerConfig,
    registry: Arc<MetricsRegistry>,
}

impl MetricsServer {
    /// Creates a new metrics server.
    pub fn new(config: MetricsServerConfig, registry: MetricsRegistry) -> Self {
        Self {
            config,
            registry: Arc::new(registry),
        }
    }

    /// Builds the router serving the scrape path and `/health`.
    pub fn router(&self) -> Router {
        router(&self.config.path, Arc::clone(&self.registry))
    }

    /// Starts the HTTP server.
    ///
    /// Runs until the listener fails or Ctrl-C is received.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = self.router();
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr).await?;

        tracing::info!(
            addr = %self.config.bind_addr,
            path = %self.config.path,
            "Metrics server listening"
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        tracing::info!("Metrics server stopped");
        Ok(())
    }
}

fn router(path: &str, registry: Arc<MetricsRegistry>) -> Router {
    let mut app = Router::new().route(path, get(metrics_handler));
    if path != "/health" {
        app = app.route("/health", get(health_handler));
    }
    app.layer(TraceLayer::new_for_http()).with_state(registry)
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Handler for the scrape endpoint.
///
/// Collect failures are logged and the remaining metrics are still served.
async fn metrics_handler(State(registry): State<Arc<MetricsRegistry>>) -> impl IntoResponse {
    let gathered = registry.gather().await;

    for failure in &gathered.errors {
        tracing::warn!(
            metric = %failure.metric,
            kind = failure.error.kind(),
            error = %failure.error,
            "error collecting metric"
        );
    }

    match gathered.encode() {
        Ok(output) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, TEXT_CONTENT_TYPE)],
            output,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {}", e),
        ),
    }
}

/// Handler for the /health endpoint.
async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
