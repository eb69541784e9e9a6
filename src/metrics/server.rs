//! HTTP server for the Prometheus metrics endpoint.

use crate::metrics::ServiceMetrics;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use std::sync::Arc;
use thiserror::Error;
use tower_http::trace::TraceLayer;

/// Landing page served at `/`.
pub const ROOT_PAGE: &str = r#"<html>
<head><title>Service Target Pods Num Exporter</title></head>
<body>
<h1>Service Target Pods Num Exporter</h1>
<p><a href="/metrics">Metrics</a></p>
</body>
</html>
"#;

/// Errors that can occur during metrics server operations.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        /// Address passed to the listener.
        addr: String,
        /// Underlying socket error.
        #[source]
        source: std::io::Error,
    },

    /// The server stopped with an error after binding.
    #[error("server error: {0}")]
    Server(String),
}

/// HTTP server exposing the exporter's metrics.
pub struct MetricsServer {
    bind_addr: String,
    metrics: Arc<ServiceMetrics>,
}

impl MetricsServer {
    /// Creates a new metrics server listening on `bind_addr` (`host:port`).
    pub fn new(bind_addr: impl Into<String>, metrics: Arc<ServiceMetrics>) -> Self {
        Self {
            bind_addr: bind_addr.into(),
            metrics,
        }
    }

    /// Builds the router: `/metrics` and `/`, nothing else.
    pub fn router(metrics: Arc<ServiceMetrics>) -> Router {
        Router::new()
            .route("/metrics", get(metrics_handler))
            .route("/", get(root_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(metrics)
    }

    /// Starts the HTTP server.
    ///
    /// This method runs the server until it fails.
    pub async fn run(self) -> Result<(), ServerError> {
        let app = Self::router(self.metrics);

        let listener = tokio::net::TcpListener::bind(&self.bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: self.bind_addr.clone(),
                source,
            })?;

        tracing::info!(addr = %self.bind_addr, "Metrics server listening");

        axum::serve(listener, app)
            .await
            .map_err(|e| ServerError::Server(e.to_string()))?;

        Ok(())
    }
}

/// Handler for the /metrics endpoint.
async fn metrics_handler(State(metrics): State<Arc<ServiceMetrics>>) -> impl IntoResponse {
    match metrics.encode() {
        Ok(output) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            output,
        ),
        Err(e) => {
            tracing::error!(error = %e, "Failed to encode metrics");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("content-type", "text/plain; charset=utf-8")],
                format!("Failed to encode metrics: {}", e),
            )
        }
    }
}

/// Handler for the / endpoint.
async fn root_handler() -> Html<&'static str> {
    Html(ROOT_PAGE)
}
