//! HTTP API
//!
//! - `POST /search` takes `{pattern, paths, max_results}` and returns
//!   `{matches, total}`
//! - `GET /health` returns `{"status": "ok"}`
pub mod error;
pub mod handlers;

use axum::{
    routing::{get, post},
    Router,
};
use linescout::SearchEngine;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

pub use error::ApiError;
pub use handlers::{health_handler, search_handler, HealthResponse};

pub const DEFAULT_BIND: &str = "127.0.0.1:8080";
pub const DEFAULT_REQUEST_TIMEOUT: &str = "30s";

/// Settings for the long-running transports
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub bind: SocketAddr,
    /// A query running longer than this is cancelled
    pub request_timeout: Duration,
}

impl ServerConfig {
    /// Builds a config from a bind address and a humantime duration ("30s", "2m")
    pub fn parse(bind: &str, request_timeout: &str) -> anyhow::Result<Self> {
        Ok(Self {
            bind: bind.parse()?,
            request_timeout: humantime::parse_duration(request_timeout)?,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([127, 0, 0, 1], 8080)),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Shared state handed to every handler
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: Arc<SearchEngine>,
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(engine: Arc<SearchEngine>, request_timeout: Duration) -> Self {
        Self {
            engine,
            request_timeout,
        }
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/search", post(search_handler))
        .with_state(state)
}

/// Serves the API until Ctrl+C
pub async fn serve(config: ServerConfig, engine: Arc<SearchEngine>) -> std::io::Result<()> {
    let app = router(AppState::new(engine, config.request_timeout));
    let listener = tokio::net::TcpListener::bind(config.bind).await?;

    info!("Listening on {}", listener.local_addr()?);
    info!(
        "Request timeout: {}",
        humantime::format_duration(config.request_timeout)
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP server stopped");
    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c().await.ok();
    info!("Received shutdown signal");
}
