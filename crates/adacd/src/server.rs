//! HTTP server for adacd

use anyhow::{Context, Result};
use axum::Router;
use std::sync::Arc;
use std::time::Instant;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::context::NodeContext;
use crate::routes;

/// Application state shared across handlers
pub struct AppState {
    pub node: Arc<NodeContext>,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(node: NodeContext) -> Self {
        Self {
            node: Arc::new(node),
            start_time: Instant::now(),
        }
    }
}

/// Router with every control route; other methods on these paths get 405
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(routes::start_routes())
        .merge(routes::topology_routes())
        .merge(routes::status_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Run the HTTP server until Ctrl-C
pub async fn run(state: AppState, host: &str, port: u16) -> Result<()> {
    let app = router(Arc::new(state));

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("  Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
