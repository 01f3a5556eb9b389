//! HTTP server for deskhelperd

use crate::opener::FolderOpener;
use crate::routes;
use anyhow::{Context, Result};
use axum::Router;
use deskhelper_common::ServerConfig;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Application state shared across handlers
pub struct AppState {
    pub opener: FolderOpener,
}

impl AppState {
    pub fn new(opener: FolderOpener) -> Self {
        Self { opener }
    }
}

/// Build the router: folder-open routes, health, CORS for browser callers
pub fn router(state: Arc<AppState>, open_routes: &[String]) -> Router {
    Router::new()
        .merge(routes::folder_routes(open_routes))
        .merge(routes::health_routes())
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

/// Bind, retrying while a previous instance may still hold the port
pub async fn bind_with_retry(addr: &str, attempts: u32) -> Result<TcpListener> {
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match TcpListener::bind(addr).await {
            Ok(listener) => return Ok(listener),
            Err(e) if attempt < attempts => {
                warn!(
                    "Bind to {} failed (attempt {}/{}): {}",
                    addr, attempt, attempts, e
                );
                attempt += 1;
                tokio::time::sleep(Duration::from_secs(1)).await;
            }
            Err(e) => return Err(e).with_context(|| format!("Failed to bind {}", addr)),
        }
    }
}

/// Run the HTTP server until Ctrl-C
pub async fn run(config: &ServerConfig, state: AppState) -> Result<()> {
    let app = router(Arc::new(state), &config.open_routes);

    let listener = bind_with_retry(&config.address(), config.bind_retries).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    for route in &config.open_routes {
        info!("  POST {}", route);
    }

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("Shutting down gracefully");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}
