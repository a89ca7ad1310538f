// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Routes:
//! - `POST /webhook` -- gateway events in
//! - `GET /health` -- liveness with uptime, unauthenticated
//! - `GET /events` -- SSE stream of realtime notifications

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;

use atende_core::AtendeError;
use atende_ingest::IngestionPipeline;
use atende_notify::RealtimeHub;

use crate::handlers;

/// Server bind configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Shared state for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<IngestionPipeline>,
    pub hub: Arc<RealtimeHub>,
    pub start_time: std::time::Instant,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/webhook", post(handlers::post_webhook))
        .route("/health", get(handlers::get_health))
        .route("/events", get(handlers::get_events))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Bind and serve until the process exits.
pub async fn start_server(config: &ServerConfig, state: AppState) -> Result<(), AtendeError> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AtendeError::Internal(format!("failed to bind webhook server to {addr}: {e}")))?;

    tracing::info!("webhook server listening on {addr}");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| AtendeError::Internal(format!("webhook server error: {e}")))?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_config_debug() {
        let config = ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8085,
        };
        let debug = format!("{config:?}");
        assert!(debug.contains("127.0.0.1"));
    }
}
