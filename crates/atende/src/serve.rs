// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `atende serve` command implementation.
//!
//! Wires the full platform: SQLite storage, the gateway and completion
//! HTTP clients, the ingestion pipeline with its policy chain, the
//! realtime hub and webhook client, the inbound webhook server, and the
//! periodic hybrid sweep.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use atende_arbiter::{ArbiterSettings, ResponseArbiter, spawn_sweep};
use atende_config::AtendeConfig;
use atende_core::AtendeError;
use atende_core::traits::completion::CompletionProvider;
use atende_core::traits::media::MediaStore;
use atende_core::traits::notify::{RealtimeSink, WebhookSink};
use atende_core::traits::transport::GatewayTransport;
use atende_gateway::{HttpCompletion, HttpGateway};
use atende_ingest::{
    FsMediaStore, IdentityResolver, IngestionPipeline, MediaRehoster, StatusReconciler,
};
use atende_notify::{RealtimeHub, WebhookClient};
use atende_policy::{AssignmentEngine, TicketManager};
use atende_server::{AppState, ServerConfig, start_server};
use atende_storage::Database;

/// Runs the `atende serve` command until interrupted.
pub async fn run_serve(config: AtendeConfig) -> Result<(), AtendeError> {
    init_tracing(&config.platform.log_level);

    info!("starting atende serve");

    let db = Arc::new(Database::open(&config.storage.database_path).await?);

    let transport: Arc<dyn GatewayTransport> = Arc::new(HttpGateway::new(&config.gateway)?);
    let completion: Arc<dyn CompletionProvider> = {
        let provider = HttpCompletion::new(&config.completion).map_err(|e| {
            error!(error = %e, "failed to initialize completion provider");
            eprintln!(
                "error: completion API key required. Set completion.api_key or the \
                 ATENDE_COMPLETION_API_KEY environment variable."
            );
            e
        })?;
        Arc::new(provider)
    };
    let media_store: Arc<dyn MediaStore> = Arc::new(FsMediaStore::new(&config.media.dir));

    let hub = Arc::new(RealtimeHub::new());
    let realtime: Arc<dyn RealtimeSink> = hub.clone();
    let webhook: Arc<dyn WebhookSink> = Arc::new(WebhookClient::new(&config.webhook)?);

    let arbiter = Arc::new(ResponseArbiter::new(
        Arc::clone(&db),
        transport.clone(),
        completion,
        ArbiterSettings {
            history_limit: config.arbiter.history_limit as i64,
            max_tokens: config.arbiter.max_tokens,
        },
    ));

    let pipeline = IngestionPipeline::new(
        Arc::clone(&db),
        IdentityResolver::new(Arc::clone(&db), transport.clone()),
        MediaRehoster::new(
            transport.clone(),
            media_store,
            config.gateway.clone(),
            &config.media,
        )?,
        StatusReconciler::new(Arc::clone(&db), realtime.clone(), webhook.clone()),
        AssignmentEngine::new(Arc::clone(&db)),
        TicketManager::new(Arc::clone(&db), transport.clone()),
        Arc::clone(&arbiter),
        realtime,
        webhook,
    );

    let sweep_handle = spawn_sweep(
        arbiter,
        Duration::from_secs(config.arbiter.sweep_interval_secs),
    );
    info!(
        interval_secs = config.arbiter.sweep_interval_secs,
        "hybrid sweep scheduled"
    );

    let state = AppState {
        pipeline: Arc::new(pipeline),
        hub,
        start_time: std::time::Instant::now(),
    };
    let server_config = ServerConfig {
        host: config.server.host.clone(),
        port: config.server.port,
    };

    tokio::select! {
        result = start_server(&server_config, state) => {
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("shutdown signal received");
        }
    }

    sweep_handle.abort();
    db.close().await?;
    info!("atende stopped");
    Ok(())
}

/// Initialize the tracing subscriber; `RUST_LOG` overrides the configured
/// level.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
