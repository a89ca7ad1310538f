// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handlers for the webhook server.

use std::convert::Infallible;

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::{self, Stream};
use tokio::sync::broadcast;
use tracing::{error, warn};

use atende_core::event::EventEnvelope;

use crate::server::AppState;

/// Gateway events in. Always 200 once the body parses: the gateway
/// re-delivers on failure and the pipeline is idempotent, so processing
/// errors are logged instead of bounced.
pub async fn post_webhook(
    State(state): State<AppState>,
    Json(envelope): Json<EventEnvelope>,
) -> StatusCode {
    if let Err(e) = state.pipeline.handle_event(&envelope).await {
        error!(
            event = %envelope.event,
            instance = %envelope.instance,
            error = %e,
            "event processing failed"
        );
    }
    StatusCode::OK
}

/// Liveness with uptime.
pub async fn get_health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "uptime_secs": state.start_time.elapsed().as_secs(),
    }))
}

/// SSE stream of realtime notifications. Lagged consumers skip ahead;
/// they reconcile on their own.
pub async fn get_events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.hub.subscribe();
    let stream = stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let data = match serde_json::to_string(&event) {
                        Ok(data) => data,
                        Err(e) => {
                            warn!(error = %e, "failed to serialize realtime event");
                            continue;
                        }
                    };
                    return Some((Ok(Event::default().event("update").data(data)), rx));
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "SSE consumer lagged");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });
    Sse::new(stream).keep_alive(KeepAlive::default())
}
