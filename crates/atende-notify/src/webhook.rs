// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound webhook client.
//!
//! POSTs named events to the signed-retry dispatcher as
//! `{event, timestamp, data}`. The dispatcher owns signing and retry; this
//! client decides nothing beyond the single bounded-timeout call. A
//! missing endpoint disables webhooks silently.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use atende_config::model::WebhookConfig;
use atende_core::AtendeError;
use atende_core::traits::notify::WebhookSink;

pub struct WebhookClient {
    client: reqwest::Client,
    url: Option<String>,
}

impl WebhookClient {
    pub fn new(config: &WebhookConfig) -> Result<Self, AtendeError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AtendeError::Gateway {
                message: format!("failed to build webhook client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }
}

#[async_trait]
impl WebhookSink for WebhookClient {
    async fn publish(&self, event: &str, payload: serde_json::Value) -> Result<(), AtendeError> {
        let Some(url) = self.url.as_deref() else {
            debug!(event, "webhooks disabled, event dropped");
            return Ok(());
        };

        let body = serde_json::json!({
            "event": event,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "data": payload,
        });
        let response = self
            .client
            .post(url)
            .json(&body)
            .send()
            .await
            .map_err(|e| AtendeError::Gateway {
                message: format!("webhook POST failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            return Err(AtendeError::Gateway {
                message: format!("webhook dispatcher returned {}", response.status()),
                source: None,
            });
        }
        debug!(event, "webhook published");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn publishes_the_envelope_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/hooks"))
            .and(body_partial_json(serde_json::json!({
                "event": "new_message",
                "data": { "messageId": "msg-1" }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let client = WebhookClient::new(&WebhookConfig {
            url: Some(format!("{}/hooks", server.uri())),
            timeout_secs: 5,
        })
        .unwrap();
        client
            .publish("new_message", serde_json::json!({ "messageId": "msg-1" }))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn disabled_endpoint_is_a_silent_noop() {
        let client = WebhookClient::new(&WebhookConfig {
            url: None,
            timeout_secs: 5,
        })
        .unwrap();
        client
            .publish("new_message", serde_json::json!({}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn dispatcher_failure_surfaces_as_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = WebhookClient::new(&WebhookConfig {
            url: Some(server.uri()),
            timeout_secs: 5,
        })
        .unwrap();
        let result = client.publish("new_message", serde_json::json!({})).await;
        assert!(result.is_err());
    }
}
