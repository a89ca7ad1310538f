// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the messaging gateway.
//!
//! Every request carries a bounded timeout and retries once on transient
//! statuses (429, 500, 503). Group text sends fall back to the secondary
//! group transport path before the attempt is reported as failed.

use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::{debug, warn};

use atende_config::model::GatewayConfig;
use atende_core::traits::transport::{GatewayTransport, GroupMetadata, OutboundMedia, OutboundText};
use atende_core::{AtendeError, jid};

use crate::types::{
    ApiErrorResponse, GroupInfoResponse, KeyRef, MediaFetchKey, MediaFetchRequest,
    MediaFetchResponse, QuotedRef, SendMediaRequest, SendResponse, SendTextRequest,
};

/// HTTP implementation of the gateway transport seam.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HttpGateway {
    pub fn new(config: &GatewayConfig) -> Result<Self, AtendeError> {
        let mut headers = HeaderMap::new();
        if let Some(api_key) = config.api_key.as_deref() {
            headers.insert(
                "apikey",
                HeaderValue::from_str(api_key)
                    .map_err(|e| AtendeError::Config(format!("invalid gateway api key: {e}")))?,
            );
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AtendeError::Gateway {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: 1,
        })
    }

    /// POST a JSON body, retrying once on transient statuses, and parse
    /// the JSON response.
    async fn post_json<B: serde::Serialize, R: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, AtendeError> {
        let url = format!("{}{path}", self.base_url);
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, path, "retrying gateway request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&url)
                .json(body)
                .send()
                .await
                .map_err(|e| AtendeError::Gateway {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, path, "gateway response received");

            if status.is_success() {
                let body = response.text().await.map_err(|e| AtendeError::Gateway {
                    message: format!("failed to read response body: {e}"),
                    source: Some(Box::new(e)),
                })?;
                return serde_json::from_str(&body).map_err(|e| AtendeError::Gateway {
                    message: format!("failed to parse gateway response: {e}"),
                    source: Some(Box::new(e)),
                });
            }

            if is_transient_error(status) && attempt < self.max_retries {
                let body = response.text().await.unwrap_or_default();
                warn!(status = %status, body = %body, "transient gateway error, will retry");
                last_error = Some(AtendeError::Gateway {
                    message: format!("gateway returned {status}: {body}"),
                    source: None,
                });
                continue;
            }

            let body = response.text().await.unwrap_or_default();
            let message = match serde_json::from_str::<ApiErrorResponse>(&body) {
                Ok(api_err) => format!("gateway error ({status}): {}", api_err.message),
                Err(_) => format!("gateway returned {status}: {body}"),
            };
            return Err(AtendeError::Gateway {
                message,
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| AtendeError::Gateway {
            message: "gateway request failed after retries".into(),
            source: None,
        }))
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url.trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl GatewayTransport for HttpGateway {
    async fn send_text(&self, instance: &str, out: &OutboundText) -> Result<String, AtendeError> {
        let request = SendTextRequest {
            number: out.to.clone(),
            text: out.text.clone(),
            quoted: out.quoted_id.clone().map(|id| QuotedRef {
                key: KeyRef { id },
            }),
        };

        let primary = self
            .post_json::<_, SendResponse>(&format!("/message/sendText/{instance}"), &request)
            .await;

        match primary {
            Ok(response) => Ok(response.key.id),
            Err(primary_err) if jid::is_group(&out.to) => {
                // Secondary transport path for group text sends.
                warn!(
                    destination = %out.to,
                    error = %primary_err,
                    "primary group send failed, trying group transport"
                );
                let response = self
                    .post_json::<_, SendResponse>(&format!("/group/sendText/{instance}"), &request)
                    .await?;
                Ok(response.key.id)
            }
            Err(e) => Err(e),
        }
    }

    async fn send_media(&self, instance: &str, out: &OutboundMedia) -> Result<String, AtendeError> {
        let request = SendMediaRequest {
            number: out.to.clone(),
            media_url: out.url.clone(),
            mimetype: out.mime_type.clone(),
            caption: out.caption.clone(),
        };
        let response = self
            .post_json::<_, SendResponse>(&format!("/message/sendMedia/{instance}"), &request)
            .await?;
        Ok(response.key.id)
    }

    async fn fetch_media(
        &self,
        instance: &str,
        gateway_message_id: &str,
    ) -> Result<Vec<u8>, AtendeError> {
        let request = MediaFetchRequest {
            message: MediaFetchKey {
                key: KeyRef {
                    id: gateway_message_id.to_string(),
                },
            },
        };
        let response: MediaFetchResponse = self
            .post_json(
                &format!("/chat/getBase64FromMediaMessage/{instance}"),
                &request,
            )
            .await?;
        base64::engine::general_purpose::STANDARD
            .decode(response.base64.as_bytes())
            .map_err(|e| AtendeError::Media {
                message: format!("gateway returned invalid base64: {e}"),
                source: Some(Box::new(e)),
            })
    }

    async fn group_metadata(
        &self,
        instance: &str,
        group_jid: &str,
    ) -> Result<Option<GroupMetadata>, AtendeError> {
        let url = format!(
            "{}/group/findGroupInfos/{instance}?groupJid={group_jid}",
            self.base_url
        );
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| AtendeError::Gateway {
                message: format!("HTTP request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            // Best-effort side-channel; callers treat absence as fine.
            return Ok(None);
        }
        let info: GroupInfoResponse = response.json().await.map_err(|e| AtendeError::Gateway {
            message: format!("failed to parse group info: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(Some(GroupMetadata {
            subject: info.subject,
            picture_url: info.picture_url,
        }))
    }
}

/// Transient statuses worth one retry.
fn is_transient_error(status: reqwest::StatusCode) -> bool {
    matches!(status.as_u16(), 429 | 500 | 503)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_client(base_url: &str) -> HttpGateway {
        let config = GatewayConfig {
            base_url: "http://placeholder".to_string(),
            api_key: Some("test-key".to_string()),
            timeout_secs: 5,
            transient_hosts: Vec::new(),
        };
        HttpGateway::new(&config)
            .unwrap()
            .with_base_url(base_url.to_string())
    }

    fn sent_body(id: &str) -> serde_json::Value {
        serde_json::json!({ "key": { "id": id } })
    }

    #[tokio::test]
    async fn send_text_returns_the_gateway_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .and(body_partial_json(serde_json::json!({
                "number": "5511999999999@s.whatsapp.net",
                "text": "ola"
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent_body("SENT-1")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let out = OutboundText {
            to: "5511999999999@s.whatsapp.net".to_string(),
            text: "ola".to_string(),
            quoted_id: None,
        };
        let id = client.send_text("main", &out).await.unwrap();
        assert_eq!(id, "SENT-1");
    }

    #[tokio::test]
    async fn send_text_retries_once_on_503() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent_body("SENT-2")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let out = OutboundText {
            to: "5511999999999@s.whatsapp.net".to_string(),
            text: "ola".to_string(),
            quoted_id: None,
        };
        let id = client.send_text("main", &out).await.unwrap();
        assert_eq!(id, "SENT-2");
    }

    #[tokio::test]
    async fn group_send_falls_back_to_group_transport() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "cannot send to group"
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/group/sendText/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(sent_body("GROUP-1")))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let out = OutboundText {
            to: "1620000000@g.us".to_string(),
            text: "ola grupo".to_string(),
            quoted_id: None,
        };
        let id = client.send_text("main", &out).await.unwrap();
        assert_eq!(id, "GROUP-1");
    }

    #[tokio::test]
    async fn individual_send_does_not_use_group_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/message/sendText/main"))
            .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
                "message": "bad number"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let out = OutboundText {
            to: "5511999999999@s.whatsapp.net".to_string(),
            text: "ola".to_string(),
            quoted_id: None,
        };
        let err = client.send_text("main", &out).await.unwrap_err();
        assert!(err.to_string().contains("bad number"), "{err}");
    }

    #[tokio::test]
    async fn fetch_media_decodes_base64() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/getBase64FromMediaMessage/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "base64": "aGVsbG8=",
                "mimetype": "image/jpeg"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let bytes = client.fetch_media("main", "GW-1").await.unwrap();
        assert_eq!(bytes, b"hello");
    }

    #[tokio::test]
    async fn missing_group_metadata_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/group/findGroupInfos/main"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let metadata = client
            .group_metadata("main", "1620000000@g.us")
            .await
            .unwrap();
        assert!(metadata.is_none());
    }

    #[tokio::test]
    async fn group_metadata_parses_subject_and_picture() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/group/findGroupInfos/main"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "subject": "Time de Vendas",
                "pictureUrl": "https://cdn/pic.jpg"
            })))
            .mount(&server)
            .await;

        let client = test_client(&server.uri());
        let metadata = client
            .group_metadata("main", "1620000000@g.us")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.subject.as_deref(), Some("Time de Vendas"));
        assert_eq!(metadata.picture_url.as_deref(), Some("https://cdn/pic.jpg"));
    }
}
