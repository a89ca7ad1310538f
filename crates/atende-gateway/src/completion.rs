// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for the text-completion service.
//!
//! Speaks the messages-style completion API: a system block plus
//! alternating user/assistant turns in, one text completion out. Retries
//! once on transient statuses.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use atende_config::model::CompletionConfig;
use atende_core::AtendeError;
use atende_core::traits::completion::{
    CompletionProvider, CompletionRequest, CompletionResponse, DialogueRole, DialogueTurn,
};

#[derive(Debug, Clone, Serialize)]
struct ApiRequest {
    model: String,
    system: String,
    messages: Vec<ApiMessage>,
    max_tokens: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiResponse {
    content: Vec<ApiContentBlock>,
    model: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ApiContentBlock {
    #[serde(default)]
    text: String,
}

/// HTTP implementation of the completion provider seam.
#[derive(Debug, Clone)]
pub struct HttpCompletion {
    client: reqwest::Client,
    base_url: String,
    max_retries: u32,
}

impl HttpCompletion {
    pub fn new(config: &CompletionConfig) -> Result<Self, AtendeError> {
        let api_key = config
            .api_key
            .clone()
            .or_else(|| std::env::var("ATENDE_COMPLETION_API_KEY").ok())
            .ok_or_else(|| {
                AtendeError::Config(
                    "completion.api_key or ATENDE_COMPLETION_API_KEY is required".to_string(),
                )
            })?;

        let mut headers = HeaderMap::new();
        headers.insert(
            "x-api-key",
            HeaderValue::from_str(&api_key)
                .map_err(|e| AtendeError::Config(format!("invalid completion api key: {e}")))?,
        );
        headers.insert(
            "anthropic-version",
            HeaderValue::from_str(&config.api_version)
                .map_err(|e| AtendeError::Config(format!("invalid api version: {e}")))?,
        );
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AtendeError::Completion {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            base_url: config.base_url.clone(),
            max_retries: 1,
        })
    }

    #[cfg(test)]
    pub fn with_base_url(mut self, url: String) -> Self {
        self.base_url = url;
        self
    }
}

/// Collapse the dialogue into the strictly alternating turn sequence the
/// API requires: leading agent turns are dropped, consecutive same-role
/// turns are merged.
fn api_messages(history: &[DialogueTurn]) -> Vec<ApiMessage> {
    let mut messages: Vec<ApiMessage> = Vec::new();
    for turn in history {
        let role = match turn.role {
            DialogueRole::Customer => "user",
            DialogueRole::Agent => "assistant",
        };
        if messages.is_empty() && role == "assistant" {
            continue;
        }
        match messages.last_mut() {
            Some(last) if last.role == role => {
                last.content.push('\n');
                last.content.push_str(&turn.content);
            }
            _ => messages.push(ApiMessage {
                role: role.to_string(),
                content: turn.content.clone(),
            }),
        }
    }
    messages
}

#[async_trait]
impl CompletionProvider for HttpCompletion {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, AtendeError> {
        let api_request = ApiRequest {
            model: request.model.clone(),
            system: request.system.clone(),
            messages: api_messages(&request.history),
            max_tokens: request.max_tokens,
        };
        if api_request.messages.is_empty() {
            return Err(AtendeError::Completion {
                message: "no customer turns to complete from".into(),
                source: None,
            });
        }

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                warn!(attempt, "retrying completion request after transient error");
                tokio::time::sleep(Duration::from_secs(1)).await;
            }

            let response = self
                .client
                .post(&self.base_url)
                .json(&api_request)
                .send()
                .await
                .map_err(|e| AtendeError::Completion {
                    message: format!("HTTP request failed: {e}"),
                    source: Some(Box::new(e)),
                })?;

            let status = response.status();
            debug!(status = %status, attempt, "completion response received");

            if status.is_success() {
                let body: ApiResponse = response.json().await.map_err(|e| {
                    AtendeError::Completion {
                        message: format!("failed to parse completion response: {e}"),
                        source: Some(Box::new(e)),
                    }
                })?;
                let content = body
                    .content
                    .first()
                    .map(|block| block.text.clone())
                    .unwrap_or_default();
                return Ok(CompletionResponse {
                    content,
                    model: body.model,
                });
            }

            let body = response.text().await.unwrap_or_default();
            if matches!(status.as_u16(), 429 | 500 | 503 | 529) && attempt < self.max_retries {
                warn!(status = %status, body = %body, "transient completion error, will retry");
                last_error = Some(AtendeError::Completion {
                    message: format!("completion service returned {status}: {body}"),
                    source: None,
                });
                continue;
            }
            return Err(AtendeError::Completion {
                message: format!("completion service returned {status}: {body}"),
                source: None,
            });
        }

        Err(last_error.unwrap_or_else(|| AtendeError::Completion {
            message: "completion request failed after retries".into(),
            source: None,
        }))
    }
}
