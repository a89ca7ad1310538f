// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock gateway transport for deterministic testing.
//!
//! Records every outbound call and returns scripted results, enabling
//! fast, CI-runnable tests without a live gateway.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use atende_core::AtendeError;
use atende_core::traits::transport::{GatewayTransport, GroupMetadata, OutboundMedia, OutboundText};

/// A recorded outbound send.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub instance: String,
    pub to: String,
    pub text: String,
}

/// Mock transport: records sends, serves canned media bytes and group
/// metadata, and can be flipped into failure mode.
pub struct MockGateway {
    sent: Mutex<Vec<SentMessage>>,
    media: Mutex<Option<Vec<u8>>>,
    group: Mutex<Option<GroupMetadata>>,
    fail_sends: AtomicBool,
    counter: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            sent: Mutex::new(Vec::new()),
            media: Mutex::new(None),
            group: Mutex::new(None),
            fail_sends: AtomicBool::new(false),
            counter: AtomicU64::new(0),
        })
    }

    /// All sends recorded so far.
    pub async fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    /// Script the bytes served by `fetch_media`.
    pub async fn set_media(&self, bytes: Vec<u8>) {
        *self.media.lock().await = Some(bytes);
    }

    /// Script the metadata served by `group_metadata`.
    pub async fn set_group_metadata(&self, metadata: GroupMetadata) {
        *self.group.lock().await = Some(metadata);
    }

    /// Make every send fail until flipped back.
    pub fn set_fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    fn next_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst);
        format!("MOCK-SENT-{n}")
    }
}

#[async_trait]
impl GatewayTransport for MockGateway {
    async fn send_text(&self, instance: &str, out: &OutboundText) -> Result<String, AtendeError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AtendeError::Gateway {
                message: "mock send failure".into(),
                source: None,
            });
        }
        self.sent.lock().await.push(SentMessage {
            instance: instance.to_string(),
            to: out.to.clone(),
            text: out.text.clone(),
        });
        Ok(self.next_id())
    }

    async fn send_media(&self, instance: &str, out: &OutboundMedia) -> Result<String, AtendeError> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(AtendeError::Gateway {
                message: "mock send failure".into(),
                source: None,
            });
        }
        self.sent.lock().await.push(SentMessage {
            instance: instance.to_string(),
            to: out.to.clone(),
            text: format!("[media] {}", out.url),
        });
        Ok(self.next_id())
    }

    async fn fetch_media(
        &self,
        _instance: &str,
        _gateway_message_id: &str,
    ) -> Result<Vec<u8>, AtendeError> {
        self.media
            .lock()
            .await
            .clone()
            .ok_or_else(|| AtendeError::Media {
                message: "no scripted media".into(),
                source: None,
            })
    }

    async fn group_metadata(
        &self,
        _instance: &str,
        _group_jid: &str,
    ) -> Result<Option<GroupMetadata>, AtendeError> {
        Ok(self.group.lock().await.clone())
    }
}
