// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Collecting notification sinks and an in-memory media store.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use atende_core::AtendeError;
use atende_core::traits::media::MediaStore;
use atende_core::traits::notify::{RealtimeEvent, RealtimeSink, WebhookSink};

/// Realtime sink that collects every published event.
#[derive(Default)]
pub struct CollectingRealtime {
    events: Mutex<Vec<RealtimeEvent>>,
}

impl CollectingRealtime {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<RealtimeEvent> {
        self.events.lock().unwrap().clone()
    }
}

impl RealtimeSink for CollectingRealtime {
    fn publish(&self, event: RealtimeEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Webhook sink that collects (event, payload) pairs.
#[derive(Default)]
pub struct CollectingWebhook {
    published: Mutex<Vec<(String, serde_json::Value)>>,
}

impl CollectingWebhook {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn published(&self) -> Vec<(String, serde_json::Value)> {
        self.published.lock().unwrap().clone()
    }

    /// Names of published events, in order.
    pub fn event_names(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }
}

#[async_trait]
impl WebhookSink for CollectingWebhook {
    async fn publish(&self, event: &str, payload: serde_json::Value) -> Result<(), AtendeError> {
        self.published
            .lock()
            .unwrap()
            .push((event.to_string(), payload));
        Ok(())
    }
}

/// In-memory media store; optionally fails every put.
#[derive(Default)]
pub struct MemoryMediaStore {
    objects: Mutex<Vec<(String, Vec<u8>)>>,
    fail: std::sync::atomic::AtomicBool,
}

impl MemoryMediaStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, std::sync::atomic::Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }
}

#[async_trait]
impl MediaStore for MemoryMediaStore {
    async fn put(&self, key: &str, bytes: &[u8], _mime_type: &str) -> Result<String, AtendeError> {
        if self.fail.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(AtendeError::Media {
                message: "mock store failure".into(),
                source: None,
            });
        }
        self.objects
            .lock()
            .unwrap()
            .push((key.to_string(), bytes.to_vec()));
        Ok(format!("durable://{key}"))
    }
}
