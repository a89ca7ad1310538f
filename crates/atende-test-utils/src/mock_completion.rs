// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock completion provider for deterministic testing.
//!
//! Responses are popped from a FIFO queue; when the queue is empty a
//! default text is returned. Can be flipped into failure mode to test
//! the arbiter's abort-only-the-attempt semantics.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use atende_core::AtendeError;
use atende_core::traits::completion::{CompletionProvider, CompletionRequest, CompletionResponse};

/// A mock completion service with a FIFO response queue.
pub struct MockCompletion {
    responses: Mutex<VecDeque<String>>,
    requests: Mutex<Vec<CompletionRequest>>,
    fail: AtomicBool,
    calls: AtomicU64,
}

impl MockCompletion {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        })
    }

    pub fn with_responses(responses: Vec<String>) -> Arc<Self> {
        Arc::new(Self {
            responses: Mutex::new(VecDeque::from(responses)),
            requests: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
            calls: AtomicU64::new(0),
        })
    }

    /// Queue a response.
    pub async fn add_response(&self, text: &str) {
        self.responses.lock().await.push_back(text.to_string());
    }

    /// Every request the mock has served.
    pub async fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().await.clone()
    }

    /// Number of completed calls.
    pub fn call_count(&self) -> u64 {
        self.calls.load(Ordering::SeqCst)
    }

    /// Make every call fail until flipped back.
    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl CompletionProvider for MockCompletion {
    async fn complete(
        &self,
        request: CompletionRequest,
    ) -> Result<CompletionResponse, AtendeError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AtendeError::Completion {
                message: "mock completion failure".into(),
                source: None,
            });
        }
        let model = request.model.clone();
        self.requests.lock().await.push(request);
        self.calls.fetch_add(1, Ordering::SeqCst);
        let content = self
            .responses
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| "mock completion".to_string());
        Ok(CompletionResponse { content, model })
    }
}
