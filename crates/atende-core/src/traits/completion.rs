// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Completion provider trait for the external text-completion service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::AtendeError;

/// Who produced a dialogue turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DialogueRole {
    Customer,
    Agent,
}

/// One turn of dialogue history passed to the completion service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogueTurn {
    pub role: DialogueRole,
    pub content: String,
}

/// A prompt-in request to the completion service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    pub model: String,
    /// Instruction block: persona, tone, business context, FAQ.
    pub system: String,
    /// Most recent dialogue turns, oldest first.
    pub history: Vec<DialogueTurn>,
    pub max_tokens: u32,
}

/// A completion-out response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionResponse {
    pub content: String,
    /// Model that actually served the request.
    pub model: String,
}

/// Prompt-in/completion-out service.
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest)
    -> Result<CompletionResponse, AtendeError>;
}
