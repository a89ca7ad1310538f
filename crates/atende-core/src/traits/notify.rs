// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Realtime and webhook notification seams.
//!
//! Both are best-effort, at-least-once surfaces: a failed publish is
//! logged and never unwinds the persistence that preceded it. Consumers
//! must be idempotent.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::AtendeError;
use crate::types::MessageStatus;

/// Named outbound webhook events.
pub mod webhook_events {
    pub const NEW_CONVERSATION: &str = "new_conversation";
    pub const NEW_MESSAGE: &str = "new_message";
    pub const MESSAGE_DELIVERED: &str = "message_delivered";
    pub const MESSAGE_READ: &str = "message_read";
    pub const MESSAGE_DELETED: &str = "message_deleted";
    pub const TICKET_CREATED: &str = "ticket_created";
}

/// Fire-and-forget notification to the UI collaborator.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RealtimeEvent {
    MessageCreated {
        conversation_id: String,
        message_id: String,
        preview: String,
    },
    MessageUpdated {
        conversation_id: String,
        message_id: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        status: Option<MessageStatus>,
        deleted: bool,
    },
    ConversationUpdated {
        conversation_id: String,
        unread_count: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        assigned_to: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        last_message_at: Option<String>,
    },
}

/// Realtime fan-out; the consumer reconciles on its own.
pub trait RealtimeSink: Send + Sync {
    fn publish(&self, event: RealtimeEvent);
}

/// Outbound webhook dispatcher seam. The dispatcher owns signing and
/// retry; the core only decides whether and with what payload to call it.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn publish(&self, event: &str, payload: serde_json::Value) -> Result<(), AtendeError>;
}
