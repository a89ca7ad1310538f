// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types for the persisted entities.
//!
//! String-typed state columns surface here as the closed enums from
//! `atende-core`; JSON columns (agent lists, weekday sets, read markers)
//! surface as parsed vectors.

use atende_core::types::{
    AssignmentStrategy, ConnectionState, ConversationMode, ConversationStatus, MessageKind,
    MessageStatus, TicketStatus,
};

/// A connected channel/account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instance {
    pub id: String,
    pub name: String,
    pub connection_state: ConnectionState,
    pub created_at: String,
}

/// A chat participant or group, scoped to one instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contact {
    pub id: String,
    pub instance_id: String,
    /// Canonical phone-like id; only ever upgraded, never overwritten by a
    /// weaker identifier.
    pub phone: Option<String>,
    pub remote_jid: Option<String>,
    pub push_name: Option<String>,
    pub is_group: bool,
    pub avatar_url: Option<String>,
    /// Free-form JSON metadata.
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// 1:1 between an instance and a contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    pub id: String,
    pub instance_id: String,
    pub contact_id: String,
    pub status: ConversationStatus,
    pub assigned_to: Option<String>,
    pub mode: ConversationMode,
    pub sector_id: Option<String>,
    pub unread_count: i64,
    pub last_message_at: Option<String>,
    pub last_message_preview: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// One chat event belonging to a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub id: String,
    pub conversation_id: String,
    /// Gateway message id; unique per conversation, the idempotency key.
    pub gateway_id: String,
    pub content: String,
    pub kind: MessageKind,
    pub media_url: Option<String>,
    pub media_mime: Option<String>,
    pub from_agent: bool,
    /// True for automation-originated sends (AI replies, templates).
    pub automated: bool,
    /// True for system notes never shown to the contact nor fed to the
    /// completion service.
    pub internal: bool,
    pub agent_id: Option<String>,
    pub status: MessageStatus,
    pub quoted_gateway_id: Option<String>,
    /// Sender inside a group conversation.
    pub participant: Option<String>,
    /// JSON array of participants that reported a read receipt (groups).
    pub read_by: Option<String>,
    pub deleted: bool,
    pub deleted_at: Option<String>,
    pub deleted_by: Option<String>,
    /// Free-form JSON; carries prior gateway ids under `prior_ids` when a
    /// gateway reassigns message ids.
    pub metadata: Option<String>,
    pub created_at: String,
}

impl MessageRecord {
    /// A contact-originated text message with everything else defaulted.
    pub fn inbound(conversation_id: &str, gateway_id: &str, content: &str) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation_id.to_string(),
            gateway_id: gateway_id.to_string(),
            content: content.to_string(),
            kind: MessageKind::Text,
            media_url: None,
            media_mime: None,
            from_agent: false,
            automated: false,
            internal: false,
            agent_id: None,
            status: MessageStatus::Sent,
            quoted_gateway_id: None,
            participant: None,
            read_by: None,
            deleted: false,
            deleted_at: None,
            deleted_by: None,
            metadata: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// An agent-originated message (human or automated).
    pub fn outbound(conversation_id: &str, gateway_id: &str, content: &str, automated: bool) -> Self {
        Self {
            from_agent: true,
            automated,
            ..Self::inbound(conversation_id, gateway_id, content)
        }
    }

    /// An internal system note, never sent anywhere.
    pub fn internal_note(conversation_id: &str, content: &str) -> Self {
        Self {
            kind: MessageKind::System,
            internal: true,
            from_agent: true,
            ..Self::inbound(
                conversation_id,
                &format!("internal-{}", uuid::Uuid::new_v4()),
                content,
            )
        }
    }
}

/// One live reaction per (message, reactor).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reaction {
    pub id: String,
    pub message_id: String,
    pub reactor: String,
    pub emoji: String,
    pub created_at: String,
}

/// A routing bucket with ticketing flags and templated messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sector {
    pub id: String,
    pub instance_id: String,
    pub name: String,
    pub is_default: bool,
    pub ticket_individual: bool,
    pub ticket_group: bool,
    pub welcome_template: Option<String>,
    pub closing_template: Option<String>,
    pub reopen_template: Option<String>,
    pub created_at: String,
}

/// Per-instance (optionally per-sector) assignment rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentRule {
    pub id: String,
    pub instance_id: String,
    pub sector_id: Option<String>,
    pub strategy: AssignmentStrategy,
    pub fixed_agent: Option<String>,
    /// Ordered agent list for round-robin.
    pub agents: Vec<String>,
    /// Single persisted cursor shared across all invocations of this rule.
    pub cursor: i64,
    pub active: bool,
    pub created_at: String,
}

/// A support ticket for a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub id: String,
    pub number: i64,
    pub conversation_id: String,
    pub sector_id: String,
    pub status: TicketStatus,
    pub created_at: String,
    pub updated_at: String,
    pub closed_at: Option<String>,
}

/// Automated-agent configuration for a sector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentConfig {
    pub id: String,
    pub sector_id: String,
    /// Display name prepended as a header on automated replies.
    pub agent_name: String,
    pub persona: Option<String>,
    pub tone: Option<String>,
    pub business_context: Option<String>,
    pub faq: Option<String>,
    pub model: String,
    pub enabled: bool,
    pub auto_reply: bool,
    pub hybrid_timeout_minutes: i64,
    pub response_delay_secs: i64,
    pub escalation_keywords: Vec<String>,
    /// Local-time window, "HH:MM". `None` on both ends means always open.
    pub hours_start: Option<String>,
    pub hours_end: Option<String>,
    /// Eligible weekdays, 0 = Monday .. 6 = Sunday; empty means every day.
    pub weekdays: Vec<u8>,
    pub out_of_hours_template: Option<String>,
    pub created_at: String,
}

/// Structured record of one generated reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionLog {
    pub id: String,
    pub config_id: String,
    pub conversation_id: String,
    pub prompt: String,
    pub completion: String,
    pub model: String,
    pub created_at: String,
}
