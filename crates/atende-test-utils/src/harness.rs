// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test fixtures: a temp-file database plus builders for seeded rows and
//! inbound gateway events.

use tempfile::TempDir;

use atende_core::event::{EventData, EventEnvelope, MessageKey, RawMessageContent};
use atende_storage::Database;
use atende_storage::models::{AgentConfig, AssignmentRule, Sector};
use atende_core::types::AssignmentStrategy;

/// A temp database that lives as long as the returned guard.
pub async fn temp_database() -> (Database, TempDir) {
    let dir = TempDir::new().expect("tempdir");
    let db = Database::open(dir.path().join("atende-test.db").to_str().unwrap())
        .await
        .expect("open test database");
    (db, dir)
}

/// A sector with ticketing enabled for individual chats.
pub fn sector_fixture(instance_id: &str) -> Sector {
    Sector {
        id: uuid::Uuid::new_v4().to_string(),
        instance_id: instance_id.to_string(),
        name: "Suporte".to_string(),
        is_default: true,
        ticket_individual: true,
        ticket_group: false,
        welcome_template: None,
        closing_template: None,
        reopen_template: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// An enabled auto-reply agent config with no working-hours restriction.
pub fn agent_config_fixture(sector_id: &str) -> AgentConfig {
    AgentConfig {
        id: uuid::Uuid::new_v4().to_string(),
        sector_id: sector_id.to_string(),
        agent_name: "Clara".to_string(),
        persona: Some("Voce e uma atendente cordial da loja.".to_string()),
        tone: Some("informal".to_string()),
        business_context: Some("Loja de eletronicos.".to_string()),
        faq: None,
        model: "claude-haiku-4-5-20250901".to_string(),
        enabled: true,
        auto_reply: true,
        hybrid_timeout_minutes: 5,
        response_delay_secs: 0,
        escalation_keywords: vec!["atendente".to_string()],
        hours_start: None,
        hours_end: None,
        weekdays: Vec::new(),
        out_of_hours_template: None,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// A round-robin rule over the given agents.
pub fn round_robin_rule_fixture(instance_id: &str, agents: &[&str]) -> AssignmentRule {
    AssignmentRule {
        id: uuid::Uuid::new_v4().to_string(),
        instance_id: instance_id.to_string(),
        sector_id: None,
        strategy: AssignmentStrategy::RoundRobin,
        fixed_agent: None,
        agents: agents.iter().map(|s| s.to_string()).collect(),
        cursor: 0,
        active: true,
        created_at: chrono::Utc::now().to_rfc3339(),
    }
}

/// Builder for inbound gateway events.
pub struct EventBuilder {
    instance: String,
    remote_jid: String,
    gateway_id: String,
    from_me: bool,
    push_name: Option<String>,
    participant: Option<String>,
    timestamp: Option<i64>,
}

impl EventBuilder {
    pub fn new(instance: &str, remote_jid: &str) -> Self {
        Self {
            instance: instance.to_string(),
            remote_jid: remote_jid.to_string(),
            gateway_id: format!("GW-{}", uuid::Uuid::new_v4()),
            from_me: false,
            push_name: None,
            participant: None,
            timestamp: None,
        }
    }

    pub fn gateway_id(mut self, id: &str) -> Self {
        self.gateway_id = id.to_string();
        self
    }

    pub fn from_me(mut self, from_me: bool) -> Self {
        self.from_me = from_me;
        self
    }

    pub fn push_name(mut self, name: &str) -> Self {
        self.push_name = Some(name.to_string());
        self
    }

    pub fn participant(mut self, participant: &str) -> Self {
        self.participant = Some(participant.to_string());
        self
    }

    /// Override the gateway timestamp (unix seconds).
    pub fn timestamp(mut self, unix_secs: i64) -> Self {
        self.timestamp = Some(unix_secs);
        self
    }

    fn key(&self) -> MessageKey {
        MessageKey {
            id: self.gateway_id.clone(),
            remote_jid: self.remote_jid.clone(),
            from_me: self.from_me,
            participant: self.participant.clone(),
            sender_pn: None,
        }
    }

    /// A `messages.upsert` with a plain text payload.
    pub fn text(self, text: &str) -> EventEnvelope {
        let message = RawMessageContent {
            conversation: Some(text.to_string()),
            ..Default::default()
        };
        self.payload(message)
    }

    /// A `messages.upsert` carrying an arbitrary raw payload.
    pub fn payload(self, message: RawMessageContent) -> EventEnvelope {
        let timestamp = self
            .timestamp
            .unwrap_or_else(|| chrono::Utc::now().timestamp());
        EventEnvelope {
            event: "messages.upsert".to_string(),
            instance: self.instance.clone(),
            data: EventData {
                key: Some(self.key()),
                message: Some(message),
                message_timestamp: Some(timestamp),
                push_name: self.push_name.clone(),
                ..Default::default()
            },
        }
    }

    /// A `messages.update` receipt for this message id.
    pub fn receipt(self, status: &str) -> EventEnvelope {
        EventEnvelope {
            event: "messages.update".to_string(),
            instance: self.instance.clone(),
            data: EventData {
                key: Some(self.key()),
                status: Some(status.to_string()),
                participant: self.participant.clone(),
                ..Default::default()
            },
        }
    }

    /// A `messages.delete` for this message id.
    pub fn delete(self) -> EventEnvelope {
        EventEnvelope {
            event: "messages.delete".to_string(),
            instance: self.instance.clone(),
            data: EventData {
                key: Some(self.key()),
                ..Default::default()
            },
        }
    }
}

/// A `connection.update` event.
pub fn connection_event(instance: &str, state: &str) -> EventEnvelope {
    EventEnvelope {
        event: "connection.update".to_string(),
        instance: instance.to_string(),
        data: EventData {
            state: Some(state.to_string()),
            ..Default::default()
        },
    }
}
