// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot agent assignment for unassigned conversations.
//!
//! Rule precedence: sector-specific active rule, else instance-wide
//! (no-sector) active rule, else no-op. The round-robin cursor is a single
//! persisted value advanced atomically in the storage layer, shared across
//! every invocation of the rule.

use std::sync::Arc;

use tracing::{debug, info};

use atende_core::AtendeError;
use atende_core::types::AssignmentStrategy;
use atende_storage::Database;
use atende_storage::models::Conversation;
use atende_storage::queries::{conversations, rules};

pub struct AssignmentEngine {
    db: Arc<Database>,
}

impl AssignmentEngine {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Assigns an agent to the conversation if it has none. Returns the
    /// assigned agent, or `None` when no rule applies or the conversation
    /// is already assigned (one-shot: never overwrites).
    pub async fn assign(&self, conversation: &Conversation) -> Result<Option<String>, AtendeError> {
        if conversation.assigned_to.is_some() {
            return Ok(None);
        }

        let rule = match rules::find_applicable(
            &self.db,
            &conversation.instance_id,
            conversation.sector_id.as_deref(),
        )
        .await?
        {
            Some(rule) => rule,
            None => {
                debug!(
                    conversation_id = %conversation.id,
                    "no assignment rule applies"
                );
                return Ok(None);
            }
        };

        let agent = match rule.strategy {
            AssignmentStrategy::Fixed => rule.fixed_agent.clone(),
            AssignmentStrategy::RoundRobin => {
                rules::advance_round_robin(&self.db, &rule.id).await?
            }
        };

        let Some(agent) = agent else {
            debug!(rule_id = %rule.id, "rule has no agent to assign");
            return Ok(None);
        };

        let applied = conversations::assign_if_unassigned(&self.db, &conversation.id, &agent).await?;
        if applied {
            info!(
                conversation_id = %conversation.id,
                agent = %agent,
                strategy = %rule.strategy,
                "conversation assigned"
            );
            Ok(Some(agent))
        } else {
            // Another ingestion won the race; that assignment stands.
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atende_core::types::ConversationMode;
    use atende_storage::models::{AssignmentRule, Contact};
    use atende_storage::queries::{contacts, instances};
    use atende_test_utils::{round_robin_rule_fixture, temp_database};

    async fn seed_conversation(db: &Database, instance_id: &str) -> Conversation {
        let now = chrono::Utc::now().to_rfc3339();
        let contact = Contact {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance_id.to_string(),
            phone: Some(format!("55119{}", &uuid::Uuid::new_v4().as_simple().to_string()[..8])),
            remote_jid: None,
            push_name: None,
            is_group: false,
            avatar_url: None,
            metadata: None,
            created_at: now.clone(),
            updated_at: now,
        };
        contacts::insert_contact(db, &contact).await.unwrap();
        let (conversation, _) =
            conversations::create_or_get(db, instance_id, &contact.id, ConversationMode::Human)
                .await
                .unwrap();
        conversation
    }

    #[tokio::test]
    async fn round_robin_distributes_across_conversations() {
        let (db, _dir) = temp_database().await;
        let db = Arc::new(db);
        let instance = instances::upsert_instance(&db, "main").await.unwrap();
        let rule = round_robin_rule_fixture(&instance.id, &["A", "B", "C"]);
        rules::insert_rule(&db, &rule).await.unwrap();

        let engine = AssignmentEngine::new(Arc::clone(&db));
        let mut picks = Vec::new();
        for _ in 0..3 {
            let conversation = seed_conversation(&db, &instance.id).await;
            picks.push(engine.assign(&conversation).await.unwrap().unwrap());
        }
        assert_eq!(picks, vec!["B", "C", "A"]);
    }

    #[tokio::test]
    async fn never_overwrites_an_assignment() {
        let (db, _dir) = temp_database().await;
        let db = Arc::new(db);
        let instance = instances::upsert_instance(&db, "main").await.unwrap();
        let rule = round_robin_rule_fixture(&instance.id, &["A", "B"]);
        rules::insert_rule(&db, &rule).await.unwrap();

        let engine = AssignmentEngine::new(Arc::clone(&db));
        let conversation = seed_conversation(&db, &instance.id).await;
        let first = engine.assign(&conversation).await.unwrap();
        assert!(first.is_some());

        let refreshed = conversations::get(&db, &conversation.id)
            .await
            .unwrap()
            .unwrap();
        let second = engine.assign(&refreshed).await.unwrap();
        assert!(second.is_none());
        assert_eq!(refreshed.assigned_to, first);
    }

    #[tokio::test]
    async fn fixed_strategy_uses_the_configured_agent() {
        let (db, _dir) = temp_database().await;
        let db = Arc::new(db);
        let instance = instances::upsert_instance(&db, "main").await.unwrap();
        let rule = AssignmentRule {
            strategy: AssignmentStrategy::Fixed,
            fixed_agent: Some("agent-fixed".to_string()),
            agents: Vec::new(),
            ..round_robin_rule_fixture(&instance.id, &[])
        };
        rules::insert_rule(&db, &rule).await.unwrap();

        let engine = AssignmentEngine::new(Arc::clone(&db));
        let conversation = seed_conversation(&db, &instance.id).await;
        let pick = engine.assign(&conversation).await.unwrap();
        assert_eq!(pick.as_deref(), Some("agent-fixed"));
    }

    #[tokio::test]
    async fn no_rule_is_a_silent_noop() {
        let (db, _dir) = temp_database().await;
        let db = Arc::new(db);
        let instance = instances::upsert_instance(&db, "main").await.unwrap();
        let engine = AssignmentEngine::new(Arc::clone(&db));
        let conversation = seed_conversation(&db, &instance.id).await;
        assert!(engine.assign(&conversation).await.unwrap().is_none());
    }
}
