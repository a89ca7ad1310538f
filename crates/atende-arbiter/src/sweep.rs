// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-interval hybrid sweep task.
//!
//! Runs on its own timer, decoupled from per-event processing; the shared
//! gate inside the arbiter keeps the two paths from double-replying.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::arbiter::ResponseArbiter;

/// Spawn the periodic sweep. The task runs until aborted.
pub fn spawn_sweep(arbiter: Arc<ResponseArbiter>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick of tokio's interval fires immediately.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match arbiter.sweep().await {
                Ok(stats) if stats.replied > 0 => {
                    info!(
                        evaluated = stats.evaluated,
                        replied = stats.replied,
                        "hybrid sweep replied"
                    );
                }
                Ok(stats) => {
                    debug!(evaluated = stats.evaluated, "hybrid sweep complete");
                }
                Err(e) => {
                    warn!(error = %e, "hybrid sweep failed");
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use atende_core::types::ConversationMode;
    use atende_storage::models::{Contact, MessageRecord};
    use atende_storage::queries::{agent_configs, contacts, conversations, instances, messages, sectors};
    use atende_test_utils::{
        MockCompletion, MockGateway, agent_config_fixture, sector_fixture, temp_database,
    };

    use crate::arbiter::ArbiterSettings;

    #[tokio::test(flavor = "multi_thread")]
    async fn sweep_task_fires_on_the_interval() {
        let (db, _dir) = temp_database().await;
        let db = Arc::new(db);
        let instance = instances::upsert_instance(&db, "main").await.unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let contact = Contact {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance.id.clone(),
            phone: Some("5511999999999".to_string()),
            remote_jid: Some("5511999999999@s.whatsapp.net".to_string()),
            push_name: None,
            is_group: false,
            avatar_url: None,
            metadata: None,
            created_at: now.clone(),
            updated_at: now,
        };
        contacts::insert_contact(&db, &contact).await.unwrap();
        let sector = sector_fixture(&instance.id);
        sectors::insert_sector(&db, &sector).await.unwrap();
        agent_configs::insert_config(&db, &agent_config_fixture(&sector.id))
            .await
            .unwrap();
        let (conversation, _) =
            conversations::create_or_get(&db, &instance.id, &contact.id, ConversationMode::Hybrid)
                .await
                .unwrap();
        conversations::set_sector(&db, &conversation.id, &sector.id)
            .await
            .unwrap();

        // Customer message 10 minutes old; timeout is 5.
        let mut record = MessageRecord::inbound(&conversation.id, "GW-1", "oi");
        record.created_at = (chrono::Utc::now() - chrono::Duration::minutes(10)).to_rfc3339();
        messages::insert_message(&db, &record).await.unwrap();

        let gateway = MockGateway::new();
        let completion = MockCompletion::new();
        let arbiter = Arc::new(crate::arbiter::ResponseArbiter::new(
            Arc::clone(&db),
            gateway.clone(),
            completion,
            ArbiterSettings::default(),
        ));

        let handle = spawn_sweep(arbiter, Duration::from_millis(50));
        // Wait out a few periods; the shared gate keeps it at one reply.
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            if !gateway.sent().await.is_empty() {
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(150)).await;
        handle.abort();

        assert_eq!(gateway.sent().await.len(), 1);
    }
}
