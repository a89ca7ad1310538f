// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reaction operations: upsert keyed by (message, reactor), retraction on
//! empty emoji.

use atende_core::AtendeError;
use rusqlite::params;

use crate::database::{Database, map_tr_err};
use crate::models::Reaction;

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Reaction> {
    Ok(Reaction {
        id: row.get(0)?,
        message_id: row.get(1)?,
        reactor: row.get(2)?,
        emoji: row.get(3)?,
        created_at: row.get(4)?,
    })
}

/// Apply a reaction event: any existing reaction from the reactor is
/// removed first, and a new one is inserted unless the emoji is empty
/// (pure retraction). Returns whether a live reaction remains.
pub async fn apply(
    db: &Database,
    message_id: &str,
    reactor: &str,
    emoji: &str,
) -> Result<bool, AtendeError> {
    let message_id = message_id.to_string();
    let reactor = reactor.to_string();
    let emoji = emoji.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "DELETE FROM reactions WHERE message_id = ?1 AND reactor = ?2",
                params![message_id, reactor],
            )?;
            if emoji.is_empty() {
                return Ok(false);
            }
            conn.execute(
                "INSERT INTO reactions (id, message_id, reactor, emoji, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    message_id,
                    reactor,
                    emoji,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// All live reactions for a message.
pub async fn list_for_message(
    db: &Database,
    message_id: &str,
) -> Result<Vec<Reaction>, AtendeError> {
    let message_id = message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, message_id, reactor, emoji, created_at
                 FROM reactions WHERE message_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![message_id], map_row)?;
            let mut reactions = Vec::new();
            for row in rows {
                reactions.push(row?);
            }
            Ok(reactions)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Contact, MessageRecord};
    use crate::queries::contacts::insert_contact;
    use crate::queries::conversations::create_or_get;
    use crate::queries::instances::upsert_instance;
    use crate::queries::messages::insert_message;
    use atende_core::types::ConversationMode;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir, String) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("r.db").to_str().unwrap())
            .await
            .unwrap();
        let instance = upsert_instance(&db, "main").await.unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let contact = Contact {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance.id.clone(),
            phone: Some("5511999999999".to_string()),
            remote_jid: None,
            push_name: None,
            is_group: false,
            avatar_url: None,
            metadata: None,
            created_at: now.clone(),
            updated_at: now,
        };
        insert_contact(&db, &contact).await.unwrap();
        let (conversation, _) = create_or_get(&db, &instance.id, &contact.id, ConversationMode::Human)
            .await
            .unwrap();
        let message = MessageRecord::inbound(&conversation.id, "GW-1", "oi");
        insert_message(&db, &message).await.unwrap();
        (db, dir, message.id)
    }

    #[tokio::test]
    async fn one_live_reaction_per_reactor() {
        let (db, _dir, message_id) = setup().await;

        assert!(apply(&db, &message_id, "5511988887777@s.whatsapp.net", "\u{1F44D}")
            .await
            .unwrap());
        assert!(apply(&db, &message_id, "5511988887777@s.whatsapp.net", "\u{2764}")
            .await
            .unwrap());

        let reactions = list_for_message(&db, &message_id).await.unwrap();
        assert_eq!(reactions.len(), 1);
        assert_eq!(reactions[0].emoji, "\u{2764}");
    }

    #[tokio::test]
    async fn empty_emoji_retracts() {
        let (db, _dir, message_id) = setup().await;

        apply(&db, &message_id, "reactor", "\u{1F44D}").await.unwrap();
        assert!(!apply(&db, &message_id, "reactor", "").await.unwrap());
        assert!(list_for_message(&db, &message_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn retraction_without_prior_reaction_is_a_noop() {
        let (db, _dir, message_id) = setup().await;
        assert!(!apply(&db, &message_id, "reactor", "").await.unwrap());
        assert!(list_for_message(&db, &message_id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn different_reactors_coexist() {
        let (db, _dir, message_id) = setup().await;

        apply(&db, &message_id, "reactor-a", "\u{1F44D}").await.unwrap();
        apply(&db, &message_id, "reactor-b", "\u{1F602}").await.unwrap();

        let reactions = list_for_message(&db, &message_id).await.unwrap();
        assert_eq!(reactions.len(), 2);
    }
}
