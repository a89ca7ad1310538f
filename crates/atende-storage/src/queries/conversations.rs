// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation operations.
//!
//! At most one conversation exists per (instance, contact); creation is
//! guarded by the UNIQUE constraint and runs inside one writer closure.

use atende_core::AtendeError;
use atende_core::types::{ConversationMode, ConversationStatus};
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::Conversation;

const COLUMNS: &str = "id, instance_id, contact_id, status, assigned_to, mode, sector_id, \
                       unread_count, last_message_at, last_message_preview, created_at, updated_at";

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Conversation> {
    let status: String = row.get(3)?;
    let mode: String = row.get(5)?;
    Ok(Conversation {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        contact_id: row.get(2)?,
        status: super::parse_enum(3, &status)?,
        assigned_to: row.get(4)?,
        mode: super::parse_enum(5, &mode)?,
        sector_id: row.get(6)?,
        unread_count: row.get(7)?,
        last_message_at: row.get(8)?,
        last_message_preview: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

/// Fetch the conversation for (instance, contact), creating it on first
/// event for the pair. Returns the row and whether it was created.
pub async fn create_or_get(
    db: &Database,
    instance_id: &str,
    contact_id: &str,
    initial_mode: ConversationMode,
) -> Result<(Conversation, bool), AtendeError> {
    let instance_id = instance_id.to_string();
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| {
            let existing = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM conversations
                         WHERE instance_id = ?1 AND contact_id = ?2"
                    ),
                    params![instance_id, contact_id],
                    map_row,
                )
                .optional()?;
            if let Some(conversation) = existing {
                return Ok((conversation, false));
            }

            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO conversations (id, instance_id, contact_id, status, mode, \
                 unread_count, created_at, updated_at)
                 VALUES (?1, ?2, ?3, 'active', ?4, 0, ?5, ?5)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    instance_id,
                    contact_id,
                    initial_mode.to_string(),
                    now,
                ],
            )?;
            let conversation = conn.query_row(
                &format!(
                    "SELECT {COLUMNS} FROM conversations
                     WHERE instance_id = ?1 AND contact_id = ?2"
                ),
                params![instance_id, contact_id],
                map_row,
            )?;
            Ok((conversation, true))
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a conversation by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Conversation>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let conversation = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM conversations WHERE id = ?1"),
                    params![id],
                    map_row,
                )
                .optional()?;
            Ok(conversation)
        })
        .await
        .map_err(map_tr_err)
}

/// Update last-message aggregates; unread count only moves for
/// contact-originated messages.
pub async fn record_last_message(
    db: &Database,
    id: &str,
    at: &str,
    preview: &str,
    increment_unread: bool,
) -> Result<(), AtendeError> {
    let id = id.to_string();
    let at = at.to_string();
    let preview = preview.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations
                 SET last_message_at = ?2,
                     last_message_preview = ?3,
                     unread_count = unread_count + ?4,
                     updated_at = ?5
                 WHERE id = ?1",
                params![
                    id,
                    at,
                    preview,
                    i64::from(increment_unread),
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Set the sector of a conversation.
pub async fn set_sector(db: &Database, id: &str, sector_id: &str) -> Result<(), AtendeError> {
    let id = id.to_string();
    let sector_id = sector_id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET sector_id = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, sector_id, chrono::Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Set the conversation mode.
pub async fn set_mode(db: &Database, id: &str, mode: ConversationMode) -> Result<(), AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET mode = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, mode.to_string(), chrono::Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Set the conversation status.
pub async fn set_status(
    db: &Database,
    id: &str,
    status: ConversationStatus,
) -> Result<(), AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE conversations SET status = ?2, updated_at = ?3 WHERE id = ?1",
                params![id, status.to_string(), chrono::Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// One-shot assignment: only takes effect while no agent is assigned.
pub async fn assign_if_unassigned(
    db: &Database,
    id: &str,
    agent: &str,
) -> Result<bool, AtendeError> {
    let id = id.to_string();
    let agent = agent.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE conversations SET assigned_to = ?2, updated_at = ?3
                 WHERE id = ?1 AND assigned_to IS NULL",
                params![id, agent, chrono::Utc::now().to_rfc3339()],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// All active hybrid conversations, for the periodic sweep.
pub async fn list_hybrid_active(db: &Database) -> Result<Vec<Conversation>, AtendeError> {
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM conversations
                 WHERE mode = 'hybrid' AND status = 'active'
                 ORDER BY last_message_at ASC"
            ))?;
            let rows = stmt.query_map([], map_row)?;
            let mut conversations = Vec::new();
            for row in rows {
                conversations.push(row?);
            }
            Ok(conversations)
        })
        .await
        .map_err(map_tr_err)
}
