// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message operations: idempotent insert, monotonic status updates, group
//! read markers, soft deletion, and the arbiter's guard lookups.

use atende_core::AtendeError;
use atende_core::types::MessageStatus;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::MessageRecord;

const COLUMNS: &str = "id, conversation_id, gateway_id, content, kind, media_url, media_mime, \
                       from_agent, automated, internal, agent_id, status, quoted_gateway_id, \
                       participant, read_by, deleted, deleted_at, deleted_by, metadata, created_at";

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<MessageRecord> {
    let kind: String = row.get(4)?;
    let status: String = row.get(11)?;
    Ok(MessageRecord {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        gateway_id: row.get(2)?,
        content: row.get(3)?,
        kind: super::parse_enum(4, &kind)?,
        media_url: row.get(5)?,
        media_mime: row.get(6)?,
        from_agent: row.get(7)?,
        automated: row.get(8)?,
        internal: row.get(9)?,
        agent_id: row.get(10)?,
        status: super::parse_enum(11, &status)?,
        quoted_gateway_id: row.get(12)?,
        participant: row.get(13)?,
        read_by: row.get(14)?,
        deleted: row.get(15)?,
        deleted_at: row.get(16)?,
        deleted_by: row.get(17)?,
        metadata: row.get(18)?,
        created_at: row.get(19)?,
    })
}

/// Idempotent insert keyed on (conversation, gateway id).
///
/// Duplicate delivery of the same gateway message degrades to a no-op;
/// returns whether a row was actually written.
pub async fn insert_message(db: &Database, message: &MessageRecord) -> Result<bool, AtendeError> {
    let message = message.clone();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO messages (id, conversation_id, gateway_id, content, kind, \
                 media_url, media_mime, from_agent, automated, internal, agent_id, status, \
                 quoted_gateway_id, participant, read_by, deleted, deleted_at, deleted_by, \
                 metadata, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
                 ?17, ?18, ?19, ?20)",
                params![
                    message.id,
                    message.conversation_id,
                    message.gateway_id,
                    message.content,
                    message.kind.to_string(),
                    message.media_url,
                    message.media_mime,
                    message.from_agent,
                    message.automated,
                    message.internal,
                    message.agent_id,
                    message.status.to_string(),
                    message.quoted_gateway_id,
                    message.participant,
                    message.read_by,
                    message.deleted,
                    message.deleted_at,
                    message.deleted_by,
                    message.metadata,
                    message.created_at,
                ],
            )?;
            Ok(inserted > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a message by row id.
pub async fn get(db: &Database, id: &str) -> Result<Option<MessageRecord>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let message = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM messages WHERE id = ?1"),
                    params![id],
                    map_row,
                )
                .optional()?;
            Ok(message)
        })
        .await
        .map_err(map_tr_err)
}

/// Primary receipt lookup by gateway message id.
pub async fn find_by_gateway_id(
    db: &Database,
    gateway_id: &str,
) -> Result<Option<MessageRecord>, AtendeError> {
    let gateway_id = gateway_id.to_string();
    db.connection()
        .call(move |conn| {
            let message = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM messages WHERE gateway_id = ?1 LIMIT 1"),
                    params![gateway_id],
                    map_row,
                )
                .optional()?;
            Ok(message)
        })
        .await
        .map_err(map_tr_err)
}

/// Best-effort secondary lookup against embedded metadata, for gateways
/// that reassign message ids.
pub async fn find_by_prior_gateway_id(
    db: &Database,
    gateway_id: &str,
) -> Result<Option<MessageRecord>, AtendeError> {
    let needle = format!("%\"{gateway_id}\"%");
    db.connection()
        .call(move |conn| {
            let message = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM messages
                         WHERE metadata IS NOT NULL AND metadata LIKE ?1
                         LIMIT 1"
                    ),
                    params![needle],
                    map_row,
                )
                .optional()?;
            Ok(message)
        })
        .await
        .map_err(map_tr_err)
}

/// Monotonic receipt application: the update lands only when the new
/// status ranks strictly above the stored one. Idempotent under
/// reordered and duplicate delivery.
pub async fn apply_status_if_greater(
    db: &Database,
    id: &str,
    new_status: MessageStatus,
) -> Result<bool, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let stored: String = match conn
                .query_row(
                    "SELECT status FROM messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?
            {
                Some(s) => s,
                None => return Ok(false),
            };
            let stored: MessageStatus = super::parse_enum(0, &stored)?;
            if new_status <= stored {
                return Ok(false);
            }
            conn.execute(
                "UPDATE messages SET status = ?2 WHERE id = ?1",
                params![id, new_status.to_string()],
            )?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Append a reporting participant to the message's read set (groups).
/// Set semantics: re-reports are no-ops.
pub async fn add_read_participant(
    db: &Database,
    id: &str,
    participant: &str,
) -> Result<bool, AtendeError> {
    let id = id.to_string();
    let participant = participant.to_string();
    db.connection()
        .call(move |conn| {
            let read_by: Option<String> = match conn
                .query_row(
                    "SELECT read_by FROM messages WHERE id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .optional()?
            {
                Some(r) => r,
                None => return Ok(false),
            };
            let mut readers: Vec<String> = match read_by.as_deref() {
                Some(raw) => super::parse_string_vec(0, raw)?,
                None => Vec::new(),
            };
            if readers.iter().any(|r| r == &participant) {
                return Ok(false);
            }
            readers.push(participant);
            let serialized = serde_json::to_string(&readers).map_err(|e| {
                rusqlite::Error::ToSqlConversionFailure(Box::new(e))
            })?;
            conn.execute(
                "UPDATE messages SET read_by = ?2 WHERE id = ?1",
                params![id, serialized],
            )?;
            Ok(true)
        })
        .await
        .map_err(map_tr_err)
}

/// Soft-delete: flag, timestamp, and attribution; the row is never
/// physically removed. Returns the pre-deletion content for the audit
/// note, or `None` when the message was already deleted.
pub async fn soft_delete(
    db: &Database,
    id: &str,
    deleted_by: &str,
) -> Result<Option<String>, AtendeError> {
    let id = id.to_string();
    let deleted_by = deleted_by.to_string();
    db.connection()
        .call(move |conn| {
            let row: Option<(String, bool)> = conn
                .query_row(
                    "SELECT content, deleted FROM messages WHERE id = ?1",
                    params![id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let (content, deleted) = match row {
                Some(r) => r,
                None => return Ok(None),
            };
            if deleted {
                return Ok(None);
            }
            conn.execute(
                "UPDATE messages SET deleted = 1, deleted_at = ?2, deleted_by = ?3 WHERE id = ?1",
                params![id, chrono::Utc::now().to_rfc3339(), deleted_by],
            )?;
            Ok(Some(content))
        })
        .await
        .map_err(map_tr_err)
}

/// The last `limit` non-internal messages of a conversation, oldest first.
pub async fn history(
    db: &Database,
    conversation_id: &str,
    limit: i64,
) -> Result<Vec<MessageRecord>, AtendeError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM messages
                 WHERE conversation_id = ?1 AND internal = 0
                 ORDER BY created_at DESC
                 LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![conversation_id, limit], map_row)?;
            let mut messages = Vec::new();
            for row in rows {
                messages.push(row?);
            }
            messages.reverse();
            Ok(messages)
        })
        .await
        .map_err(map_tr_err)
}

/// The customer's most recent message in a conversation.
pub async fn last_contact_message(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<MessageRecord>, AtendeError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let message = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM messages
                         WHERE conversation_id = ?1 AND from_agent = 0 AND internal = 0
                         ORDER BY created_at DESC
                         LIMIT 1"
                    ),
                    params![conversation_id],
                    map_row,
                )
                .optional()?;
            Ok(message)
        })
        .await
        .map_err(map_tr_err)
}

/// Whether an agent-side message (human when `automated` is false, AI when
/// true) exists strictly after `after`. This is the shared guard of the
/// hybrid reply rule.
pub async fn exists_agent_message_after(
    db: &Database,
    conversation_id: &str,
    after: &str,
    automated: bool,
) -> Result<bool, AtendeError> {
    let conversation_id = conversation_id.to_string();
    let after = after.to_string();
    db.connection()
        .call(move |conn| {
            let count: i64 = conn.query_row(
                "SELECT count(*) FROM messages
                 WHERE conversation_id = ?1 AND from_agent = 1 AND internal = 0
                   AND automated = ?2 AND created_at > ?3",
                params![conversation_id, automated, after],
                |row| row.get(0),
            )?;
            Ok(count > 0)
        })
        .await
        .map_err(map_tr_err)
}
