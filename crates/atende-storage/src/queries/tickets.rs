// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ticket operations.
//!
//! The single-active-ticket invariant is enforced inside the creation
//! closure: a concurrent duplicate request gets the existing active ticket
//! back instead of a second one.

use atende_core::AtendeError;
use atende_core::types::TicketStatus;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::Ticket;

const COLUMNS: &str = "id, number, conversation_id, sector_id, status, created_at, updated_at, \
                       closed_at";

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Ticket> {
    let status: String = row.get(4)?;
    Ok(Ticket {
        id: row.get(0)?,
        number: row.get(1)?,
        conversation_id: row.get(2)?,
        sector_id: row.get(3)?,
        status: super::parse_enum(4, &status)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
        closed_at: row.get(7)?,
    })
}

fn select_active(
    conn: &rusqlite::Connection,
    conversation_id: &str,
) -> rusqlite::Result<Option<Ticket>> {
    conn.query_row(
        &format!(
            "SELECT {COLUMNS} FROM tickets
             WHERE conversation_id = ?1 AND status != 'closed'
             LIMIT 1"
        ),
        params![conversation_id],
        map_row,
    )
    .optional()
}

/// The conversation's active ticket, if any.
pub async fn active_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Option<Ticket>, AtendeError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| Ok(select_active(conn, &conversation_id)?))
        .await
        .map_err(map_tr_err)
}

/// Create a ticket unless the conversation already has an active one.
/// Returns the ticket and whether it was created now. Ticket numbers are
/// globally monotonic.
pub async fn create_if_none_active(
    db: &Database,
    conversation_id: &str,
    sector_id: &str,
) -> Result<(Ticket, bool), AtendeError> {
    let conversation_id = conversation_id.to_string();
    let sector_id = sector_id.to_string();
    db.connection()
        .call(move |conn| {
            if let Some(existing) = select_active(conn, &conversation_id)? {
                return Ok((existing, false));
            }
            let number: i64 = conn.query_row(
                "SELECT COALESCE(MAX(number), 0) + 1 FROM tickets",
                [],
                |row| row.get(0),
            )?;
            let id = uuid::Uuid::new_v4().to_string();
            let now = chrono::Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO tickets (id, number, conversation_id, sector_id, status, \
                 created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, 'open', ?5, ?5)",
                params![id, number, conversation_id, sector_id, now],
            )?;
            let ticket = conn.query_row(
                &format!("SELECT {COLUMNS} FROM tickets WHERE id = ?1"),
                params![id],
                map_row,
            )?;
            Ok((ticket, true))
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a ticket by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Ticket>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let ticket = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM tickets WHERE id = ?1"),
                    params![id],
                    map_row,
                )
                .optional()?;
            Ok(ticket)
        })
        .await
        .map_err(map_tr_err)
}

/// Transition a ticket's status; stamps `closed_at` when closing.
pub async fn set_status(
    db: &Database,
    id: &str,
    status: TicketStatus,
) -> Result<Option<Ticket>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let now = chrono::Utc::now().to_rfc3339();
            let closed_at: Option<String> = if status == TicketStatus::Closed {
                Some(now.clone())
            } else {
                None
            };
            conn.execute(
                "UPDATE tickets
                 SET status = ?2, updated_at = ?3,
                     closed_at = CASE WHEN ?4 IS NULL THEN closed_at ELSE ?4 END
                 WHERE id = ?1",
                params![id, status.to_string(), now, closed_at],
            )?;
            let ticket = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM tickets WHERE id = ?1"),
                    params![id],
                    map_row,
                )
                .optional()?;
            Ok(ticket)
        })
        .await
        .map_err(map_tr_err)
}
