// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instance (connected channel/account) operations.

use atende_core::AtendeError;
use atende_core::types::ConnectionState;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::Instance;

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Instance> {
    let state: String = row.get(2)?;
    Ok(Instance {
        id: row.get(0)?,
        name: row.get(1)?,
        connection_state: super::parse_enum(2, &state)?,
        created_at: row.get(3)?,
    })
}

const COLUMNS: &str = "id, name, connection_state, created_at";

/// Fetch an instance by name, creating it on first reference.
pub async fn upsert_instance(db: &Database, name: &str) -> Result<Instance, AtendeError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO instances (id, name, connection_state, created_at)
                 VALUES (?1, ?2, 'close', ?3)",
                params![
                    uuid::Uuid::new_v4().to_string(),
                    name,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
            let instance = conn.query_row(
                &format!("SELECT {COLUMNS} FROM instances WHERE name = ?1"),
                params![name],
                map_row,
            )?;
            Ok(instance)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up an instance by row id.
pub async fn get_by_id(db: &Database, id: &str) -> Result<Option<Instance>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let instance = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM instances WHERE id = ?1"),
                    params![id],
                    map_row,
                )
                .optional()?;
            Ok(instance)
        })
        .await
        .map_err(map_tr_err)
}

/// Look up an instance by name.
pub async fn get_instance(db: &Database, name: &str) -> Result<Option<Instance>, AtendeError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            let instance = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM instances WHERE name = ?1"),
                    params![name],
                    map_row,
                )
                .optional()?;
            Ok(instance)
        })
        .await
        .map_err(map_tr_err)
}

/// Toggle the connection state from a connection-state-change event.
pub async fn set_connection_state(
    db: &Database,
    name: &str,
    state: ConnectionState,
) -> Result<(), AtendeError> {
    let name = name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE instances SET connection_state = ?2 WHERE name = ?1",
                params![name, state.to_string()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}
