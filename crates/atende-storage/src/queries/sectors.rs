// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Sector operations.

use atende_core::AtendeError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::Sector;

const COLUMNS: &str = "id, instance_id, name, is_default, ticket_individual, ticket_group, \
                       welcome_template, closing_template, reopen_template, created_at";

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Sector> {
    Ok(Sector {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        name: row.get(2)?,
        is_default: row.get(3)?,
        ticket_individual: row.get(4)?,
        ticket_group: row.get(5)?,
        welcome_template: row.get(6)?,
        closing_template: row.get(7)?,
        reopen_template: row.get(8)?,
        created_at: row.get(9)?,
    })
}

/// Insert a sector row.
pub async fn insert_sector(db: &Database, sector: &Sector) -> Result<(), AtendeError> {
    let sector = sector.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO sectors (id, instance_id, name, is_default, ticket_individual, \
                 ticket_group, welcome_template, closing_template, reopen_template, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    sector.id,
                    sector.instance_id,
                    sector.name,
                    sector.is_default,
                    sector.ticket_individual,
                    sector.ticket_group,
                    sector.welcome_template,
                    sector.closing_template,
                    sector.reopen_template,
                    sector.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a sector by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Sector>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let sector = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM sectors WHERE id = ?1"),
                    params![id],
                    map_row,
                )
                .optional()?;
            Ok(sector)
        })
        .await
        .map_err(map_tr_err)
}

/// The default sector for an instance: the flagged one, else the oldest.
pub async fn default_for_instance(
    db: &Database,
    instance_id: &str,
) -> Result<Option<Sector>, AtendeError> {
    let instance_id = instance_id.to_string();
    db.connection()
        .call(move |conn| {
            let sector = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM sectors WHERE instance_id = ?1
                         ORDER BY is_default DESC, created_at ASC
                         LIMIT 1"
                    ),
                    params![instance_id],
                    map_row,
                )
                .optional()?;
            Ok(sector)
        })
        .await
        .map_err(map_tr_err)
}
