// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assignment rule operations.
//!
//! The round-robin cursor is the one piece of shared mutable state across
//! concurrent ingestions. `advance_round_robin` does the read-increment-
//! write inside a single writer closure, so two simultaneous messages can
//! never land on the same agent.

use atende_core::AtendeError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::AssignmentRule;

const COLUMNS: &str = "id, instance_id, sector_id, strategy, fixed_agent, agents, cursor, \
                       active, created_at";

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<AssignmentRule> {
    let strategy: String = row.get(3)?;
    let agents: String = row.get(5)?;
    Ok(AssignmentRule {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        sector_id: row.get(2)?,
        strategy: super::parse_enum(3, &strategy)?,
        fixed_agent: row.get(4)?,
        agents: super::parse_string_vec(5, &agents)?,
        cursor: row.get(6)?,
        active: row.get(7)?,
        created_at: row.get(8)?,
    })
}

/// Insert an assignment rule.
pub async fn insert_rule(db: &Database, rule: &AssignmentRule) -> Result<(), AtendeError> {
    let rule = rule.clone();
    db.connection()
        .call(move |conn| {
            let agents = serde_json::to_string(&rule.agents)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "INSERT INTO assignment_rules (id, instance_id, sector_id, strategy, \
                 fixed_agent, agents, cursor, active, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    rule.id,
                    rule.instance_id,
                    rule.sector_id,
                    rule.strategy.to_string(),
                    rule.fixed_agent,
                    agents,
                    rule.cursor,
                    rule.active,
                    rule.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The applicable rule: sector-specific active rule first, else the
/// instance-wide (no-sector) active rule.
pub async fn find_applicable(
    db: &Database,
    instance_id: &str,
    sector_id: Option<&str>,
) -> Result<Option<AssignmentRule>, AtendeError> {
    let instance_id = instance_id.to_string();
    let sector_id = sector_id.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            if let Some(sector) = &sector_id {
                let rule = conn
                    .query_row(
                        &format!(
                            "SELECT {COLUMNS} FROM assignment_rules
                             WHERE instance_id = ?1 AND sector_id = ?2 AND active = 1
                             LIMIT 1"
                        ),
                        params![instance_id, sector],
                        map_row,
                    )
                    .optional()?;
                if rule.is_some() {
                    return Ok(rule);
                }
            }
            let rule = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM assignment_rules
                         WHERE instance_id = ?1 AND sector_id IS NULL AND active = 1
                         LIMIT 1"
                    ),
                    params![instance_id],
                    map_row,
                )
                .optional()?;
            Ok(rule)
        })
        .await
        .map_err(map_tr_err)
}

/// Atomically advance the rule's single persisted cursor and return the
/// agent it now points at. `None` for an empty agent list.
pub async fn advance_round_robin(
    db: &Database,
    rule_id: &str,
) -> Result<Option<String>, AtendeError> {
    let rule_id = rule_id.to_string();
    db.connection()
        .call(move |conn| {
            let row: Option<(String, i64)> = conn
                .query_row(
                    "SELECT agents, cursor FROM assignment_rules WHERE id = ?1",
                    params![rule_id],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            let (agents_raw, cursor) = match row {
                Some(r) => r,
                None => return Ok(None),
            };
            let agents = super::parse_string_vec(0, &agents_raw)?;
            if agents.is_empty() {
                return Ok(None);
            }
            let next = (cursor + 1).rem_euclid(agents.len() as i64);
            conn.execute(
                "UPDATE assignment_rules SET cursor = ?2 WHERE id = ?1",
                params![rule_id, next],
            )?;
            Ok(Some(agents[next as usize].clone()))
        })
        .await
        .map_err(map_tr_err)
}
