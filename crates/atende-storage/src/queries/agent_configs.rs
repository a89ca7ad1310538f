// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Automated-agent configuration and completion audit log operations.

use atende_core::AtendeError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::{AgentConfig, CompletionLog};

const COLUMNS: &str = "id, sector_id, agent_name, persona, tone, business_context, faq, model, \
                       enabled, auto_reply, hybrid_timeout_minutes, response_delay_secs, \
                       escalation_keywords, hours_start, hours_end, weekdays, \
                       out_of_hours_template, created_at";

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<AgentConfig> {
    let keywords: String = row.get(12)?;
    let weekdays: String = row.get(15)?;
    Ok(AgentConfig {
        id: row.get(0)?,
        sector_id: row.get(1)?,
        agent_name: row.get(2)?,
        persona: row.get(3)?,
        tone: row.get(4)?,
        business_context: row.get(5)?,
        faq: row.get(6)?,
        model: row.get(7)?,
        enabled: row.get(8)?,
        auto_reply: row.get(9)?,
        hybrid_timeout_minutes: row.get(10)?,
        response_delay_secs: row.get(11)?,
        escalation_keywords: super::parse_string_vec(12, &keywords)?,
        hours_start: row.get(13)?,
        hours_end: row.get(14)?,
        weekdays: super::parse_u8_vec(15, &weekdays)?,
        out_of_hours_template: row.get(16)?,
        created_at: row.get(17)?,
    })
}

/// Insert an agent configuration.
pub async fn insert_config(db: &Database, config: &AgentConfig) -> Result<(), AtendeError> {
    let config = config.clone();
    db.connection()
        .call(move |conn| {
            let keywords = serde_json::to_string(&config.escalation_keywords)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            let weekdays = serde_json::to_string(&config.weekdays)
                .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
            conn.execute(
                "INSERT INTO agent_configs (id, sector_id, agent_name, persona, tone, \
                 business_context, faq, model, enabled, auto_reply, hybrid_timeout_minutes, \
                 response_delay_secs, escalation_keywords, hours_start, hours_end, weekdays, \
                 out_of_hours_template, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, \
                 ?17, ?18)",
                params![
                    config.id,
                    config.sector_id,
                    config.agent_name,
                    config.persona,
                    config.tone,
                    config.business_context,
                    config.faq,
                    config.model,
                    config.enabled,
                    config.auto_reply,
                    config.hybrid_timeout_minutes,
                    config.response_delay_secs,
                    keywords,
                    config.hours_start,
                    config.hours_end,
                    weekdays,
                    config.out_of_hours_template,
                    config.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The enabled agent configuration for a sector, if any.
pub async fn enabled_for_sector(
    db: &Database,
    sector_id: &str,
) -> Result<Option<AgentConfig>, AtendeError> {
    let sector_id = sector_id.to_string();
    db.connection()
        .call(move |conn| {
            let config = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM agent_configs
                         WHERE sector_id = ?1 AND enabled = 1
                         LIMIT 1"
                    ),
                    params![sector_id],
                    map_row,
                )
                .optional()?;
            Ok(config)
        })
        .await
        .map_err(map_tr_err)
}

/// Record a generated reply: config id, prompt context, completion, model.
pub async fn insert_completion_log(db: &Database, log: &CompletionLog) -> Result<(), AtendeError> {
    let log = log.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO completion_logs (id, config_id, conversation_id, prompt, \
                 completion, model, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    log.id,
                    log.config_id,
                    log.conversation_id,
                    log.prompt,
                    log.completion,
                    log.model,
                    log.created_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Completion log rows for a conversation, oldest first.
pub async fn completion_logs_for_conversation(
    db: &Database,
    conversation_id: &str,
) -> Result<Vec<CompletionLog>, AtendeError> {
    let conversation_id = conversation_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT id, config_id, conversation_id, prompt, completion, model, created_at
                 FROM completion_logs WHERE conversation_id = ?1 ORDER BY created_at ASC",
            )?;
            let rows = stmt.query_map(params![conversation_id], |row| {
                Ok(CompletionLog {
                    id: row.get(0)?,
                    config_id: row.get(1)?,
                    conversation_id: row.get(2)?,
                    prompt: row.get(3)?,
                    completion: row.get(4)?,
                    model: row.get(5)?,
                    created_at: row.get(6)?,
                })
            })?;
            let mut logs = Vec::new();
            for row in rows {
                logs.push(row?);
            }
            Ok(logs)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Sector;
    use crate::queries::instances::upsert_instance;
    use crate::queries::sectors::insert_sector;
    use tempfile::tempdir;

    pub(crate) fn make_config(sector_id: &str, enabled: bool) -> AgentConfig {
        AgentConfig {
            id: uuid::Uuid::new_v4().to_string(),
            sector_id: sector_id.to_string(),
            agent_name: "Clara".to_string(),
            persona: Some("Atendente cordial".to_string()),
            tone: Some("informal".to_string()),
            business_context: None,
            faq: None,
            model: "claude-haiku-4-5-20250901".to_string(),
            enabled,
            auto_reply: true,
            hybrid_timeout_minutes: 5,
            response_delay_secs: 0,
            escalation_keywords: vec!["atendente".to_string(), "humano".to_string()],
            hours_start: None,
            hours_end: None,
            weekdays: Vec::new(),
            out_of_hours_template: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    #[tokio::test]
    async fn config_round_trips_json_columns() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("ac.db").to_str().unwrap())
            .await
            .unwrap();
        let instance = upsert_instance(&db, "main").await.unwrap();
        let sector = Sector {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance.id.clone(),
            name: "suporte".to_string(),
            is_default: true,
            ticket_individual: true,
            ticket_group: false,
            welcome_template: None,
            closing_template: None,
            reopen_template: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        insert_sector(&db, &sector).await.unwrap();

        let mut config = make_config(&sector.id, true);
        config.weekdays = vec![0, 1, 2, 3, 4];
        insert_config(&db, &config).await.unwrap();

        let stored = enabled_for_sector(&db, &sector.id).await.unwrap().unwrap();
        assert_eq!(stored.escalation_keywords, config.escalation_keywords);
        assert_eq!(stored.weekdays, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn disabled_config_is_not_returned() {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("ac.db").to_str().unwrap())
            .await
            .unwrap();
        let instance = upsert_instance(&db, "main").await.unwrap();
        let sector = Sector {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance.id.clone(),
            name: "suporte".to_string(),
            is_default: true,
            ticket_individual: true,
            ticket_group: false,
            welcome_template: None,
            closing_template: None,
            reopen_template: None,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        insert_sector(&db, &sector).await.unwrap();
        insert_config(&db, &make_config(&sector.id, false)).await.unwrap();

        assert!(enabled_for_sector(&db, &sector.id).await.unwrap().is_none());
    }
}
