// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Contact operations, including the alternate-id set and the heuristic
//! link candidate lookup used by the identity resolver.

use atende_core::AtendeError;
use rusqlite::{OptionalExtension, params};

use crate::database::{Database, map_tr_err};
use crate::models::Contact;

const COLUMNS: &str = "id, instance_id, phone, remote_jid, push_name, is_group, avatar_url, \
                       metadata, created_at, updated_at";

fn map_row(row: &rusqlite::Row) -> rusqlite::Result<Contact> {
    Ok(Contact {
        id: row.get(0)?,
        instance_id: row.get(1)?,
        phone: row.get(2)?,
        remote_jid: row.get(3)?,
        push_name: row.get(4)?,
        is_group: row.get(5)?,
        avatar_url: row.get(6)?,
        metadata: row.get(7)?,
        created_at: row.get(8)?,
        updated_at: row.get(9)?,
    })
}

/// Insert a new contact row.
pub async fn insert_contact(db: &Database, contact: &Contact) -> Result<(), AtendeError> {
    let contact = contact.clone();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO contacts (id, instance_id, phone, remote_jid, push_name, is_group, \
                 avatar_url, metadata, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
                params![
                    contact.id,
                    contact.instance_id,
                    contact.phone,
                    contact.remote_jid,
                    contact.push_name,
                    contact.is_group,
                    contact.avatar_url,
                    contact.metadata,
                    contact.created_at,
                    contact.updated_at,
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Fetch a contact by row id.
pub async fn get_contact(db: &Database, id: &str) -> Result<Option<Contact>, AtendeError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    &format!("SELECT {COLUMNS} FROM contacts WHERE id = ?1"),
                    params![id],
                    map_row,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

/// Match an identifier against stored phone, stored routable id, or the
/// alternate-id set, in that order.
pub async fn find_by_any_identifier(
    db: &Database,
    instance_id: &str,
    identifier: &str,
) -> Result<Option<Contact>, AtendeError> {
    let instance_id = instance_id.to_string();
    let identifier = identifier.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM contacts
                         WHERE instance_id = ?1
                           AND (phone = ?2 OR remote_jid = ?2
                                OR id IN (SELECT contact_id FROM contact_ids WHERE identifier = ?2))
                         LIMIT 1"
                    ),
                    params![instance_id, identifier],
                    map_row,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

/// Match a phone number against the stored canonical phone only.
pub async fn find_by_phone(
    db: &Database,
    instance_id: &str,
    phone: &str,
) -> Result<Option<Contact>, AtendeError> {
    let instance_id = instance_id.to_string();
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM contacts
                         WHERE instance_id = ?1 AND phone = ?2 LIMIT 1"
                    ),
                    params![instance_id, phone],
                    map_row,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

/// Exact match of the full routable id.
pub async fn find_by_remote_jid(
    db: &Database,
    instance_id: &str,
    remote_jid: &str,
) -> Result<Option<Contact>, AtendeError> {
    let instance_id = instance_id.to_string();
    let remote_jid = remote_jid.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    &format!(
                        "SELECT {COLUMNS} FROM contacts
                         WHERE instance_id = ?1 AND remote_jid = ?2 LIMIT 1"
                    ),
                    params![instance_id, remote_jid],
                    map_row,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

/// Set the canonical phone only when the contact has none yet.
pub async fn set_phone_if_missing(
    db: &Database,
    contact_id: &str,
    phone: &str,
) -> Result<bool, AtendeError> {
    let contact_id = contact_id.to_string();
    let phone = phone.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE contacts SET phone = ?2, updated_at = ?3
                 WHERE id = ?1 AND phone IS NULL",
                params![contact_id, phone, chrono::Utc::now().to_rfc3339()],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Set the routable id only when the contact has none yet.
pub async fn set_remote_jid_if_missing(
    db: &Database,
    contact_id: &str,
    remote_jid: &str,
) -> Result<bool, AtendeError> {
    let contact_id = contact_id.to_string();
    let remote_jid = remote_jid.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE contacts SET remote_jid = ?2, updated_at = ?3
                 WHERE id = ?1 AND remote_jid IS NULL",
                params![contact_id, remote_jid, chrono::Utc::now().to_rfc3339()],
            )?;
            Ok(changed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Merge an identifier into the contact's alternate-id set.
///
/// Insert-or-ignore: previously known identifiers are never dropped.
pub async fn merge_alt_id(
    db: &Database,
    contact_id: &str,
    identifier: &str,
) -> Result<(), AtendeError> {
    let contact_id = contact_id.to_string();
    let identifier = identifier.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO contact_ids (contact_id, identifier) VALUES (?1, ?2)",
                params![contact_id, identifier],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// All identifiers merged for a contact.
pub async fn alt_ids(db: &Database, contact_id: &str) -> Result<Vec<String>, AtendeError> {
    let contact_id = contact_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(
                "SELECT identifier FROM contact_ids WHERE contact_id = ?1 ORDER BY identifier",
            )?;
            let rows = stmt.query_map(params![contact_id], |row| row.get(0))?;
            let mut ids = Vec::new();
            for row in rows {
                ids.push(row?);
            }
            Ok(ids)
        })
        .await
        .map_err(map_tr_err)
}

/// Refresh the display name when the gateway supplied one.
pub async fn set_push_name(
    db: &Database,
    contact_id: &str,
    push_name: &str,
) -> Result<(), AtendeError> {
    let contact_id = contact_id.to_string();
    let push_name = push_name.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts SET push_name = ?2, updated_at = ?3 WHERE id = ?1",
                params![contact_id, push_name, chrono::Utc::now().to_rfc3339()],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Best-effort group profile refresh; keeps existing values when the
/// side-channel returned nothing.
pub async fn set_group_profile(
    db: &Database,
    contact_id: &str,
    subject: Option<&str>,
    avatar_url: Option<&str>,
) -> Result<(), AtendeError> {
    let contact_id = contact_id.to_string();
    let subject = subject.map(|s| s.to_string());
    let avatar_url = avatar_url.map(|s| s.to_string());
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE contacts
                 SET push_name = COALESCE(?2, push_name),
                     avatar_url = COALESCE(?3, avatar_url),
                     updated_at = ?4
                 WHERE id = ?1",
                params![
                    contact_id,
                    subject,
                    avatar_url,
                    chrono::Utc::now().to_rfc3339(),
                ],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// The single candidate for heuristic transient-id linking: the
/// most-recently-active unresolved conversation on the instance whose
/// contact has no routable id yet and which has an outbound message newer
/// than `cutoff`.
pub async fn find_heuristic_candidate(
    db: &Database,
    instance_id: &str,
    cutoff: &str,
) -> Result<Option<Contact>, AtendeError> {
    let instance_id = instance_id.to_string();
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let contact = conn
                .query_row(
                    "SELECT c.id, c.instance_id, c.phone, c.remote_jid, c.push_name, c.is_group, \
                            c.avatar_url, c.metadata, c.created_at, c.updated_at
                     FROM contacts c
                     JOIN conversations v ON v.contact_id = c.id
                     WHERE v.instance_id = ?1
                       AND v.status = 'active'
                       AND c.is_group = 0
                       AND c.remote_jid IS NULL
                       AND EXISTS (
                           SELECT 1 FROM messages m
                           WHERE m.conversation_id = v.id
                             AND m.from_agent = 1
                             AND m.internal = 0
                             AND m.created_at >= ?2)
                     ORDER BY v.last_message_at DESC
                     LIMIT 1",
                    params![instance_id, cutoff],
                    map_row,
                )
                .optional()?;
            Ok(contact)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::queries::instances::upsert_instance;
    use tempfile::tempdir;

    async fn setup() -> (Database, tempfile::TempDir, String) {
        let dir = tempdir().unwrap();
        let db = Database::open(dir.path().join("c.db").to_str().unwrap())
            .await
            .unwrap();
        let instance = upsert_instance(&db, "main").await.unwrap();
        (db, dir, instance.id)
    }

    fn make_contact(instance_id: &str, phone: Option<&str>, jid: Option<&str>) -> Contact {
        let now = chrono::Utc::now().to_rfc3339();
        Contact {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance_id.to_string(),
            phone: phone.map(|s| s.to_string()),
            remote_jid: jid.map(|s| s.to_string()),
            push_name: None,
            is_group: false,
            avatar_url: None,
            metadata: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn identifier_matches_phone_jid_and_alt_set() {
        let (db, _dir, instance_id) = setup().await;
        let contact = make_contact(
            &instance_id,
            Some("5511999999999"),
            Some("5511999999999@s.whatsapp.net"),
        );
        insert_contact(&db, &contact).await.unwrap();
        merge_alt_id(&db, &contact.id, "987654321@lid").await.unwrap();

        for needle in [
            "5511999999999",
            "5511999999999@s.whatsapp.net",
            "987654321@lid",
        ] {
            let found = find_by_any_identifier(&db, &instance_id, needle)
                .await
                .unwrap();
            assert_eq!(found.map(|c| c.id), Some(contact.id.clone()), "{needle}");
        }
    }

    #[tokio::test]
    async fn phone_is_only_set_when_missing() {
        let (db, _dir, instance_id) = setup().await;
        let contact = make_contact(&instance_id, None, None);
        insert_contact(&db, &contact).await.unwrap();

        assert!(set_phone_if_missing(&db, &contact.id, "5511988887777")
            .await
            .unwrap());
        // A second identifier must not overwrite the canonical phone.
        assert!(!set_phone_if_missing(&db, &contact.id, "5511900000000")
            .await
            .unwrap());
        let stored = get_contact(&db, &contact.id).await.unwrap().unwrap();
        assert_eq!(stored.phone.as_deref(), Some("5511988887777"));
    }

    #[tokio::test]
    async fn alt_ids_are_merged_never_dropped() {
        let (db, _dir, instance_id) = setup().await;
        let contact = make_contact(&instance_id, Some("5511999999999"), None);
        insert_contact(&db, &contact).await.unwrap();

        merge_alt_id(&db, &contact.id, "111@lid").await.unwrap();
        merge_alt_id(&db, &contact.id, "222@lid").await.unwrap();
        merge_alt_id(&db, &contact.id, "111@lid").await.unwrap();

        let ids = alt_ids(&db, &contact.id).await.unwrap();
        assert_eq!(ids, vec!["111@lid".to_string(), "222@lid".to_string()]);
    }

    #[tokio::test]
    async fn group_profile_update_keeps_existing_on_none() {
        let (db, _dir, instance_id) = setup().await;
        let mut contact = make_contact(&instance_id, None, Some("1620000000@g.us"));
        contact.is_group = true;
        contact.push_name = Some("Old Subject".to_string());
        insert_contact(&db, &contact).await.unwrap();

        set_group_profile(&db, &contact.id, None, Some("https://cdn/pic.jpg"))
            .await
            .unwrap();
        let stored = get_contact(&db, &contact.id).await.unwrap().unwrap();
        assert_eq!(stored.push_name.as_deref(), Some("Old Subject"));
        assert_eq!(stored.avatar_url.as_deref(), Some("https://cdn/pic.jpg"));
    }
}
