// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identity resolution: maps a gateway event's sender identifiers onto one
//! canonical contact.
//!
//! Resolution order (first match wins), each step upgrading the canonical
//! phone only when the contact has none:
//! 1. explicit phone / sender-id against stored phone or alternate-id set
//! 2. routable-id-derived phone (non-transient ids) against stored phone
//! 3. exact match of the full routable id
//! 4. transient-id match against stored phone, routable id, or alternate ids
//! 5. heuristic fallback: link the transient id to the most recently
//!    active conversation awaiting a routable id (the gateway may route a
//!    reply through a different identifier than the one it was sent to)
//! 6. create a new contact from the most specific identifier available
//!
//! Groups take a separate path keyed by the normalized group id, with a
//! best-effort metadata fetch through the gateway side-channel.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, warn};

use atende_core::event::{EventData, MessageKey};
use atende_core::traits::transport::GatewayTransport;
use atende_core::{AtendeError, jid};
use atende_storage::Database;
use atende_storage::models::Contact;
use atende_storage::queries::contacts;

/// How far back the heuristic fallback looks for an awaiting conversation.
const HEURISTIC_LINK_WINDOW_MINUTES: i64 = 30;

pub struct IdentityResolver {
    db: Arc<Database>,
    transport: Arc<dyn GatewayTransport>,
}

impl IdentityResolver {
    pub fn new(db: Arc<Database>, transport: Arc<dyn GatewayTransport>) -> Self {
        Self { db, transport }
    }

    /// Resolve the event's sender to a contact, dispatching on the
    /// routable-id class.
    pub async fn resolve(
        &self,
        instance_id: &str,
        instance_name: &str,
        key: &MessageKey,
        data: &EventData,
    ) -> Result<Contact, AtendeError> {
        if jid::is_group(&key.remote_jid) {
            self.resolve_group(instance_id, instance_name, key).await
        } else {
            self.resolve_individual(instance_id, key, data).await
        }
    }

    async fn resolve_individual(
        &self,
        instance_id: &str,
        key: &MessageKey,
        data: &EventData,
    ) -> Result<Contact, AtendeError> {
        let remote_jid = key.remote_jid.as_str();
        let explicit_phone = key
            .sender_pn
            .as_deref()
            .map(jid::bare)
            .filter(|p| !p.is_empty());
        let sender_id = data.sender.as_deref().filter(|s| !s.is_empty());

        // 1. Explicit phone or sender-id against phone or alternate ids.
        for identifier in [explicit_phone, sender_id].into_iter().flatten() {
            if let Some(contact) =
                contacts::find_by_any_identifier(&self.db, instance_id, identifier).await?
            {
                return self
                    .absorb(contact, remote_jid, explicit_phone, data.push_name.as_deref())
                    .await;
            }
        }

        // 2. Routable-id-derived phone against the stored phone.
        if let Some(phone) = jid::phone_from(remote_jid)
            && let Some(contact) = contacts::find_by_phone(&self.db, instance_id, &phone).await?
        {
            return self
                .absorb(contact, remote_jid, explicit_phone, data.push_name.as_deref())
                .await;
        }

        // 3. Exact routable-id match.
        if let Some(contact) =
            contacts::find_by_remote_jid(&self.db, instance_id, remote_jid).await?
        {
            return self
                .absorb(contact, remote_jid, explicit_phone, data.push_name.as_deref())
                .await;
        }

        // 4. Transient-id match against phone, routable id, or alternate ids.
        if jid::is_transient(remote_jid) {
            for needle in [remote_jid, jid::bare(remote_jid)] {
                if let Some(contact) =
                    contacts::find_by_any_identifier(&self.db, instance_id, needle).await?
                {
                    return self
                        .absorb(contact, remote_jid, explicit_phone, data.push_name.as_deref())
                        .await;
                }
            }

            // 5. Heuristic fallback: only for inbound events carrying
            // nothing but a transient id.
            if !key.from_me && explicit_phone.is_none() && sender_id.is_none() {
                let cutoff = (Utc::now()
                    - chrono::Duration::minutes(HEURISTIC_LINK_WINDOW_MINUTES))
                .to_rfc3339();
                if let Some(contact) =
                    contacts::find_heuristic_candidate(&self.db, instance_id, &cutoff).await?
                {
                    warn!(
                        contact_id = %contact.id,
                        transient_id = remote_jid,
                        "heuristically linked transient id to awaiting conversation"
                    );
                    return self
                        .absorb(contact, remote_jid, explicit_phone, data.push_name.as_deref())
                        .await;
                }
            }
        }

        // 6. New contact from the most specific identifier available.
        let phone = explicit_phone
            .map(|p| p.to_string())
            .or_else(|| jid::phone_from(remote_jid));
        let now = Utc::now().to_rfc3339();
        let contact = Contact {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance_id.to_string(),
            phone,
            remote_jid: Some(remote_jid.to_string()),
            push_name: data.push_name.clone(),
            is_group: false,
            avatar_url: None,
            metadata: None,
            created_at: now.clone(),
            updated_at: now,
        };
        contacts::insert_contact(&self.db, &contact).await?;
        contacts::merge_alt_id(&self.db, &contact.id, remote_jid).await?;
        debug!(contact_id = %contact.id, remote_jid, "contact created");
        Ok(contact)
    }

    /// Merge the event's identifiers into a matched contact: upgrade the
    /// canonical phone and routable id only when missing, always merge
    /// into the alternate-id set, refresh the display name.
    async fn absorb(
        &self,
        contact: Contact,
        remote_jid: &str,
        explicit_phone: Option<&str>,
        push_name: Option<&str>,
    ) -> Result<Contact, AtendeError> {
        let phone_candidate = explicit_phone
            .map(|p| p.to_string())
            .or_else(|| jid::phone_from(remote_jid));
        if let Some(phone) = &phone_candidate {
            contacts::set_phone_if_missing(&self.db, &contact.id, phone).await?;
        }
        contacts::set_remote_jid_if_missing(&self.db, &contact.id, remote_jid).await?;
        contacts::merge_alt_id(&self.db, &contact.id, remote_jid).await?;
        if let Some(phone) = &phone_candidate {
            contacts::merge_alt_id(&self.db, &contact.id, phone).await?;
        }
        if let Some(name) = push_name.filter(|n| !n.is_empty()) {
            contacts::set_push_name(&self.db, &contact.id, name).await?;
        }
        // Return the refreshed row.
        Ok(contacts::get_contact(&self.db, &contact.id)
            .await?
            .unwrap_or(contact))
    }

    async fn resolve_group(
        &self,
        instance_id: &str,
        instance_name: &str,
        key: &MessageKey,
    ) -> Result<Contact, AtendeError> {
        let normalized = jid::normalized_group_jid(&key.remote_jid).ok_or_else(|| {
            AtendeError::Internal(format!("not a group routable id: {}", key.remote_jid))
        })?;

        let contact = match contacts::find_by_remote_jid(&self.db, instance_id, &normalized).await?
        {
            Some(contact) => contact,
            None => {
                let now = Utc::now().to_rfc3339();
                let contact = Contact {
                    id: uuid::Uuid::new_v4().to_string(),
                    instance_id: instance_id.to_string(),
                    phone: None,
                    remote_jid: Some(normalized.clone()),
                    push_name: None,
                    is_group: true,
                    avatar_url: None,
                    metadata: None,
                    created_at: now.clone(),
                    updated_at: now,
                };
                contacts::insert_contact(&self.db, &contact).await?;
                debug!(contact_id = %contact.id, group = %normalized, "group contact created");
                contact
            }
        };
        contacts::merge_alt_id(&self.db, &contact.id, &key.remote_jid).await?;

        // Best-effort display metadata; absence is not an error.
        match self
            .transport
            .group_metadata(instance_name, &key.remote_jid)
            .await
        {
            Ok(Some(metadata)) => {
                contacts::set_group_profile(
                    &self.db,
                    &contact.id,
                    metadata.subject.as_deref(),
                    metadata.picture_url.as_deref(),
                )
                .await?;
            }
            Ok(None) => {}
            Err(e) => {
                debug!(group = %normalized, error = %e, "group metadata fetch failed");
            }
        }

        Ok(contacts::get_contact(&self.db, &contact.id)
            .await?
            .unwrap_or(contact))
    }
}
