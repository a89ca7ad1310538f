// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ingestion pipeline: one gateway event in, a durably persisted
//! message (or reconciled status) out.
//!
//! Ordering is load-bearing: identity resolution, normalization, and
//! rehosting happen before the idempotent insert; conversation aggregates
//! after it; realtime/webhook fan-out only after persistence succeeded;
//! the assignment, ticketing, and arbiter engines last, each tolerating
//! the others' failure (log-and-continue). Duplicate delivery of the same
//! gateway message id is reported as success.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use atende_arbiter::ResponseArbiter;
use atende_core::event::{EventEnvelope, EventKind, MessageKey, MessagePayload};
use atende_core::traits::notify::{RealtimeEvent, RealtimeSink, WebhookSink, webhook_events};
use atende_core::types::{ConnectionState, ConversationMode, MessageStatus};
use atende_core::{AtendeError, jid};
use atende_policy::{AssignmentEngine, TicketManager};
use atende_storage::Database;
use atende_storage::models::{Contact, Conversation, MessageRecord};
use atende_storage::queries::{agent_configs, conversations, instances, messages, sectors};

use crate::identity::IdentityResolver;
use crate::media::MediaRehoster;
use crate::normalize::{self, NormalizedMessage};
use crate::status::StatusReconciler;

/// Longest conversation preview stored on the aggregate.
const PREVIEW_CHARS: usize = 120;

pub struct IngestionPipeline {
    db: Arc<Database>,
    resolver: IdentityResolver,
    rehoster: MediaRehoster,
    reconciler: StatusReconciler,
    assignment: AssignmentEngine,
    tickets: TicketManager,
    arbiter: Arc<ResponseArbiter>,
    realtime: Arc<dyn RealtimeSink>,
    webhook: Arc<dyn WebhookSink>,
}

impl IngestionPipeline {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        db: Arc<Database>,
        resolver: IdentityResolver,
        rehoster: MediaRehoster,
        reconciler: StatusReconciler,
        assignment: AssignmentEngine,
        tickets: TicketManager,
        arbiter: Arc<ResponseArbiter>,
        realtime: Arc<dyn RealtimeSink>,
        webhook: Arc<dyn WebhookSink>,
    ) -> Self {
        Self {
            db,
            resolver,
            rehoster,
            reconciler,
            assignment,
            tickets,
            arbiter,
            realtime,
            webhook,
        }
    }

    /// Entry point for one gateway event.
    pub async fn handle_event(&self, envelope: &EventEnvelope) -> Result<(), AtendeError> {
        match envelope.kind() {
            EventKind::MessageUpsert => self.ingest_message(envelope).await,
            EventKind::MessageUpdate => {
                let Some(key) = envelope.data.key.as_ref() else {
                    debug!("status update without a key, ignored");
                    return Ok(());
                };
                let Some(raw_status) = envelope.data.status.as_deref() else {
                    debug!(gateway_id = %key.id, "status update without a status, ignored");
                    return Ok(());
                };
                self.reconciler
                    .apply_receipt(key, raw_status, envelope.data.participant.as_deref())
                    .await
            }
            EventKind::MessageDelete => {
                let Some(key) = envelope.data.key.as_ref() else {
                    debug!("deletion without a key, ignored");
                    return Ok(());
                };
                self.reconciler.apply_deletion(key).await
            }
            EventKind::ConnectionUpdate => {
                let Some(raw) = envelope.data.state.as_deref() else {
                    return Ok(());
                };
                let Some(state) = ConnectionState::from_gateway(raw) else {
                    debug!(raw, "unrecognized connection state, ignored");
                    return Ok(());
                };
                instances::upsert_instance(&self.db, &envelope.instance).await?;
                instances::set_connection_state(&self.db, &envelope.instance, state).await?;
                info!(instance = %envelope.instance, state = %state, "instance connection state");
                Ok(())
            }
            EventKind::Unknown => {
                debug!(event = %envelope.event, "unhandled event kind");
                Ok(())
            }
        }
    }

    async fn ingest_message(&self, envelope: &EventEnvelope) -> Result<(), AtendeError> {
        let Some(key) = envelope.data.key.as_ref() else {
            debug!("message upsert without a key, ignored");
            return Ok(());
        };
        if jid::is_broadcast(&key.remote_jid) {
            debug!(remote_jid = %key.remote_jid, "broadcast pseudo-conversation, ignored");
            return Ok(());
        }
        let Some(raw) = envelope.data.message.as_ref() else {
            debug!(gateway_id = %key.id, "message upsert without a body, ignored");
            return Ok(());
        };

        // Reaction and protocol payloads belong to the reconciler.
        match raw.payload() {
            MessagePayload::Reaction(reaction) => {
                let reactor = key
                    .participant
                    .clone()
                    .unwrap_or_else(|| key.remote_jid.clone());
                return self.reconciler.apply_reaction(reaction, &reactor).await;
            }
            MessagePayload::Protocol(protocol) => {
                if protocol.is_revoke()
                    && let Some(target) = protocol.key.as_ref()
                {
                    let target = MessageKey {
                        from_me: key.from_me,
                        ..target.clone()
                    };
                    return self.reconciler.apply_deletion(&target).await;
                }
                debug!(gateway_id = %key.id, "non-revoke protocol message, ignored");
                return Ok(());
            }
            _ => {}
        }

        let Some(normalized) = normalize::normalize(raw) else {
            return Ok(());
        };

        let instance = instances::upsert_instance(&self.db, &envelope.instance).await?;
        let contact = self
            .resolver
            .resolve(&instance.id, &instance.name, key, &envelope.data)
            .await?;

        let (conversation, created) =
            conversations::create_or_get(&self.db, &instance.id, &contact.id, ConversationMode::Human)
                .await?;

        let record = self
            .build_record(envelope.data.message_timestamp, key, &conversation, &normalized, &instance.name)
            .await;

        let inserted = messages::insert_message(&self.db, &record).await?;
        if !inserted {
            // Duplicate delivery: success, nothing else to do.
            debug!(gateway_id = %key.id, "duplicate gateway message, no-op");
            return Ok(());
        }

        conversations::record_last_message(
            &self.db,
            &conversation.id,
            &record.created_at,
            &preview(&record.content),
            !key.from_me,
        )
        .await?;

        if created {
            self.apply_conversation_defaults(&instance.id, &conversation.id)
                .await?;
        }

        let conversation = conversations::get(&self.db, &conversation.id)
            .await?
            .unwrap_or(conversation);

        info!(
            conversation_id = %conversation.id,
            gateway_id = %key.id,
            kind = %record.kind,
            from_agent = record.from_agent,
            "message ingested"
        );

        // Persistence is done; everything below is best-effort.
        self.notify(&conversation, &record, created, key.from_me).await;
        if !key.from_me {
            self.run_policy_chain(&conversation, &contact, &record).await;
        }
        Ok(())
    }

    /// Build the message row, rehosting transient media first.
    async fn build_record(
        &self,
        message_timestamp: Option<i64>,
        key: &MessageKey,
        conversation: &Conversation,
        normalized: &NormalizedMessage,
        instance_name: &str,
    ) -> MessageRecord {
        let media_url = match normalized.media_url.as_deref() {
            Some(url) => Some(
                self.rehoster
                    .rehost(
                        instance_name,
                        &key.id,
                        url,
                        normalized.media_mime.as_deref().unwrap_or(""),
                    )
                    .await,
            ),
            None => None,
        };

        let created_at = message_timestamp
            .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0))
            .map(|dt| dt.to_rfc3339())
            .unwrap_or_else(|| Utc::now().to_rfc3339());

        MessageRecord {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            gateway_id: key.id.clone(),
            content: normalized.content.clone(),
            kind: normalized.kind,
            media_url,
            media_mime: normalized.media_mime.clone(),
            from_agent: key.from_me,
            automated: false,
            internal: false,
            agent_id: None,
            status: if key.from_me {
                MessageStatus::Sent
            } else {
                MessageStatus::Delivered
            },
            quoted_gateway_id: normalized.quoted_gateway_id.clone(),
            participant: key.participant.clone(),
            read_by: None,
            deleted: false,
            deleted_at: None,
            deleted_by: None,
            metadata: None,
            created_at,
        }
    }

    /// First event for the pair: pick the instance's default sector and,
    /// when its agent configuration auto-replies, start the conversation
    /// in ai mode.
    async fn apply_conversation_defaults(
        &self,
        instance_id: &str,
        conversation_id: &str,
    ) -> Result<(), AtendeError> {
        let Some(sector) = sectors::default_for_instance(&self.db, instance_id).await? else {
            return Ok(());
        };
        conversations::set_sector(&self.db, conversation_id, &sector.id).await?;
        if let Some(config) = agent_configs::enabled_for_sector(&self.db, &sector.id).await?
            && config.auto_reply
        {
            conversations::set_mode(&self.db, conversation_id, ConversationMode::Ai).await?;
        }
        Ok(())
    }

    /// Realtime always; webhook only for contact-originated messages.
    async fn notify(
        &self,
        conversation: &Conversation,
        record: &MessageRecord,
        created: bool,
        from_me: bool,
    ) {
        self.realtime.publish(RealtimeEvent::MessageCreated {
            conversation_id: conversation.id.clone(),
            message_id: record.id.clone(),
            preview: preview(&record.content),
        });
        self.realtime.publish(RealtimeEvent::ConversationUpdated {
            conversation_id: conversation.id.clone(),
            unread_count: conversation.unread_count,
            assigned_to: conversation.assigned_to.clone(),
            last_message_at: conversation.last_message_at.clone(),
        });

        if from_me {
            return;
        }
        if created {
            let payload = serde_json::json!({
                "conversationId": conversation.id,
                "instanceId": conversation.instance_id,
                "contactId": conversation.contact_id,
            });
            if let Err(e) = self
                .webhook
                .publish(webhook_events::NEW_CONVERSATION, payload)
                .await
            {
                warn!(error = %e, "webhook publish failed");
            }
        }
        let payload = serde_json::json!({
            "conversationId": conversation.id,
            "messageId": record.id,
            "gatewayId": record.gateway_id,
            "kind": record.kind,
            "preview": preview(&record.content),
        });
        if let Err(e) = self
            .webhook
            .publish(webhook_events::NEW_MESSAGE, payload)
            .await
        {
            warn!(error = %e, "webhook publish failed");
        }
    }

    /// Assignment, auto-ticketing, and the response arbiter, in that
    /// order, each tolerating the others' failure.
    async fn run_policy_chain(
        &self,
        conversation: &Conversation,
        contact: &Contact,
        record: &MessageRecord,
    ) {
        if let Err(e) = self.assignment.assign(conversation).await {
            warn!(conversation_id = %conversation.id, error = %e, "assignment engine failed");
        }

        // Ticketing and the arbiter read assignment output; refetch.
        let conversation = match conversations::get(&self.db, &conversation.id).await {
            Ok(Some(conversation)) => conversation,
            _ => conversation.clone(),
        };

        if let Err(e) = self.tickets.on_contact_message(&conversation, contact).await {
            warn!(conversation_id = %conversation.id, error = %e, "auto-ticket manager failed");
        }

        match self
            .arbiter
            .on_contact_message(&conversation.id, &record.content)
            .await
        {
            Ok(outcome) => {
                debug!(conversation_id = %conversation.id, ?outcome, "arbiter outcome");
            }
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "response arbiter failed");
            }
        }
    }
}

/// Char-safe conversation preview.
fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_CHARS {
        content.to_string()
    } else {
        content.chars().take(PREVIEW_CHARS).collect()
    }
}
