// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status reconciliation: delivery/read receipts, reactions, and
//! deletions, applied with monotonic/idempotent semantics.
//!
//! Duplicate and out-of-order deliveries degrade to no-ops; a receipt or
//! reaction for a message the platform never saw is logged with context
//! and dropped.

use std::sync::Arc;

use tracing::{debug, warn};

use atende_core::event::{MessageKey, ReactionMessage};
use atende_core::traits::notify::{RealtimeEvent, RealtimeSink, WebhookSink, webhook_events};
use atende_core::types::MessageStatus;
use atende_core::{AtendeError, jid};
use atende_storage::Database;
use atende_storage::models::MessageRecord;
use atende_storage::queries::{messages, reactions};

pub struct StatusReconciler {
    db: Arc<Database>,
    realtime: Arc<dyn RealtimeSink>,
    webhook: Arc<dyn WebhookSink>,
}

impl StatusReconciler {
    pub fn new(
        db: Arc<Database>,
        realtime: Arc<dyn RealtimeSink>,
        webhook: Arc<dyn WebhookSink>,
    ) -> Self {
        Self {
            db,
            realtime,
            webhook,
        }
    }

    /// Primary lookup by gateway id, then best-effort secondary lookup
    /// against embedded metadata (gateways that reassign ids).
    async fn locate(&self, gateway_id: &str) -> Result<Option<MessageRecord>, AtendeError> {
        if let Some(message) = messages::find_by_gateway_id(&self.db, gateway_id).await? {
            return Ok(Some(message));
        }
        messages::find_by_prior_gateway_id(&self.db, gateway_id).await
    }

    /// Apply a delivery/read receipt.
    pub async fn apply_receipt(
        &self,
        key: &MessageKey,
        raw_status: &str,
        participant: Option<&str>,
    ) -> Result<(), AtendeError> {
        let Some(status) = MessageStatus::from_gateway(raw_status) else {
            debug!(raw_status, "unrecognized receipt vocabulary, dropped");
            return Ok(());
        };

        let Some(message) = self.locate(&key.id).await? else {
            warn!(
                gateway_id = %key.id,
                remote_jid = %key.remote_jid,
                raw_status,
                "receipt for unknown message, dropped"
            );
            return Ok(());
        };

        // Group read receipts also record the reporting participant.
        if status == MessageStatus::Read
            && jid::is_group(&key.remote_jid)
            && let Some(reporter) = participant.or(key.participant.as_deref())
        {
            messages::add_read_participant(&self.db, &message.id, reporter).await?;
        }

        let applied = messages::apply_status_if_greater(&self.db, &message.id, status).await?;
        if !applied {
            debug!(
                gateway_id = %key.id,
                status = %status,
                "receipt ignored (monotonic rule)"
            );
            return Ok(());
        }

        self.realtime.publish(RealtimeEvent::MessageUpdated {
            conversation_id: message.conversation_id.clone(),
            message_id: message.id.clone(),
            status: Some(status),
            deleted: false,
        });
        let webhook_event = match status {
            MessageStatus::Delivered => Some(webhook_events::MESSAGE_DELIVERED),
            MessageStatus::Read => Some(webhook_events::MESSAGE_READ),
            _ => None,
        };
        if let Some(event) = webhook_event {
            let payload = serde_json::json!({
                "conversationId": message.conversation_id,
                "messageId": message.id,
                "gatewayId": message.gateway_id,
                "status": status,
            });
            if let Err(e) = self.webhook.publish(event, payload).await {
                warn!(error = %e, event, "webhook publish failed");
            }
        }
        Ok(())
    }

    /// Apply a reaction event; `reactor` is the event's sender.
    pub async fn apply_reaction(
        &self,
        reaction: &ReactionMessage,
        reactor: &str,
    ) -> Result<(), AtendeError> {
        let Some(target) = reaction.key.as_ref() else {
            debug!("reaction without a target key, dropped");
            return Ok(());
        };
        let Some(message) = self.locate(&target.id).await? else {
            warn!(
                gateway_id = %target.id,
                reactor,
                "reaction for unknown message, dropped"
            );
            return Ok(());
        };

        let emoji = reaction.text.as_deref().unwrap_or("");
        reactions::apply(&self.db, &message.id, reactor, emoji).await?;
        debug!(
            message_id = %message.id,
            reactor,
            retracted = emoji.is_empty(),
            "reaction applied"
        );

        self.realtime.publish(RealtimeEvent::MessageUpdated {
            conversation_id: message.conversation_id,
            message_id: message.id,
            status: None,
            deleted: false,
        });
        Ok(())
    }

    /// Apply a deletion: soft-delete plus an internal audit note
    /// attributed to whichever side originated it.
    pub async fn apply_deletion(&self, key: &MessageKey) -> Result<(), AtendeError> {
        let Some(message) = self.locate(&key.id).await? else {
            warn!(gateway_id = %key.id, "deletion for unknown message, dropped");
            return Ok(());
        };

        let deleted_by = if key.from_me { "agent" } else { "contact" };
        let Some(original) = messages::soft_delete(&self.db, &message.id, deleted_by).await? else {
            // Already deleted; duplicate delivery is a no-op.
            return Ok(());
        };

        let note = MessageRecord::internal_note(
            &message.conversation_id,
            &format!("Message deleted by {deleted_by}. Original content: {original}"),
        );
        messages::insert_message(&self.db, &note).await?;

        self.realtime.publish(RealtimeEvent::MessageUpdated {
            conversation_id: message.conversation_id.clone(),
            message_id: message.id.clone(),
            status: None,
            deleted: true,
        });
        let payload = serde_json::json!({
            "conversationId": message.conversation_id,
            "messageId": message.id,
            "gatewayId": message.gateway_id,
            "deletedBy": deleted_by,
        });
        if let Err(e) = self
            .webhook
            .publish(webhook_events::MESSAGE_DELETED, payload)
            .await
        {
            warn!(error = %e, "webhook publish failed");
        }
        Ok(())
    }
}
