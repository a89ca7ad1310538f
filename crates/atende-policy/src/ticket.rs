// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Auto-ticketing per sector policy.
//!
//! Opens a ticket on the first contact-originated message of a
//! conversation without one, inserts a system marker message, and fires
//! the sector's templated messages through the outbound channel. Template
//! send failure is logged and never rolls back the ticket transition.

use std::sync::Arc;

use tracing::{debug, info, warn};

use atende_core::types::TicketStatus;
use atende_core::traits::transport::{GatewayTransport, OutboundText};
use atende_core::{AtendeError, jid};
use atende_storage::Database;
use atende_storage::models::{Contact, Conversation, MessageRecord, Sector, Ticket};
use atende_storage::queries::{contacts, conversations, instances, messages, sectors, tickets};

use crate::template::{self, TemplateContext};

pub struct TicketManager {
    db: Arc<Database>,
    transport: Arc<dyn GatewayTransport>,
}

impl TicketManager {
    pub fn new(db: Arc<Database>, transport: Arc<dyn GatewayTransport>) -> Self {
        Self { db, transport }
    }

    /// Ticketing hook for a contact-originated message. Creates a ticket
    /// when the sector enables ticketing for this chat kind and the
    /// conversation has no active ticket.
    pub async fn on_contact_message(
        &self,
        conversation: &Conversation,
        contact: &Contact,
    ) -> Result<Option<Ticket>, AtendeError> {
        let Some(sector_id) = conversation.sector_id.as_deref() else {
            return Ok(None);
        };
        let Some(sector) = sectors::get(&self.db, sector_id).await? else {
            return Ok(None);
        };

        let enabled = if contact.is_group {
            sector.ticket_group
        } else {
            sector.ticket_individual
        };
        if !enabled {
            return Ok(None);
        }

        if tickets::active_for_conversation(&self.db, &conversation.id)
            .await?
            .is_some()
        {
            return Ok(None);
        }

        let (ticket, created) =
            tickets::create_if_none_active(&self.db, &conversation.id, &sector.id).await?;
        if !created {
            return Ok(None);
        }

        info!(
            conversation_id = %conversation.id,
            ticket_number = ticket.number,
            sector = %sector.name,
            "ticket opened"
        );

        let marker = MessageRecord::internal_note(
            &conversation.id,
            &format!("Ticket #{} opened for sector {}", ticket.number, sector.name),
        );
        messages::insert_message(&self.db, &marker).await?;

        if let Some(tpl) = sector.welcome_template.as_deref() {
            self.send_template(tpl, conversation, contact, &sector, &ticket)
                .await;
        }

        Ok(Some(ticket))
    }

    /// Close a ticket, firing the closing template before returning.
    pub async fn close(&self, ticket_id: &str) -> Result<Option<Ticket>, AtendeError> {
        self.transition(ticket_id, TicketStatus::Closed).await
    }

    /// Reopen a ticket, firing the reopen template before returning.
    pub async fn reopen(&self, ticket_id: &str) -> Result<Option<Ticket>, AtendeError> {
        self.transition(ticket_id, TicketStatus::Reopened).await
    }

    async fn transition(
        &self,
        ticket_id: &str,
        status: TicketStatus,
    ) -> Result<Option<Ticket>, AtendeError> {
        let Some(ticket) = tickets::set_status(&self.db, ticket_id, status).await? else {
            return Ok(None);
        };

        let marker = MessageRecord::internal_note(
            &ticket.conversation_id,
            &format!("Ticket #{} {}", ticket.number, ticket.status),
        );
        messages::insert_message(&self.db, &marker).await?;

        // Best-effort template send; the status transition stands either way.
        if let Some(conversation) = conversations::get(&self.db, &ticket.conversation_id).await?
            && let Some(contact) = contacts::get_contact(&self.db, &conversation.contact_id).await?
            && let Some(sector) = sectors::get(&self.db, &ticket.sector_id).await?
        {
            let tpl = match status {
                TicketStatus::Closed => sector.closing_template.clone(),
                TicketStatus::Reopened => sector.reopen_template.clone(),
                _ => None,
            };
            if let Some(tpl) = tpl.as_deref() {
                self.send_template(tpl, &conversation, &contact, &sector, &ticket)
                    .await;
            }
        }

        Ok(Some(ticket))
    }

    /// Render and send a sector template; failures are logged, never
    /// propagated.
    async fn send_template(
        &self,
        template: &str,
        conversation: &Conversation,
        contact: &Contact,
        sector: &Sector,
        ticket: &Ticket,
    ) {
        let Some(destination) = destination_for(contact) else {
            debug!(contact_id = %contact.id, "no routable destination for template");
            return;
        };
        let instance_name = match instances::get_by_id(&self.db, &conversation.instance_id).await {
            Ok(Some(instance)) => instance.name,
            _ => {
                warn!(conversation_id = %conversation.id, "instance not found for template send");
                return;
            }
        };

        let ctx = TemplateContext {
            customer_name: contact.push_name.clone(),
            customer_phone: contact.phone.clone(),
            agent_name: conversation.assigned_to.clone(),
            sector_name: Some(sector.name.clone()),
            ticket_number: Some(ticket.number),
        };
        let text = template::render(template, &ctx);

        let out = OutboundText {
            to: destination,
            text: text.clone(),
            quoted_id: None,
        };
        match self.transport.send_text(&instance_name, &out).await {
            Ok(gateway_id) => {
                let record =
                    MessageRecord::outbound(&conversation.id, &gateway_id, &text, true);
                if let Err(e) = messages::insert_message(&self.db, &record).await {
                    warn!(error = %e, "failed to persist template message");
                }
            }
            Err(e) => {
                warn!(
                    conversation_id = %conversation.id,
                    error = %e,
                    "template send failed"
                );
            }
        }
    }
}

/// The routable destination for a contact: the stored routable id, else a
/// phone-derived one.
pub fn destination_for(contact: &Contact) -> Option<String> {
    if let Some(jid) = &contact.remote_jid {
        return Some(jid.clone());
    }
    contact
        .phone
        .as_ref()
        .map(|phone| format!("{phone}{}", jid::USER_SUFFIX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use atende_core::types::ConversationMode;
    use atende_storage::queries::instances;
    use atende_test_utils::{MockGateway, sector_fixture, temp_database};

    async fn seed(
        db: &Database,
        welcome: Option<&str>,
        closing: Option<&str>,
    ) -> (Conversation, Contact, Sector) {
        let instance = instances::upsert_instance(db, "main").await.unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let contact = Contact {
            id: uuid::Uuid::new_v4().to_string(),
            instance_id: instance.id.clone(),
            phone: Some("5511999999999".to_string()),
            remote_jid: Some("5511999999999@s.whatsapp.net".to_string()),
            push_name: Some("Maria".to_string()),
            is_group: false,
            avatar_url: None,
            metadata: None,
            created_at: now.clone(),
            updated_at: now,
        };
        contacts::insert_contact(db, &contact).await.unwrap();
        let mut sector = sector_fixture(&instance.id);
        sector.welcome_template = welcome.map(|s| s.to_string());
        sector.closing_template = closing.map(|s| s.to_string());
        sectors::insert_sector(db, &sector).await.unwrap();
        let (conversation, _) =
            conversations::create_or_get(db, &instance.id, &contact.id, ConversationMode::Human)
                .await
                .unwrap();
        conversations::set_sector(db, &conversation.id, &sector.id)
            .await
            .unwrap();
        let conversation = conversations::get(db, &conversation.id).await.unwrap().unwrap();
        (conversation, contact, sector)
    }

    #[tokio::test]
    async fn opens_one_ticket_and_sends_welcome() {
        let (db, _dir) = temp_database().await;
        let db = Arc::new(db);
        let gateway = MockGateway::new();
        let manager = TicketManager::new(Arc::clone(&db), gateway.clone());

        let (conversation, contact, _sector) =
            seed(&db, Some("Ola {{nomeCliente}}, ticket #{{numeroTicket}}"), None).await;

        let ticket = manager
            .on_contact_message(&conversation, &contact)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(ticket.number, 1);

        // Second message on the same conversation: no new ticket.
        assert!(manager
            .on_contact_message(&conversation, &contact)
            .await
            .unwrap()
            .is_none());

        let sent = gateway.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].text, "Ola Maria, ticket #1");
        assert_eq!(sent[0].to, "5511999999999@s.whatsapp.net");
    }

    #[tokio::test]
    async fn group_chat_kind_is_gated_independently() {
        let (db, _dir) = temp_database().await;
        let db = Arc::new(db);
        let gateway = MockGateway::new();
        let manager = TicketManager::new(Arc::clone(&db), gateway.clone());

        // sector_fixture enables individual ticketing only.
        let (conversation, mut contact, _sector) = seed(&db, None, None).await;
        contact.is_group = true;
        assert!(manager
            .on_contact_message(&conversation, &contact)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn close_fires_template_but_never_rolls_back() {
        let (db, _dir) = temp_database().await;
        let db = Arc::new(db);
        let gateway = MockGateway::new();
        let manager = TicketManager::new(Arc::clone(&db), gateway.clone());

        let (conversation, contact, _sector) =
            seed(&db, None, Some("Ticket #{{numeroTicket}} encerrado")).await;

        let ticket = manager
            .on_contact_message(&conversation, &contact)
            .await
            .unwrap()
            .unwrap();

        // Outbound sends fail from here on; closing must still land.
        gateway.set_fail_sends(true);
        let closed = manager.close(&ticket.id).await.unwrap().unwrap();
        assert_eq!(closed.status, TicketStatus::Closed);
        assert!(closed.closed_at.is_some());
    }

    #[tokio::test]
    async fn reopen_transitions_back_to_active() {
        let (db, _dir) = temp_database().await;
        let db = Arc::new(db);
        let gateway = MockGateway::new();
        let manager = TicketManager::new(Arc::clone(&db), gateway.clone());

        let (conversation, contact, _sector) = seed(&db, None, None).await;
        let ticket = manager
            .on_contact_message(&conversation, &contact)
            .await
            .unwrap()
            .unwrap();
        manager.close(&ticket.id).await.unwrap();
        let reopened = manager.reopen(&ticket.id).await.unwrap().unwrap();
        assert!(reopened.status.is_active());
    }
}
