// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The ai/human/hybrid reply state machine.
//!
//! `human`: automation never replies. `ai`: every qualifying customer
//! message triggers a reply attempt. `hybrid`: a reply fires only once the
//! configured timeout has elapsed since the customer's latest message,
//! with no human reply and no automated reply after it.
//!
//! The event-driven path and the periodic sweep share the identical
//! [`ResponseArbiter::hybrid_gate`] guard, so they cannot race into a
//! double reply.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use tracing::{debug, info, warn};

use atende_core::AtendeError;
use atende_core::traits::completion::{CompletionProvider, CompletionRequest};
use atende_core::traits::transport::{GatewayTransport, OutboundText};
use atende_core::types::{ConversationMode, ConversationStatus};
use atende_policy::destination_for;
use atende_storage::Database;
use atende_storage::models::{AgentConfig, CompletionLog, Conversation, MessageRecord};
use atende_storage::queries::{agent_configs, contacts, conversations, instances, messages, sectors};

use crate::hours;
use crate::prompt;

/// Tuning knobs shared by both arbiter paths.
#[derive(Debug, Clone)]
pub struct ArbiterSettings {
    /// Dialogue turns fed to the completion service.
    pub history_limit: i64,
    /// Maximum tokens per generated reply.
    pub max_tokens: u32,
}

impl Default for ArbiterSettings {
    fn default() -> Self {
        Self {
            history_limit: 20,
            max_tokens: 1024,
        }
    }
}

/// What the arbiter decided for one evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyOutcome {
    /// A reply was generated and sent.
    Replied,
    /// An escalation keyword flipped the conversation to human.
    Escalated,
    /// Outside the working-hours window.
    OutOfHours,
    /// Mode, sector, or configuration rules automation out.
    NotEligible,
    /// Hybrid timeout has not elapsed yet.
    WaitingTimeout,
    /// A human or a prior automated reply already covered the message.
    AlreadyHandled,
    /// The completion call or the outbound send failed; conversation
    /// state is unchanged.
    AttemptFailed,
}

/// Counters from one sweep pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepStats {
    pub evaluated: usize,
    pub replied: usize,
}

enum HybridGate {
    Due,
    Waiting,
    HumanHandled,
    AlreadyReplied,
    NoCustomerMessage,
}

pub struct ResponseArbiter {
    db: Arc<Database>,
    transport: Arc<dyn GatewayTransport>,
    completion: Arc<dyn CompletionProvider>,
    settings: ArbiterSettings,
}

impl ResponseArbiter {
    pub fn new(
        db: Arc<Database>,
        transport: Arc<dyn GatewayTransport>,
        completion: Arc<dyn CompletionProvider>,
        settings: ArbiterSettings,
    ) -> Self {
        Self {
            db,
            transport,
            completion,
            settings,
        }
    }

    /// Event-driven evaluation for a contact-originated message that was
    /// just persisted. `content` is the normalized message content, used
    /// for escalation keyword matching.
    pub async fn on_contact_message(
        &self,
        conversation_id: &str,
        content: &str,
    ) -> Result<ReplyOutcome, AtendeError> {
        let Some(conversation) = conversations::get(&self.db, conversation_id).await? else {
            return Ok(ReplyOutcome::NotEligible);
        };
        if conversation.status != ConversationStatus::Active
            || conversation.mode == ConversationMode::Human
        {
            return Ok(ReplyOutcome::NotEligible);
        }
        let Some(config) = self.enabled_config(&conversation).await? else {
            return Ok(ReplyOutcome::NotEligible);
        };

        // Escalation flips the mode immediately and suppresses the reply.
        if contains_keyword(content, &config.escalation_keywords) {
            conversations::set_mode(&self.db, &conversation.id, ConversationMode::Human).await?;
            info!(
                conversation_id = %conversation.id,
                "escalation keyword matched, conversation handed to human"
            );
            return Ok(ReplyOutcome::Escalated);
        }

        match conversation.mode {
            ConversationMode::Ai => self.try_reply(&conversation, &config).await,
            ConversationMode::Hybrid => match self.hybrid_gate(&conversation, &config).await? {
                HybridGate::Due => self.try_reply(&conversation, &config).await,
                HybridGate::Waiting => Ok(ReplyOutcome::WaitingTimeout),
                HybridGate::HumanHandled | HybridGate::AlreadyReplied => {
                    Ok(ReplyOutcome::AlreadyHandled)
                }
                HybridGate::NoCustomerMessage => Ok(ReplyOutcome::NotEligible),
            },
            ConversationMode::Human => Ok(ReplyOutcome::NotEligible),
        }
    }

    /// Periodic re-evaluation of every hybrid conversation, so a reply
    /// still fires when the customer simply stops writing after the
    /// timeout starts. Applies the identical gate as the event path.
    pub async fn sweep(&self) -> Result<SweepStats, AtendeError> {
        let mut stats = SweepStats::default();
        for conversation in conversations::list_hybrid_active(&self.db).await? {
            stats.evaluated += 1;
            let config = match self.enabled_config(&conversation).await {
                Ok(Some(config)) => config,
                Ok(None) => continue,
                Err(e) => {
                    warn!(conversation_id = %conversation.id, error = %e, "sweep: config lookup failed");
                    continue;
                }
            };
            match self.hybrid_gate(&conversation, &config).await {
                Ok(HybridGate::Due) => match self.try_reply(&conversation, &config).await {
                    Ok(ReplyOutcome::Replied) => stats.replied += 1,
                    Ok(_) => {}
                    Err(e) => {
                        warn!(conversation_id = %conversation.id, error = %e, "sweep: reply attempt failed");
                    }
                },
                Ok(_) => {}
                Err(e) => {
                    warn!(conversation_id = %conversation.id, error = %e, "sweep: gate evaluation failed");
                }
            }
        }
        Ok(stats)
    }

    async fn enabled_config(
        &self,
        conversation: &Conversation,
    ) -> Result<Option<AgentConfig>, AtendeError> {
        let Some(sector_id) = conversation.sector_id.as_deref() else {
            return Ok(None);
        };
        let Some(config) = agent_configs::enabled_for_sector(&self.db, sector_id).await? else {
            return Ok(None);
        };
        if !config.auto_reply {
            return Ok(None);
        }
        Ok(Some(config))
    }

    /// The shared hybrid guard: timeout elapsed since the customer's most
    /// recent message, and neither a human message nor an automated reply
    /// exists after it.
    async fn hybrid_gate(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
    ) -> Result<HybridGate, AtendeError> {
        let Some(last) = messages::last_contact_message(&self.db, &conversation.id).await? else {
            return Ok(HybridGate::NoCustomerMessage);
        };
        let last_at = DateTime::parse_from_rfc3339(&last.created_at)
            .map_err(|e| AtendeError::Internal(format!("bad message timestamp: {e}")))?
            .with_timezone(&Utc);
        let timeout = chrono::Duration::minutes(config.hybrid_timeout_minutes);
        if Utc::now() < last_at + timeout {
            return Ok(HybridGate::Waiting);
        }
        if messages::exists_agent_message_after(&self.db, &conversation.id, &last.created_at, false)
            .await?
        {
            return Ok(HybridGate::HumanHandled);
        }
        if messages::exists_agent_message_after(&self.db, &conversation.id, &last.created_at, true)
            .await?
        {
            return Ok(HybridGate::AlreadyReplied);
        }
        Ok(HybridGate::Due)
    }

    /// Generate and send one reply: working hours, history, instruction
    /// block, completion call, response delay, send with agent-name
    /// header, persistence, structured log.
    async fn try_reply(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
    ) -> Result<ReplyOutcome, AtendeError> {
        if !hours::within_working_hours(config, Local::now().naive_local()) {
            if let Some(tpl) = config.out_of_hours_template.as_deref() {
                self.maybe_send_out_of_hours(conversation, config, tpl).await?;
            }
            return Ok(ReplyOutcome::OutOfHours);
        }

        let history = messages::history(&self.db, &conversation.id, self.settings.history_limit)
            .await?;
        let sector_name = match conversation.sector_id.as_deref() {
            Some(sector_id) => sectors::get(&self.db, sector_id)
                .await?
                .map(|s| s.name)
                .unwrap_or_default(),
            None => String::new(),
        };
        let system = prompt::build_instructions(config, &sector_name);
        let turns = prompt::dialogue_from(&history);

        let request = CompletionRequest {
            model: config.model.clone(),
            system: system.clone(),
            history: turns.clone(),
            max_tokens: self.settings.max_tokens,
        };
        let response = match self.completion.complete(request).await {
            Ok(response) => response,
            Err(e) => {
                // Abort only the attempt; a human can still take over.
                warn!(
                    conversation_id = %conversation.id,
                    error = %e,
                    "completion service failed"
                );
                return Ok(ReplyOutcome::AttemptFailed);
            }
        };

        if config.response_delay_secs > 0 {
            tokio::time::sleep(Duration::from_secs(config.response_delay_secs as u64)).await;
        }

        let text = format!("*{}:*\n{}", config.agent_name, response.content.trim());
        if self
            .send_automated(conversation, &text)
            .await?
            .is_none()
        {
            return Ok(ReplyOutcome::AttemptFailed);
        }

        let log = CompletionLog {
            id: uuid::Uuid::new_v4().to_string(),
            config_id: config.id.clone(),
            conversation_id: conversation.id.clone(),
            prompt: serde_json::json!({ "system": system, "history": turns }).to_string(),
            completion: response.content.clone(),
            model: response.model.clone(),
            created_at: Utc::now().to_rfc3339(),
        };
        agent_configs::insert_completion_log(&self.db, &log).await?;

        info!(
            conversation_id = %conversation.id,
            config_id = %config.id,
            model = %response.model,
            "automated reply sent"
        );
        Ok(ReplyOutcome::Replied)
    }

    /// Out-of-hours template: once per qualifying customer message. The
    /// persisted automated record is what makes the re-check (and the
    /// sweep) skip the second send.
    async fn maybe_send_out_of_hours(
        &self,
        conversation: &Conversation,
        config: &AgentConfig,
        template: &str,
    ) -> Result<(), AtendeError> {
        let Some(last) = messages::last_contact_message(&self.db, &conversation.id).await? else {
            return Ok(());
        };
        if messages::exists_agent_message_after(&self.db, &conversation.id, &last.created_at, true)
            .await?
        {
            return Ok(());
        }
        let text = format!("*{}:*\n{}", config.agent_name, template);
        self.send_automated(conversation, &text).await?;
        debug!(conversation_id = %conversation.id, "out-of-hours template sent");
        Ok(())
    }

    /// Send a text through the gateway and persist it as an automated
    /// outbound message. Send failure is logged and surfaces as `None`.
    async fn send_automated(
        &self,
        conversation: &Conversation,
        text: &str,
    ) -> Result<Option<String>, AtendeError> {
        let Some(contact) = contacts::get_contact(&self.db, &conversation.contact_id).await? else {
            return Ok(None);
        };
        let Some(destination) = destination_for(&contact) else {
            return Ok(None);
        };
        let Some(instance) = instances::get_by_id(&self.db, &conversation.instance_id).await? else {
            return Ok(None);
        };

        let out = OutboundText {
            to: destination,
            text: text.to_string(),
            quoted_id: None,
        };
        let gateway_id = match self.transport.send_text(&instance.name, &out).await {
            Ok(id) => id,
            Err(e) => {
                warn!(conversation_id = %conversation.id, error = %e, "outbound send failed");
                return Ok(None);
            }
        };

        let record = MessageRecord::outbound(&conversation.id, &gateway_id, text, true);
        messages::insert_message(&self.db, &record).await?;
        conversations::record_last_message(
            &self.db,
            &conversation.id,
            &record.created_at,
            text,
            false,
        )
        .await?;
        Ok(Some(record.id))
    }
}

/// Case-insensitive containment over the configured keyword list.
fn contains_keyword(content: &str, keywords: &[String]) -> bool {
    let content = content.to_lowercase();
    keywords
        .iter()
        .filter(|k| !k.trim().is_empty())
        .any(|k| content.contains(&k.to_lowercase()))
}
