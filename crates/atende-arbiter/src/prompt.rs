// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Instruction-block and dialogue-history assembly for generated replies.

use atende_core::traits::completion::{DialogueRole, DialogueTurn};
use atende_storage::models::{AgentConfig, MessageRecord};

/// Build the instruction block from the agent configuration: persona,
/// tone, business context, and FAQ, in that order.
pub fn build_instructions(config: &AgentConfig, sector_name: &str) -> String {
    let mut blocks = Vec::new();

    blocks.push(format!(
        "Voce e {}, atendendo clientes do setor {}.",
        config.agent_name, sector_name
    ));
    if let Some(persona) = config.persona.as_deref() {
        blocks.push(persona.to_string());
    }
    if let Some(tone) = config.tone.as_deref() {
        blocks.push(format!("Tom de voz: {tone}."));
    }
    if let Some(context) = config.business_context.as_deref() {
        blocks.push(format!("Contexto do negocio:\n{context}"));
    }
    if let Some(faq) = config.faq.as_deref() {
        blocks.push(format!("Perguntas frequentes:\n{faq}"));
    }
    blocks.push(
        "Responda a ultima mensagem do cliente de forma curta e util. \
         Nao invente informacoes que nao estejam no contexto."
            .to_string(),
    );

    blocks.join("\n\n")
}

/// Map persisted messages onto dialogue turns, oldest first. Internal
/// system notes are already excluded by the history query; deleted
/// messages are dropped here.
pub fn dialogue_from(messages: &[MessageRecord]) -> Vec<DialogueTurn> {
    messages
        .iter()
        .filter(|m| !m.deleted)
        .map(|m| DialogueTurn {
            role: if m.from_agent {
                DialogueRole::Agent
            } else {
                DialogueRole::Customer
            },
            content: m.content.clone(),
        })
        .collect()
}
