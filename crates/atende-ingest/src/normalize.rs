// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Message normalization: maps the gateway's payload shapes onto one
//! normalized form.
//!
//! Every variant yields a non-empty content string. Known media types get
//! a bracketed placeholder overridable by an explicit caption; payloads
//! the platform does not recognize get the unsupported placeholder rather
//! than a raw dump. Reaction and protocol variants are never normalized
//! into messages; the pipeline routes them to the status reconciler.

use atende_core::event::{MediaMessage, MessagePayload, RawMessageContent};
use atende_core::types::MessageKind;

/// Placeholder for unrecognized structured payloads.
pub const UNSUPPORTED_PLACEHOLDER: &str = "[Unsupported message]";

/// A gateway payload reduced to the persisted message shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedMessage {
    pub content: String,
    pub kind: MessageKind,
    pub media_url: Option<String>,
    pub media_mime: Option<String>,
    /// Gateway id of the quoted message, if the payload replies to one.
    pub quoted_gateway_id: Option<String>,
}

impl NormalizedMessage {
    fn text(content: String) -> Self {
        Self {
            content,
            kind: MessageKind::Text,
            media_url: None,
            media_mime: None,
            quoted_gateway_id: None,
        }
    }

    fn plain(content: &str, kind: MessageKind) -> Self {
        Self {
            content: content.to_string(),
            kind,
            media_url: None,
            media_mime: None,
            quoted_gateway_id: None,
        }
    }
}

fn media(m: &MediaMessage, placeholder: &str, kind: MessageKind) -> NormalizedMessage {
    let content = match m.caption.as_deref() {
        Some(caption) if !caption.trim().is_empty() => caption.to_string(),
        _ => match (kind, m.file_name.as_deref()) {
            (MessageKind::Document, Some(name)) => format!("{placeholder} {name}"),
            _ => placeholder.to_string(),
        },
    };
    NormalizedMessage {
        content,
        kind,
        media_url: m.url.clone(),
        media_mime: m.mimetype.clone(),
        quoted_gateway_id: m
            .context_info
            .as_ref()
            .and_then(|c| c.stanza_id.clone()),
    }
}

/// Normalize a raw payload. Returns `None` for reaction and protocol
/// variants, which belong to the status reconciler.
pub fn normalize(raw: &RawMessageContent) -> Option<NormalizedMessage> {
    let normalized = match raw.payload() {
        MessagePayload::Text(text) => {
            if text.trim().is_empty() {
                NormalizedMessage::plain(UNSUPPORTED_PLACEHOLDER, MessageKind::Unsupported)
            } else {
                NormalizedMessage::text(text.to_string())
            }
        }
        MessagePayload::ExtendedText(m) => {
            let mut normalized = match m.text.as_deref() {
                Some(text) if !text.trim().is_empty() => NormalizedMessage::text(text.to_string()),
                _ => NormalizedMessage::plain(UNSUPPORTED_PLACEHOLDER, MessageKind::Unsupported),
            };
            normalized.quoted_gateway_id =
                m.context_info.as_ref().and_then(|c| c.stanza_id.clone());
            normalized
        }
        MessagePayload::Image(m) => media(m, "[Image]", MessageKind::Image),
        MessagePayload::Video(m) => media(m, "[Video]", MessageKind::Video),
        MessagePayload::Audio(m) => media(m, "[Audio]", MessageKind::Audio),
        MessagePayload::Document(m) => media(m, "[Document]", MessageKind::Document),
        MessagePayload::Sticker(m) => media(m, "[Sticker]", MessageKind::Sticker),
        MessagePayload::Location(m) => {
            let content = match (&m.name, m.degrees_latitude, m.degrees_longitude) {
                (Some(name), _, _) if !name.trim().is_empty() => format!("[Location] {name}"),
                (_, Some(lat), Some(lon)) => format!("[Location] {lat:.6}, {lon:.6}"),
                _ => "[Location]".to_string(),
            };
            NormalizedMessage {
                content,
                kind: MessageKind::Location,
                media_url: None,
                media_mime: None,
                quoted_gateway_id: None,
            }
        }
        MessagePayload::LiveLocation(_) => {
            NormalizedMessage::plain("[Live location]", MessageKind::Location)
        }
        MessagePayload::ContactCard(m) => {
            let content = match m.display_name.as_deref() {
                Some(name) if !name.trim().is_empty() => format!("[Contact] {name}"),
                _ => "[Contact]".to_string(),
            };
            NormalizedMessage::plain(&content, MessageKind::Contact)
        }
        MessagePayload::ContactCards(m) => NormalizedMessage::plain(
            &format!("[Contacts] ({})", m.contacts.len()),
            MessageKind::Contact,
        ),
        MessagePayload::PollCreate(m) => {
            let content = match m.name.as_deref() {
                Some(name) if !name.trim().is_empty() => format!("[Poll] {name}"),
                _ => "[Poll]".to_string(),
            };
            NormalizedMessage::plain(&content, MessageKind::Poll)
        }
        MessagePayload::PollUpdate(_) => NormalizedMessage::plain("[Poll update]", MessageKind::Poll),
        MessagePayload::ButtonsReply(m) => {
            let content = m
                .selected_display_text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or("[Button reply]");
            NormalizedMessage::plain(content, MessageKind::Interactive)
        }
        MessagePayload::ListReply(m) => {
            let content = m
                .title
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or("[List reply]");
            NormalizedMessage::plain(content, MessageKind::Interactive)
        }
        MessagePayload::TemplateReply(m) => {
            let content = m
                .selected_display_text
                .as_deref()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or("[Template reply]");
            NormalizedMessage::plain(content, MessageKind::Interactive)
        }
        // Reconciler territory, not messages.
        MessagePayload::Protocol(_) | MessagePayload::Reaction(_) => return None,
        MessagePayload::Unsupported(_) | MessagePayload::Empty => {
            NormalizedMessage::plain(UNSUPPORTED_PLACEHOLDER, MessageKind::Unsupported)
        }
    };
    Some(normalized)
}
