// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound gateway event model.
//!
//! The gateway delivers loosely-typed JSON webhook events. This module
//! gives them a typed shape: an [`EventEnvelope`] with a [`MessageKey`]
//! and a [`RawMessageContent`] whose populated field decides the payload
//! variant. [`RawMessageContent::payload`] projects the raw shape onto the
//! closed [`MessagePayload`] union the normalizer matches exhaustively.

use serde::{Deserialize, Serialize};

/// One webhook event as delivered by the gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EventEnvelope {
    /// Event kind discriminator, e.g. `messages.upsert`.
    pub event: String,
    /// Name of the channel instance the event belongs to.
    pub instance: String,
    #[serde(default)]
    pub data: EventData,
}

impl EventEnvelope {
    pub fn kind(&self) -> EventKind {
        EventKind::parse(&self.event)
    }
}

/// The event kinds the platform consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A new message (inbound or echo of an outbound send).
    MessageUpsert,
    /// A delivery/read receipt for an existing message.
    MessageUpdate,
    /// A message deletion.
    MessageDelete,
    /// Instance connection state change.
    ConnectionUpdate,
    /// Anything else; ignored with a debug log.
    Unknown,
}

impl EventKind {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "messages.upsert" => EventKind::MessageUpsert,
            "messages.update" => EventKind::MessageUpdate,
            "messages.delete" => EventKind::MessageDelete,
            "connection.update" => EventKind::ConnectionUpdate,
            _ => EventKind::Unknown,
        }
    }
}

/// Event payload; which fields are populated depends on the event kind.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EventData {
    /// Identifies the message a `messages.*` event refers to.
    pub key: Option<MessageKey>,
    /// Message body for `messages.upsert`.
    pub message: Option<RawMessageContent>,
    /// Unix seconds.
    pub message_timestamp: Option<i64>,
    /// Sender display name, when the gateway knows it.
    pub push_name: Option<String>,
    /// Receipt vocabulary for `messages.update`.
    pub status: Option<String>,
    /// Reporting participant for group receipts.
    pub participant: Option<String>,
    /// Sender-id field some gateway versions carry alongside the key.
    pub sender: Option<String>,
    /// Connection vocabulary for `connection.update`.
    pub state: Option<String>,
}

/// The gateway's composite message identifier.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageKey {
    /// Gateway message id; unique per conversation, the idempotency key.
    pub id: String,
    /// Routable id of the conversation peer.
    pub remote_jid: String,
    /// True when the message was sent by this side.
    #[serde(default)]
    pub from_me: bool,
    /// Sender inside a group conversation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant: Option<String>,
    /// Explicit sender phone number, when the gateway routed the
    /// conversation through a transient id but still knows the phone.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_pn: Option<String>,
}

/// Raw message body: exactly one of these fields is populated per event.
///
/// Unknown payload shapes land in `other` and surface as
/// [`MessagePayload::Unsupported`].
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RawMessageContent {
    pub conversation: Option<String>,
    pub extended_text_message: Option<ExtendedTextMessage>,
    pub image_message: Option<MediaMessage>,
    pub video_message: Option<MediaMessage>,
    pub audio_message: Option<MediaMessage>,
    pub document_message: Option<MediaMessage>,
    pub sticker_message: Option<MediaMessage>,
    pub location_message: Option<LocationMessage>,
    pub live_location_message: Option<LocationMessage>,
    pub contact_message: Option<ContactMessage>,
    pub contacts_array_message: Option<ContactsArrayMessage>,
    pub poll_creation_message: Option<PollCreationMessage>,
    pub poll_update_message: Option<PollUpdateMessage>,
    pub buttons_response_message: Option<ButtonsResponseMessage>,
    pub list_response_message: Option<ListResponseMessage>,
    pub template_button_reply_message: Option<TemplateButtonReplyMessage>,
    pub protocol_message: Option<ProtocolMessage>,
    pub reaction_message: Option<ReactionMessage>,
    #[serde(flatten)]
    pub other: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtendedTextMessage {
    pub text: Option<String>,
    pub context_info: Option<ContextInfo>,
}

/// Shared shape of the gateway's media payloads.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MediaMessage {
    pub url: Option<String>,
    pub mimetype: Option<String>,
    pub caption: Option<String>,
    pub file_name: Option<String>,
    pub context_info: Option<ContextInfo>,
}

/// Quote/reply metadata attached to a payload.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextInfo {
    /// Gateway id of the quoted message.
    pub stanza_id: Option<String>,
    pub participant: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LocationMessage {
    pub degrees_latitude: Option<f64>,
    pub degrees_longitude: Option<f64>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactMessage {
    pub display_name: Option<String>,
    pub vcard: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactsArrayMessage {
    pub display_name: Option<String>,
    pub contacts: Vec<ContactMessage>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollCreationMessage {
    pub name: Option<String>,
    pub options: Vec<PollOption>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollOption {
    pub option_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollUpdateMessage {
    pub poll_creation_message_key: Option<MessageKey>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ButtonsResponseMessage {
    pub selected_button_id: Option<String>,
    pub selected_display_text: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ListResponseMessage {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TemplateButtonReplyMessage {
    pub selected_id: Option<String>,
    pub selected_display_text: Option<String>,
}

/// Protocol/system payload; `REVOKE` carries the key of a deleted message.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProtocolMessage {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub key: Option<MessageKey>,
}

impl ProtocolMessage {
    /// True when this protocol message revokes (deletes) another message.
    pub fn is_revoke(&self) -> bool {
        matches!(self.kind.as_deref(), Some("REVOKE") | Some("0"))
    }
}

/// Reaction payload; an empty `text` retracts the reactor's reaction.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReactionMessage {
    /// Key of the message being reacted to.
    pub key: Option<MessageKey>,
    /// The emoji; empty means "remove my reaction".
    pub text: Option<String>,
}

/// The closed payload union the normalizer matches exhaustively.
#[derive(Debug)]
pub enum MessagePayload<'a> {
    Text(&'a str),
    ExtendedText(&'a ExtendedTextMessage),
    Image(&'a MediaMessage),
    Video(&'a MediaMessage),
    Audio(&'a MediaMessage),
    Document(&'a MediaMessage),
    Sticker(&'a MediaMessage),
    Location(&'a LocationMessage),
    LiveLocation(&'a LocationMessage),
    ContactCard(&'a ContactMessage),
    ContactCards(&'a ContactsArrayMessage),
    PollCreate(&'a PollCreationMessage),
    PollUpdate(&'a PollUpdateMessage),
    ButtonsReply(&'a ButtonsResponseMessage),
    ListReply(&'a ListResponseMessage),
    TemplateReply(&'a TemplateButtonReplyMessage),
    Protocol(&'a ProtocolMessage),
    Reaction(&'a ReactionMessage),
    /// Unrecognized structured payload.
    Unsupported(&'a serde_json::Map<String, serde_json::Value>),
    /// A message object with no payload at all.
    Empty,
}

impl RawMessageContent {
    /// Projects onto the payload union; the first populated field wins.
    pub fn payload(&self) -> MessagePayload<'_> {
        if let Some(text) = &self.conversation {
            return MessagePayload::Text(text);
        }
        if let Some(m) = &self.extended_text_message {
            return MessagePayload::ExtendedText(m);
        }
        if let Some(m) = &self.image_message {
            return MessagePayload::Image(m);
        }
        if let Some(m) = &self.video_message {
            return MessagePayload::Video(m);
        }
        if let Some(m) = &self.audio_message {
            return MessagePayload::Audio(m);
        }
        if let Some(m) = &self.document_message {
            return MessagePayload::Document(m);
        }
        if let Some(m) = &self.sticker_message {
            return MessagePayload::Sticker(m);
        }
        if let Some(m) = &self.location_message {
            return MessagePayload::Location(m);
        }
        if let Some(m) = &self.live_location_message {
            return MessagePayload::LiveLocation(m);
        }
        if let Some(m) = &self.contact_message {
            return MessagePayload::ContactCard(m);
        }
        if let Some(m) = &self.contacts_array_message {
            return MessagePayload::ContactCards(m);
        }
        if let Some(m) = &self.poll_creation_message {
            return MessagePayload::PollCreate(m);
        }
        if let Some(m) = &self.poll_update_message {
            return MessagePayload::PollUpdate(m);
        }
        if let Some(m) = &self.buttons_response_message {
            return MessagePayload::ButtonsReply(m);
        }
        if let Some(m) = &self.list_response_message {
            return MessagePayload::ListReply(m);
        }
        if let Some(m) = &self.template_button_reply_message {
            return MessagePayload::TemplateReply(m);
        }
        if let Some(m) = &self.protocol_message {
            return MessagePayload::Protocol(m);
        }
        if let Some(m) = &self.reaction_message {
            return MessagePayload::Reaction(m);
        }
        if !self.other.is_empty() {
            return MessagePayload::Unsupported(&self.other);
        }
        MessagePayload::Empty
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_parses_a_text_upsert() {
        let raw = serde_json::json!({
            "event": "messages.upsert",
            "instance": "main",
            "data": {
                "key": {
                    "id": "BAE5A1B2C3",
                    "remoteJid": "5511999999999@s.whatsapp.net",
                    "fromMe": false
                },
                "message": { "conversation": "ola" },
                "messageTimestamp": 1754300000i64,
                "pushName": "Maria"
            }
        });
        let env: EventEnvelope = serde_json::from_value(raw).unwrap();
        assert_eq!(env.kind(), EventKind::MessageUpsert);
        let key = env.data.key.as_ref().unwrap();
        assert_eq!(key.remote_jid, "5511999999999@s.whatsapp.net");
        assert!(!key.from_me);
        let msg = env.data.message.as_ref().unwrap();
        match msg.payload() {
            MessagePayload::Text(t) => assert_eq!(t, "ola"),
            other => panic!("expected text payload, got {other:?}"),
        }
    }

    #[test]
    fn unknown_payload_shape_is_unsupported() {
        let raw = serde_json::json!({
            "someFutureMessage": { "weird": [1, 2, 3] }
        });
        let msg: RawMessageContent = serde_json::from_value(raw).unwrap();
        match msg.payload() {
            MessagePayload::Unsupported(other) => {
                assert!(other.contains_key("someFutureMessage"));
            }
            other => panic!("expected unsupported payload, got {other:?}"),
        }
    }

    #[test]
    fn empty_message_object_is_empty_payload() {
        let msg: RawMessageContent = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(matches!(msg.payload(), MessagePayload::Empty));
    }

    #[test]
    fn reaction_payload_carries_target_key() {
        let raw = serde_json::json!({
            "reactionMessage": {
                "key": { "id": "TARGET1", "remoteJid": "5511999999999@s.whatsapp.net" },
                "text": "\u{1F44D}"
            }
        });
        let msg: RawMessageContent = serde_json::from_value(raw).unwrap();
        match msg.payload() {
            MessagePayload::Reaction(r) => {
                assert_eq!(r.key.as_ref().unwrap().id, "TARGET1");
                assert_eq!(r.text.as_deref(), Some("\u{1F44D}"));
            }
            other => panic!("expected reaction payload, got {other:?}"),
        }
    }

    #[test]
    fn revoke_protocol_message_detected() {
        let msg = ProtocolMessage {
            kind: Some("REVOKE".into()),
            key: None,
        };
        assert!(msg.is_revoke());
        let other = ProtocolMessage {
            kind: Some("EPHEMERAL_SETTING".into()),
            key: None,
        };
        assert!(!other.is_revoke());
    }

    #[test]
    fn event_kind_vocabulary() {
        assert_eq!(EventKind::parse("messages.upsert"), EventKind::MessageUpsert);
        assert_eq!(EventKind::parse("messages.update"), EventKind::MessageUpdate);
        assert_eq!(EventKind::parse("messages.delete"), EventKind::MessageDelete);
        assert_eq!(
            EventKind::parse("connection.update"),
            EventKind::ConnectionUpdate
        );
        assert_eq!(EventKind::parse("contacts.update"), EventKind::Unknown);
    }
}
