// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Outbound transport trait for the external messaging gateway.

use async_trait::async_trait;

use crate::error::AtendeError;

/// An outbound text send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundText {
    /// Destination routable id.
    pub to: String,
    pub text: String,
    /// Gateway id of the message being replied to, if any.
    pub quoted_id: Option<String>,
}

/// An outbound media send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMedia {
    pub to: String,
    pub url: String,
    pub mime_type: String,
    pub caption: Option<String>,
}

/// Group display metadata from the gateway side-channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GroupMetadata {
    pub subject: Option<String>,
    pub picture_url: Option<String>,
}

/// Client for the external messaging gateway.
///
/// All calls carry a bounded timeout; implementations retry once on
/// transient failures. Group text sends fall back to the secondary
/// transport path inside the implementation before the attempt is
/// reported as failed.
#[async_trait]
pub trait GatewayTransport: Send + Sync {
    /// Sends a text message, returning the gateway id of the sent message.
    async fn send_text(&self, instance: &str, out: &OutboundText) -> Result<String, AtendeError>;

    /// Sends a media message, returning the gateway id of the sent message.
    async fn send_media(&self, instance: &str, out: &OutboundMedia)
    -> Result<String, AtendeError>;

    /// Side-channel fetch of a message's media bytes.
    async fn fetch_media(
        &self,
        instance: &str,
        gateway_message_id: &str,
    ) -> Result<Vec<u8>, AtendeError>;

    /// Best-effort group metadata lookup; `Ok(None)` when the gateway has
    /// nothing for the group.
    async fn group_metadata(
        &self,
        instance: &str,
        group_jid: &str,
    ) -> Result<Option<GroupMetadata>, AtendeError>;
}
