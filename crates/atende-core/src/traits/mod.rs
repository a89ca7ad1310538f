// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Trait seams to the platform's external collaborators.
//!
//! The core treats the messaging gateway, the completion service, durable
//! media storage, and the realtime/webhook fan-out as collaborators behind
//! traits; production adapters live in their own crates, mocks in
//! `atende-test-utils`.

pub mod completion;
pub mod media;
pub mod notify;
pub mod transport;

pub use completion::{CompletionProvider, CompletionRequest, CompletionResponse, DialogueRole, DialogueTurn};
pub use media::MediaStore;
pub use notify::{RealtimeEvent, RealtimeSink, WebhookSink};
pub use transport::{GatewayTransport, GroupMetadata, OutboundMedia, OutboundText};
