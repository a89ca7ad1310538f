// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP clients for the platform's external collaborators: the messaging
//! gateway ([`atende_core::GatewayTransport`]) and the text-completion
//! service ([`atende_core::CompletionProvider`]).

pub mod client;
pub mod completion;
pub mod types;

pub use client::HttpGateway;
pub use completion::HttpCompletion;
