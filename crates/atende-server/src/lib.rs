// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook server for the Atende platform: consumes gateway
//! events over HTTP and exposes the realtime stream and a health
//! endpoint.

pub mod handlers;
pub mod server;

pub use server::{AppState, ServerConfig, router, start_server};
