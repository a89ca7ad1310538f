// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification surfaces: the realtime broadcast hub consumed by the UI
//! collaborator and the outbound webhook client for the signed-retry
//! dispatcher. Both are best-effort, at-least-once; consumers must be
//! idempotent.

pub mod realtime;
pub mod webhook;

pub use realtime::RealtimeHub;
pub use webhook::WebhookClient;
