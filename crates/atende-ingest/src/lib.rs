// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound event ingestion for the Atende platform.
//!
//! One gateway event per invocation, safe under concurrent and duplicate
//! delivery: identity resolution, payload normalization, media rehosting,
//! idempotent persistence, status reconciliation, and the post-persistence
//! policy chain (assignment, auto-ticketing, response arbitration).

pub mod identity;
pub mod media;
pub mod normalize;
pub mod pipeline;
pub mod status;

pub use identity::IdentityResolver;
pub use media::{FsMediaStore, MediaRehoster};
pub use normalize::{NormalizedMessage, normalize};
pub use pipeline::IngestionPipeline;
pub use status::StatusReconciler;
