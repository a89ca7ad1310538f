// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Response arbiter for the Atende platform: decides whether an automated
//! agent or a human owns the next reply, generates replies through the
//! completion service, and re-evaluates hybrid conversations on a
//! periodic sweep.

pub mod arbiter;
pub mod hours;
pub mod prompt;
pub mod sweep;

pub use arbiter::{ArbiterSettings, ReplyOutcome, ResponseArbiter, SweepStats};
pub use sweep::spawn_sweep;
