// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Assignment and auto-ticketing policy engines for the Atende platform.
//!
//! Both engines run after a contact-originated message has been durably
//! persisted; their failures are logged by the ingestion pipeline and
//! never prevent the message from surfacing.

pub mod assign;
pub mod template;
pub mod ticket;

pub use assign::AssignmentEngine;
pub use template::{TemplateContext, render};
pub use ticket::{TicketManager, destination_for};
