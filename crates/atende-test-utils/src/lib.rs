// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Atende integration tests: mock adapters over the
//! core trait seams, collecting sinks, and fixture/event builders.

pub mod harness;
pub mod mock_completion;
pub mod mock_gateway;
pub mod sinks;

pub use harness::{
    EventBuilder, agent_config_fixture, connection_event, round_robin_rule_fixture,
    sector_fixture, temp_database,
};
pub use mock_completion::MockCompletion;
pub use mock_gateway::{MockGateway, SentMessage};
pub use sinks::{CollectingRealtime, CollectingWebhook, MemoryMediaStore};
