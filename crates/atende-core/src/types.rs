// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Atende workspace.
//!
//! The string-typed states of the platform (conversation mode, delivery
//! status, ticket status) are closed enums here. `MessageStatus` derives
//! `Ord` so its declaration order IS the receipt priority table.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Delivery status of a message.
///
/// Declaration order defines the rank used by the monotonic receipt rule:
/// an update is applied only when the new status is strictly greater.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
    Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Error,
    Pending,
    Sending,
    Sent,
    Delivered,
    Read,
}

impl MessageStatus {
    /// Numeric rank, 0 (error) through 5 (read).
    pub fn rank(self) -> u8 {
        self as u8
    }

    /// Maps the gateway's receipt vocabulary onto the ranked set.
    ///
    /// Unknown vocabulary yields `None` and the receipt is dropped with a
    /// diagnostic log at the call site.
    pub fn from_gateway(raw: &str) -> Option<Self> {
        match raw.to_ascii_uppercase().as_str() {
            "ERROR" => Some(Self::Error),
            "PENDING" => Some(Self::Pending),
            "SENDING" => Some(Self::Sending),
            "SERVER_ACK" | "SENT" => Some(Self::Sent),
            "DELIVERY_ACK" | "DELIVERED" => Some(Self::Delivered),
            "READ" | "PLAYED" => Some(Self::Read),
            _ => None,
        }
    }
}

/// Who owns the next reply in a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    /// Automation replies to every qualifying customer message.
    Ai,
    /// Automation never replies.
    Human,
    /// Automation waits out a per-sector timeout before replying.
    Hybrid,
}

/// Lifecycle status of a conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Active,
    Resolved,
}

/// Lifecycle status of a support ticket.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TicketStatus {
    Open,
    InProgress,
    Reopened,
    Closed,
}

impl TicketStatus {
    /// The "active" subset: at most one ticket in this subset may exist per
    /// conversation at any time.
    pub fn is_active(self) -> bool {
        !matches!(self, TicketStatus::Closed)
    }
}

/// Agent assignment strategy for an assignment rule.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStrategy {
    Fixed,
    RoundRobin,
}

/// Connection state of a channel instance, toggled by gateway
/// connection-state-change events.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Connecting,
    Open,
    Close,
}

impl ConnectionState {
    /// Maps the gateway's connection vocabulary.
    pub fn from_gateway(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "connecting" => Some(Self::Connecting),
            "open" => Some(Self::Open),
            "close" | "closed" => Some(Self::Close),
            _ => None,
        }
    }
}

/// Normalized message type tag.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Text,
    Image,
    Video,
    Audio,
    Document,
    Sticker,
    Location,
    Contact,
    Poll,
    Interactive,
    System,
    Unsupported,
}

/// Whether a conversation is with an individual or a group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChatKind {
    Individual,
    Group,
}
