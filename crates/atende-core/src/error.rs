// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Atende platform.

use thiserror::Error;

/// The primary error type used across the Atende workspace.
#[derive(Debug, Error)]
pub enum AtendeError {
    /// Configuration errors (invalid TOML, missing required fields, type mismatches).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Messaging gateway errors (send failure, side-channel fetch failure, bad payload).
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Completion service errors (API failure, model not found, malformed response).
    #[error("completion error: {message}")]
    Completion {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Media rehosting errors (transient fetch failure, durable store write failure).
    #[error("media error: {message}")]
    Media {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}
