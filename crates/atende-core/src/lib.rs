// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Atende chat operations platform.
//!
//! Provides the error type, domain enums, routable-id helpers, the typed
//! gateway event model, and the trait seams to external collaborators.

pub mod error;
pub mod event;
pub mod jid;
pub mod traits;
pub mod types;

pub use error::AtendeError;
pub use types::{
    AssignmentStrategy, ChatKind, ConnectionState, ConversationMode, ConversationStatus,
    MessageKind, MessageStatus, TicketStatus,
};

pub use traits::{
    CompletionProvider, GatewayTransport, MediaStore, RealtimeSink, WebhookSink,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_variants_construct() {
        let _config = AtendeError::Config("test".into());
        let _storage = AtendeError::Storage {
            source: Box::new(std::io::Error::other("test")),
        };
        let _gateway = AtendeError::Gateway {
            message: "test".into(),
            source: None,
        };
        let _completion = AtendeError::Completion {
            message: "test".into(),
            source: None,
        };
        let _media = AtendeError::Media {
            message: "test".into(),
            source: None,
        };
        let _timeout = AtendeError::Timeout {
            duration: std::time::Duration::from_secs(30),
        };
        let _internal = AtendeError::Internal("test".into());
    }

    #[test]
    fn error_display_carries_context() {
        let err = AtendeError::Gateway {
            message: "send failed".into(),
            source: None,
        };
        assert_eq!(err.to_string(), "gateway error: send failed");
    }
}
