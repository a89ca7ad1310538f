// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Durable media storage trait (put/get/signed-URL service, external).

use async_trait::async_trait;

use crate::error::AtendeError;

/// Durable object storage for rehosted media.
#[async_trait]
pub trait MediaStore: Send + Sync {
    /// Writes bytes under a stable key and returns the durable reference
    /// (URL or path) to store in place of the transient one.
    async fn put(&self, key: &str, bytes: &[u8], mime_type: &str) -> Result<String, AtendeError>;
}
