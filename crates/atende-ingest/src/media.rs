// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Media rehosting: transient gateway CDN references are fetched and
//! republished to durable storage under a stable key.
//!
//! Ordered fallback, never fatal to the enclosing ingestion: durable
//! store, then local ephemeral disk, then keep the original (possibly
//! expiring) URL. The message is persisted regardless of the outcome.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use atende_config::model::{GatewayConfig, MediaConfig};
use atende_core::AtendeError;
use atende_core::traits::media::MediaStore;
use atende_core::traits::transport::GatewayTransport;

/// Filesystem-backed implementation of the durable media store seam.
pub struct FsMediaStore {
    dir: PathBuf,
}

impl FsMediaStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

#[async_trait]
impl MediaStore for FsMediaStore {
    async fn put(&self, key: &str, bytes: &[u8], _mime_type: &str) -> Result<String, AtendeError> {
        let path = self.dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AtendeError::Media {
                    message: format!("failed to create media directory: {e}"),
                    source: Some(Box::new(e)),
                })?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AtendeError::Media {
                message: format!("failed to write media object: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// Fetches transient media and republishes it durably.
pub struct MediaRehoster {
    transport: Arc<dyn GatewayTransport>,
    store: Arc<dyn MediaStore>,
    http: reqwest::Client,
    gateway_config: GatewayConfig,
    fallback_dir: PathBuf,
}

impl MediaRehoster {
    pub fn new(
        transport: Arc<dyn GatewayTransport>,
        store: Arc<dyn MediaStore>,
        gateway_config: GatewayConfig,
        media_config: &MediaConfig,
    ) -> Result<Self, AtendeError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(gateway_config.timeout_secs))
            .build()
            .map_err(|e| AtendeError::Media {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            transport,
            store,
            http,
            gateway_config,
            fallback_dir: PathBuf::from(&media_config.fallback_dir),
        })
    }

    /// Rehost a media reference if it is transient. Returns the reference
    /// to persist; errors never escape.
    pub async fn rehost(
        &self,
        instance: &str,
        gateway_message_id: &str,
        url: &str,
        mime_type: &str,
    ) -> String {
        if !self.gateway_config.is_transient_url(url) {
            return url.to_string();
        }

        let bytes = match self.fetch(instance, gateway_message_id, url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(
                    gateway_message_id,
                    error = %e,
                    "media fetch failed, keeping original reference"
                );
                return url.to_string();
            }
        };

        let key = format!(
            "{instance}/{gateway_message_id}{}",
            extension_for(mime_type)
        );

        match self.store.put(&key, &bytes, mime_type).await {
            Ok(reference) => {
                debug!(gateway_message_id, key, "media rehosted durably");
                return reference;
            }
            Err(e) => {
                warn!(
                    gateway_message_id,
                    error = %e,
                    "durable media store failed, trying local disk"
                );
            }
        }

        match self.write_local(&key, &bytes).await {
            Ok(path) => {
                debug!(gateway_message_id, path, "media written to local fallback");
                path
            }
            Err(e) => {
                warn!(
                    gateway_message_id,
                    error = %e,
                    "local media fallback failed, keeping original reference"
                );
                url.to_string()
            }
        }
    }

    /// Side-channel fetch first, direct HTTP GET second.
    async fn fetch(
        &self,
        instance: &str,
        gateway_message_id: &str,
        url: &str,
    ) -> Result<Vec<u8>, AtendeError> {
        match self.transport.fetch_media(instance, gateway_message_id).await {
            Ok(bytes) if !bytes.is_empty() => return Ok(bytes),
            Ok(_) => debug!(gateway_message_id, "side-channel returned no bytes"),
            Err(e) => debug!(gateway_message_id, error = %e, "side-channel fetch failed"),
        }

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| AtendeError::Media {
                message: format!("media GET failed: {e}"),
                source: Some(Box::new(e)),
            })?;
        if !response.status().is_success() {
            return Err(AtendeError::Media {
                message: format!("media GET returned {}", response.status()),
                source: None,
            });
        }
        let bytes = response.bytes().await.map_err(|e| AtendeError::Media {
            message: format!("media body read failed: {e}"),
            source: Some(Box::new(e)),
        })?;
        Ok(bytes.to_vec())
    }

    async fn write_local(&self, key: &str, bytes: &[u8]) -> Result<String, AtendeError> {
        let path = self.fallback_dir.join(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AtendeError::Media {
                    message: format!("failed to create fallback directory: {e}"),
                    source: Some(Box::new(e)),
                })?;
        }
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| AtendeError::Media {
                message: format!("failed to write fallback media: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(path.to_string_lossy().into_owned())
    }
}

/// File extension for a mime type; falls back to `.bin`.
fn extension_for(mime_type: &str) -> &'static str {
    match mime_type.split(';').next().unwrap_or(mime_type).trim() {
        "image/jpeg" => ".jpg",
        "image/png" => ".png",
        "image/webp" => ".webp",
        "image/gif" => ".gif",
        "video/mp4" => ".mp4",
        "audio/ogg" => ".ogg",
        "audio/mpeg" => ".mp3",
        "application/pdf" => ".pdf",
        _ => ".bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use atende_test_utils::{MemoryMediaStore, MockGateway};
    use tempfile::tempdir;

    fn gateway_config() -> GatewayConfig {
        GatewayConfig {
            transient_hosts: vec!["mmg.whatsapp.net".to_string()],
            ..GatewayConfig::default()
        }
    }

    fn media_config(fallback: &std::path::Path) -> MediaConfig {
        MediaConfig {
            dir: fallback.join("store").to_string_lossy().into_owned(),
            fallback_dir: fallback.join("fallback").to_string_lossy().into_owned(),
        }
    }

    #[tokio::test]
    async fn stable_host_is_left_alone() {
        let dir = tempdir().unwrap();
        let gateway = MockGateway::new();
        let store = MemoryMediaStore::new();
        let rehoster = MediaRehoster::new(
            gateway,
            store.clone(),
            gateway_config(),
            &media_config(dir.path()),
        )
        .unwrap();

        let reference = rehoster
            .rehost("main", "GW-1", "https://media.example.com/a.jpg", "image/jpeg")
            .await;
        assert_eq!(reference, "https://media.example.com/a.jpg");
        assert!(store.keys().is_empty());
    }

    #[tokio::test]
    async fn transient_media_is_rehosted_via_side_channel() {
        let dir = tempdir().unwrap();
        let gateway = MockGateway::new();
        gateway.set_media(vec![1, 2, 3]).await;
        let store = MemoryMediaStore::new();
        let rehoster = MediaRehoster::new(
            gateway,
            store.clone(),
            gateway_config(),
            &media_config(dir.path()),
        )
        .unwrap();

        let reference = rehoster
            .rehost("main", "GW-1", "https://mmg.whatsapp.net/v/abc", "image/jpeg")
            .await;
        assert_eq!(reference, "durable://main/GW-1.jpg");
        assert_eq!(store.keys(), vec!["main/GW-1.jpg".to_string()]);
    }

    #[tokio::test]
    async fn store_failure_falls_back_to_local_disk() {
        let dir = tempdir().unwrap();
        let gateway = MockGateway::new();
        gateway.set_media(vec![9, 9]).await;
        let store = MemoryMediaStore::new();
        store.set_fail(true);
        let rehoster = MediaRehoster::new(
            gateway,
            store,
            gateway_config(),
            &media_config(dir.path()),
        )
        .unwrap();

        let reference = rehoster
            .rehost("main", "GW-2", "https://mmg.whatsapp.net/v/abc", "image/png")
            .await;
        assert!(reference.ends_with("GW-2.png"), "got {reference}");
        assert!(std::path::Path::new(&reference).exists());
    }

    #[tokio::test]
    async fn total_failure_keeps_the_original_url() {
        let dir = tempdir().unwrap();
        // No scripted media and an unreachable URL: fetch fails entirely.
        let gateway = MockGateway::new();
        let store = MemoryMediaStore::new();
        let mut config = gateway_config();
        config.transient_hosts = vec!["127.0.0.1".to_string()];
        config.timeout_secs = 1;
        let rehoster =
            MediaRehoster::new(gateway, store, config, &media_config(dir.path())).unwrap();

        let url = "http://127.0.0.1:9/unreachable.jpg";
        let reference = rehoster.rehost("main", "GW-3", url, "image/jpeg").await;
        assert_eq!(reference, url);
    }

    #[test]
    fn mime_extensions() {
        assert_eq!(extension_for("image/jpeg"), ".jpg");
        assert_eq!(extension_for("audio/ogg; codecs=opus"), ".ogg");
        assert_eq!(extension_for("application/x-unknown"), ".bin");
    }
}
