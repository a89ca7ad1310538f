// SPDX-FileCopyrightText: 2026 Atende Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Atende platform.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Atende configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AtendeConfig {
    /// Platform identity and logging.
    #[serde(default)]
    pub platform: PlatformConfig,

    /// Inbound webhook server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Messaging gateway client settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Text-completion service settings.
    #[serde(default)]
    pub completion: CompletionConfig,

    /// Outbound webhook dispatcher settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Media rehosting settings.
    #[serde(default)]
    pub media: MediaConfig,

    /// Response arbiter settings.
    #[serde(default)]
    pub arbiter: ArbiterConfig,
}

/// Platform identity and logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct PlatformConfig {
    /// Display name used as the default agent-name header on automated replies.
    #[serde(default = "default_platform_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            name: default_platform_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_platform_name() -> String {
    "atende".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Inbound webhook server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Address to bind the webhook server to.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8085
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("atende").join("atende.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("atende.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Messaging gateway client configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Base URL of the gateway's HTTP API.
    #[serde(default = "default_gateway_base_url")]
    pub base_url: String,

    /// API key sent on every gateway request. `None` disables auth.
    #[serde(default)]
    pub api_key: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_gateway_timeout_secs")]
    pub timeout_secs: u64,

    /// CDN hosts whose media URLs expire and must be rehosted.
    #[serde(default = "default_transient_hosts")]
    pub transient_hosts: Vec<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: default_gateway_base_url(),
            api_key: None,
            timeout_secs: default_gateway_timeout_secs(),
            transient_hosts: default_transient_hosts(),
        }
    }
}

impl GatewayConfig {
    /// True when the URL points at a CDN host whose content expires and
    /// must be rehosted.
    pub fn is_transient_url(&self, url: &str) -> bool {
        let host = url
            .strip_prefix("https://")
            .or_else(|| url.strip_prefix("http://"))
            .unwrap_or(url);
        let host = host.split(['/', ':']).next().unwrap_or(host);
        self.transient_hosts.iter().any(|t| host == t)
    }
}

fn default_gateway_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_gateway_timeout_secs() -> u64 {
    15
}

fn default_transient_hosts() -> Vec<String> {
    vec![
        "mmg.whatsapp.net".to_string(),
        "cdn.whatsapp.net".to_string(),
    ]
}

/// Text-completion service configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CompletionConfig {
    /// Completion API endpoint.
    #[serde(default = "default_completion_base_url")]
    pub base_url: String,

    /// API key. `None` requires the environment variable.
    #[serde(default)]
    pub api_key: Option<String>,

    /// API version header.
    #[serde(default = "default_completion_api_version")]
    pub api_version: String,

    /// Per-request timeout in seconds.
    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            base_url: default_completion_base_url(),
            api_key: None,
            api_version: default_completion_api_version(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

fn default_completion_base_url() -> String {
    "https://api.anthropic.com/v1/messages".to_string()
}

fn default_completion_api_version() -> String {
    "2023-06-01".to_string()
}

fn default_completion_timeout_secs() -> u64 {
    120
}

/// Outbound webhook dispatcher configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Endpoint of the signed-retry dispatcher. `None` disables webhooks.
    #[serde(default)]
    pub url: Option<String>,

    /// Per-request timeout in seconds.
    #[serde(default = "default_webhook_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: default_webhook_timeout_secs(),
        }
    }
}

fn default_webhook_timeout_secs() -> u64 {
    10
}

/// Media rehosting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MediaConfig {
    /// Directory backing the durable media store.
    #[serde(default = "default_media_dir")]
    pub dir: String,

    /// Local ephemeral directory used when the durable store fails.
    #[serde(default = "default_media_fallback_dir")]
    pub fallback_dir: String,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            dir: default_media_dir(),
            fallback_dir: default_media_fallback_dir(),
        }
    }
}

fn default_media_dir() -> String {
    dirs::data_dir()
        .map(|p| p.join("atende").join("media"))
        .unwrap_or_else(|| std::path::PathBuf::from("media"))
        .to_string_lossy()
        .into_owned()
}

fn default_media_fallback_dir() -> String {
    std::env::temp_dir()
        .join("atende-media")
        .to_string_lossy()
        .into_owned()
}

/// Response arbiter configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ArbiterConfig {
    /// Interval of the periodic hybrid sweep, in seconds.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Number of dialogue turns fed to the completion service.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,

    /// Maximum tokens per generated reply.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self {
            sweep_interval_secs: default_sweep_interval_secs(),
            history_limit: default_history_limit(),
            max_tokens: default_max_tokens(),
        }
    }
}

fn default_sweep_interval_secs() -> u64 {
    60
}

fn default_history_limit() -> usize {
    20
}

fn default_max_tokens() -> u32 {
    1024
}
