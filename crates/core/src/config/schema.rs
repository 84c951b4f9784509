//! Configuration schema definitions
//!
//! The file only names where secrets live; it never holds them.

use serde::{Deserialize, Serialize};

/// Root configuration schema
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ConfigSchema {
    /// `[webhook]` table
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// `[tokens]` table
    #[serde(default)]
    pub tokens: TokensConfig,

    /// `[logging]` table
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Inbound webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Environment variable holding the app secret used for HMAC signatures
    #[serde(default = "default_secret_env")]
    pub secret_env: String,

    /// Header carrying the signature, `X-Hub-Signature-256` or `X-Hub-Signature`
    #[serde(default = "default_signature_header")]
    pub signature_header: String,

    /// Environment variable holding the subscription verify token
    #[serde(default = "default_verify_token_env")]
    pub verify_token_env: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret_env: default_secret_env(),
            signature_header: default_signature_header(),
            verify_token_env: default_verify_token_env(),
        }
    }
}

fn default_secret_env() -> String {
    whatrack_crypto::DEFAULT_SECRET_ENV.to_string()
}

fn default_signature_header() -> String {
    "X-Hub-Signature-256".to_string()
}

fn default_verify_token_env() -> String {
    "META_WEBHOOK_VERIFY_TOKEN".to_string()
}

/// Token-at-rest encryption configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokensConfig {
    /// Environment variable holding the 64-hex-character AES-256 key
    #[serde(default = "default_key_env")]
    pub key_env: String,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            key_env: default_key_env(),
        }
    }
}

fn default_key_env() -> String {
    whatrack_crypto::DEFAULT_KEY_ENV.to_string()
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
