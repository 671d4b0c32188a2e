//! Configuration schema.
//!
//! Hierarchy: `Config` → `ServerConfig`, `ProvidersConfig`, `BackendsConfig`,
//! `PollingConfig`, `LoggingConfig`.
//!
//! Keys are camelCase on disk (`scratchDir`, `assistantId`, ...) and every
//! section falls back to its defaults field by field.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use crate::error::ConfigError;

// ─────────────────────────────────────────────
// Root Config
// ─────────────────────────────────────────────

/// Root configuration: loaded from `~/.llmgate/config.json` + env vars.
///
/// Read once at startup and shared read-only afterwards.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub server: ServerConfig,
    pub providers: ProvidersConfig,
    pub backends: BackendsConfig,
    pub polling: PollingConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Check that every declared backend has the credentials and identifiers
    /// it needs. A failure here means the service must not start.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, assistant) in &self.backends.assistants {
            if !self.providers.openai.is_configured() {
                return Err(ConfigError::MissingCredential {
                    backend: name.clone(),
                    field: "providers.openai.apiKey",
                });
            }
            if assistant.assistant_id.trim().is_empty() {
                return Err(ConfigError::MissingAssistantId {
                    backend: name.clone(),
                });
            }
        }

        for (name, chat) in &self.backends.chat {
            if !self.providers.openai.is_configured() {
                return Err(ConfigError::MissingCredential {
                    backend: name.clone(),
                    field: "providers.openai.apiKey",
                });
            }
            if chat.model.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "chat backend '{name}' has an empty model"
                )));
            }
        }

        if self.polling.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "polling.maxAttempts must be at least 1".to_string(),
            ));
        }
        if self.polling.upload_attempts == 0 {
            return Err(ConfigError::Invalid(
                "polling.uploadAttempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

// ─────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────

/// HTTP listener and scratch storage settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Directory where attachments are staged before upload (`~` is expanded).
    pub scratch_dir: String,
    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            scratch_dir: crate::utils::get_default_scratch_path()
                .to_string_lossy()
                .into_owned(),
            max_body_bytes: 64 * 1024 * 1024,
        }
    }
}

// ─────────────────────────────────────────────
// Providers
// ─────────────────────────────────────────────

/// Credentials and endpoint for one upstream API.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProviderConfig {
    /// API key for authentication.
    #[serde(default)]
    pub api_key: String,
    /// Custom API base URL (overrides the provider default).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,
    /// Extra HTTP headers to send with each request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extra_headers: Option<HashMap<String, String>>,
}

impl ProviderConfig {
    /// Whether this provider has a configured API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }
}

/// All upstream provider credentials.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderConfig,
}

// ─────────────────────────────────────────────
// Backends
// ─────────────────────────────────────────────

/// Which backends get registered at startup, keyed by the request's model name.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BackendsConfig {
    /// Register the built-in canned backends (`echo-backend`, `openai-o1`, ...).
    pub canned: bool,
    /// Assistant-protocol backends, e.g. `"gpt4o"`.
    pub assistants: BTreeMap<String, AssistantBackendConfig>,
    /// Single-call chat-completions backends, e.g. `"o3-mini"`.
    pub chat: BTreeMap<String, ChatBackendConfig>,
    #[serde(default)]
    pub qingyunke: QingyunkeConfig,
}

impl Default for BackendsConfig {
    fn default() -> Self {
        Self {
            canned: true,
            assistants: BTreeMap::new(),
            chat: BTreeMap::new(),
            qingyunke: QingyunkeConfig::default(),
        }
    }
}

/// One assistant-protocol backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AssistantBackendConfig {
    /// Remote assistant identifier (e.g. `"asst_abc123"`). Required.
    pub assistant_id: String,
    /// Value reported as `model` in responses; defaults to the backend name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_used: Option<String>,
    /// Accepted attachment extensions; defaults to the assistant file-search set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_extensions: Option<Vec<String>>,
}

/// One chat-completions backend.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ChatBackendConfig {
    /// Upstream model id (e.g. `"o3-mini"`).
    pub model: String,
    /// Default reasoning effort, overridable per request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning_effort: Option<String>,
    /// Accepted attachment extensions (none by default).
    pub allowed_extensions: Vec<String>,
}

/// The free Qingyunke chat API.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct QingyunkeConfig {
    pub enabled: bool,
    pub api_base: String,
}

impl Default for QingyunkeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_base: "http://api.qingyunke.com".to_string(),
        }
    }
}

// ─────────────────────────────────────────────
// Polling
// ─────────────────────────────────────────────

/// Retry budget for multi-step remote protocols.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PollingConfig {
    /// Delay between run-status polls, in milliseconds.
    pub interval_ms: u64,
    /// Maximum number of run-status polls.
    pub max_attempts: u32,
    /// Maximum attempts per file upload.
    pub upload_attempts: u32,
}

impl PollingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            interval_ms: 1000,
            max_attempts: 120,
            upload_attempts: 3,
        }
    }
}

// ─────────────────────────────────────────────
// Logging
// ─────────────────────────────────────────────

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset.
    pub level: String,
    /// Emit JSON lines instead of the compact format.
    pub json: bool,
    /// How many recent log lines `/api/v1/logs` can return.
    pub buffer_lines: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            buffer_lines: 1000,
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
