//! Shared OpenAI plumbing: API base resolution, auth headers, and text
//! extraction from OpenAI-shaped message content.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION};
use serde_json::Value;
use tracing::warn;

use llmgate_core::config::ProviderConfig;
use llmgate_core::ConfigError;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Configured API base without a trailing slash.
pub fn api_base(config: &ProviderConfig) -> String {
    config
        .api_base
        .as_deref()
        .unwrap_or(DEFAULT_API_BASE)
        .trim_end_matches('/')
        .to_string()
}

/// Bearer auth plus any configured extra headers.
///
/// Invalid extra headers are skipped with a warning; an API key that cannot
/// be sent as a header value is a configuration error.
pub fn auth_headers(config: &ProviderConfig, backend: &str) -> Result<HeaderMap, ConfigError> {
    if !config.is_configured() {
        return Err(ConfigError::MissingCredential {
            backend: backend.to_string(),
            field: "providers.openai.apiKey",
        });
    }

    let mut headers = HeaderMap::new();
    let bearer = HeaderValue::from_str(&format!("Bearer {}", config.api_key)).map_err(|_| {
        ConfigError::Invalid(format!(
            "providers.openai.apiKey for backend '{backend}' contains invalid characters"
        ))
    })?;
    headers.insert(AUTHORIZATION, bearer);

    if let Some(ref extra) = config.extra_headers {
        for (key, value) in extra {
            if let (Ok(name), Ok(val)) = (
                HeaderName::from_bytes(key.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.insert(name, val);
            } else {
                warn!("Invalid header: {}={}", key, value);
            }
        }
    }

    Ok(headers)
}

/// Text segments of a message `content` value, in order.
///
/// Accepts a plain string, chat-style parts (`{"type":"text","text":"..."}`)
/// and assistant-style parts (`{"type":"text","text":{"value":"..."}}`).
pub fn text_segments(content: &Value) -> Vec<String> {
    match content {
        Value::String(s) => vec![s.clone()],
        Value::Array(parts) => parts
            .iter()
            .filter(|part| part.get("type").and_then(Value::as_str) == Some("text"))
            .filter_map(|part| match part.get("text") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(obj) => obj.get("value").and_then(Value::as_str).map(String::from),
                None => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}
