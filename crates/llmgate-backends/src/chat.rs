//! Chat-completions backend: one `POST /chat/completions` per request.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error};

use llmgate_core::config::{ChatBackendConfig, ProviderConfig};
use llmgate_core::{AttachmentDescriptor, BackendError, BackendResult, ConfigError};

use crate::extension::ExtensionPolicy;
use crate::openai::{api_base, auth_headers, text_segments};
use crate::remote::RemoteClient;
use crate::traits::{BackendKind, ModelBackend};
use crate::upstream;

const DEFAULT_REASONING_EFFORT: &str = "high";

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    #[serde(default)]
    total_tokens: u64,
}

pub struct ChatBackend {
    name: String,
    model: String,
    reasoning_effort: String,
    policy: ExtensionPolicy,
    remote: RemoteClient,
    url: String,
    headers: HeaderMap,
}

impl std::fmt::Debug for ChatBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatBackend")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("url", &self.url)
            .finish()
    }
}

impl ChatBackend {
    pub fn new(
        name: &str,
        config: &ChatBackendConfig,
        provider: &ProviderConfig,
        remote: RemoteClient,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            name: name.to_string(),
            model: config.model.clone(),
            reasoning_effort: config
                .reasoning_effort
                .clone()
                .unwrap_or_else(|| DEFAULT_REASONING_EFFORT.to_string()),
            policy: ExtensionPolicy::new(&config.allowed_extensions),
            remote,
            url: format!("{}/chat/completions", api_base(provider)),
            headers: auth_headers(provider, name)?,
        })
    }

    /// Build the upstream body: `{model, reasoning_effort, messages}` with
    /// every message flattened to `{role, content: "<text>"}`.
    fn build_body(&self, request: &Value) -> Result<Value, BackendError> {
        let messages = match request.get("messages") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => items
                .iter()
                .map(|m| {
                    let role = m.get("role").and_then(Value::as_str).unwrap_or("user");
                    let content = m
                        .get("content")
                        .map(|c| text_segments(c).join("\n"))
                        .unwrap_or_default();
                    json!({ "role": role, "content": content })
                })
                .collect(),
            Some(_) => {
                return Err(BackendError::InvalidRequest(
                    "'messages' must be an array.".to_string(),
                ))
            }
        };

        let effort = request
            .get("reasoning_effort")
            .and_then(Value::as_str)
            .unwrap_or(self.reasoning_effort.as_str());

        Ok(json!({
            "model": self.model,
            "reasoning_effort": effort,
            "messages": messages,
        }))
    }
}

#[async_trait]
impl ModelBackend for ChatBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Chat
    }

    async fn upload_and_query(
        &self,
        request: &Value,
        attachments: &[AttachmentDescriptor],
    ) -> Result<BackendResult, BackendError> {
        self.policy.check_all(attachments)?;
        let body = self.build_body(request)?;

        debug!(backend = %self.name, model = %self.model, "calling chat completions");

        let result = self.remote.post_json(&self.url, &self.headers, &body).await?;
        if !result.is_success() {
            error!(
                backend = %self.name,
                status = result.status_code,
                body = %result.body,
                "API error"
            );
            return Err(upstream::classify("Chat completion", &result));
        }

        let parsed: CompletionResponse = serde_json::from_str(&result.body).map_err(|e| {
            BackendError::Protocol(format!("Could not parse chat completion response: {e}"))
        })?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| {
                BackendError::Protocol("Chat completion response carried no message.".to_string())
            })?;
        let tokens = parsed.usage.map(|u| u.total_tokens).unwrap_or(0);

        Ok(BackendResult::success(&self.name, text, tokens))
    }
}
