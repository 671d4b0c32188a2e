//! Qingyunke backend: the free `api.qingyunke.com` chat bot.
//!
//! Sends only the last user message; reports zero tokens.

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use serde_json::Value;
use tracing::{debug, error};

use llmgate_core::config::QingyunkeConfig;
use llmgate_core::{AttachmentDescriptor, BackendError, BackendResult};

use crate::extension::ExtensionPolicy;
use crate::openai::text_segments;
use crate::remote::RemoteClient;
use crate::traits::{BackendKind, ModelBackend};
use crate::upstream;

pub const QINGYUNKE_NAME: &str = "qingyunke";

#[derive(Debug)]
pub struct QingyunkeBackend {
    api_base: String,
    remote: RemoteClient,
}

impl QingyunkeBackend {
    pub fn new(config: &QingyunkeConfig, remote: RemoteClient) -> Self {
        Self {
            api_base: config.api_base.trim_end_matches('/').to_string(),
            remote,
        }
    }

    fn query_url(&self, message: &str) -> Result<String, BackendError> {
        let url = reqwest::Url::parse_with_params(
            &format!("{}/api.php", self.api_base),
            &[("key", "free"), ("appid", "0"), ("msg", message)],
        )
        .map_err(|e| BackendError::Transport(format!("Invalid qingyunke URL: {e}")))?;
        Ok(url.to_string())
    }
}

/// Text of the last `user` message, if any.
fn last_user_text(request: &Value) -> Option<String> {
    request
        .get("messages")?
        .as_array()?
        .iter()
        .rev()
        .find(|m| m.get("role").and_then(Value::as_str) == Some("user"))
        .and_then(|m| m.get("content"))
        .map(|c| text_segments(c).join("\n"))
        .filter(|text| !text.is_empty())
}

#[async_trait]
impl ModelBackend for QingyunkeBackend {
    fn name(&self) -> &str {
        QINGYUNKE_NAME
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Qingyunke
    }

    async fn upload_and_query(
        &self,
        request: &Value,
        attachments: &[AttachmentDescriptor],
    ) -> Result<BackendResult, BackendError> {
        ExtensionPolicy::deny_all().check_all(attachments)?;

        let message = last_user_text(request).ok_or_else(|| {
            BackendError::InvalidRequest("No user message was provided.".to_string())
        })?;

        let url = self.query_url(&message)?;
        debug!(chars = message.len(), "calling qingyunke");

        let result = self.remote.get_json(&url, &HeaderMap::new()).await?;
        if !result.is_success() {
            error!(status = result.status_code, "qingyunke API error");
            return Err(upstream::classify("Qingyunke query", &result));
        }

        let body = result.json().map_err(|e| {
            BackendError::Protocol(format!("Could not parse qingyunke response: {e}"))
        })?;
        let content = body
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                BackendError::Protocol("No 'content' field in qingyunke response.".to_string())
            })?;

        Ok(BackendResult::success(QINGYUNKE_NAME, content, 0))
    }
}
