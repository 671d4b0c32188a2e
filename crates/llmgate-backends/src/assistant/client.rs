//! OpenAI Assistants v2 over HTTP.

use std::path::Path;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::{json, Value};
use tracing::error;

use llmgate_core::config::ProviderConfig;
use llmgate_core::{BackendError, ConfigError};

use super::api::{AssistantApi, RunState, RunStatus};
use crate::openai::{api_base, auth_headers};
use crate::remote::{FilePart, RemoteCallResult, RemoteClient};
use crate::upstream;

pub struct OpenAiAssistants {
    remote: RemoteClient,
    api_base: String,
    headers: HeaderMap,
}

impl std::fmt::Debug for OpenAiAssistants {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiAssistants")
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl OpenAiAssistants {
    pub fn new(
        provider: &ProviderConfig,
        backend: &str,
        remote: RemoteClient,
    ) -> Result<Self, ConfigError> {
        let mut headers = auth_headers(provider, backend)?;
        headers.insert("openai-beta", HeaderValue::from_static("assistants=v2"));
        Ok(Self {
            remote,
            api_base: api_base(provider),
            headers,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_base, path)
    }

    /// JSON body of a successful call, or the classified failure.
    fn parse(step: &str, result: RemoteCallResult) -> Result<Value, BackendError> {
        if !result.is_success() {
            error!(
                step = step,
                status = result.status_code,
                body = %result.body,
                "assistant API error"
            );
            return Err(upstream::classify(step, &result));
        }
        result
            .json()
            .map_err(|e| BackendError::Protocol(format!("{step} returned malformed JSON: {e}")))
    }
}

fn id_of(body: &Value) -> String {
    body.get("id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}

#[async_trait]
impl AssistantApi for OpenAiAssistants {
    async fn upload_file(&self, path: &Path, file_name: &str) -> Result<String, BackendError> {
        let result = self
            .remote
            .post_multipart(
                &self.url("/files"),
                &self.headers,
                &[("purpose", "assistants")],
                FilePart {
                    field_name: "file",
                    path,
                    file_name,
                },
            )
            .await?;
        Self::parse("File upload", result).map(|body| id_of(&body))
    }

    async fn create_thread(&self, messages: &[Value]) -> Result<String, BackendError> {
        let result = self
            .remote
            .post_json(
                &self.url("/threads"),
                &self.headers,
                &json!({ "messages": messages }),
            )
            .await?;
        Self::parse("Thread creation", result).map(|body| id_of(&body))
    }

    async fn create_run(
        &self,
        thread_id: &str,
        assistant_id: &str,
    ) -> Result<String, BackendError> {
        let result = self
            .remote
            .post_json(
                &self.url(&format!("/threads/{thread_id}/runs")),
                &self.headers,
                &json!({ "assistant_id": assistant_id }),
            )
            .await?;
        Self::parse("Run creation", result).map(|body| id_of(&body))
    }

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunStatus, BackendError> {
        let result = self
            .remote
            .get_json(
                &self.url(&format!("/threads/{thread_id}/runs/{run_id}")),
                &self.headers,
            )
            .await?;
        let body = Self::parse("Run status", result)?;

        let state = body
            .get("status")
            .and_then(Value::as_str)
            .map(RunState::parse)
            .ok_or_else(|| {
                BackendError::Protocol("Run status response carried no status.".to_string())
            })?;
        let total_tokens = body
            .pointer("/usage/total_tokens")
            .and_then(Value::as_u64)
            .unwrap_or(0);

        Ok(RunStatus {
            state,
            total_tokens,
        })
    }

    async fn latest_message_id(&self, thread_id: &str) -> Result<String, BackendError> {
        let result = self
            .remote
            .get_json(
                &self.url(&format!("/threads/{thread_id}/messages")),
                &self.headers,
            )
            .await?;
        let body = Self::parse("Message listing", result)?;

        let id = body
            .get("first_id")
            .and_then(Value::as_str)
            .or_else(|| body.pointer("/data/0/id").and_then(Value::as_str))
            .unwrap_or_default();
        Ok(id.to_string())
    }

    async fn message(&self, thread_id: &str, message_id: &str) -> Result<Value, BackendError> {
        let result = self
            .remote
            .get_json(
                &self.url(&format!("/threads/{thread_id}/messages/{message_id}")),
                &self.headers,
            )
            .await?;
        Self::parse("Message retrieval", result)
    }
}
