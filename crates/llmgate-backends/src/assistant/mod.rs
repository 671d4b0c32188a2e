//! Assistant-protocol backend.
//!
//! One request runs strictly in order:
//! stage → transform → thread → run → poll → fetch.
//!
//! - [`api::AssistantApi`]: remote operations, implemented over HTTP by [`client::OpenAiAssistants`]
//! - `transform`: attachment upload + reference rewriting, deduplicated per request
//! - `poll`: bounded run-status polling

pub mod api;
pub mod client;
mod poll;
mod transform;

#[cfg(test)]
pub(crate) mod fake;

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{info, warn};

use llmgate_core::config::{AssistantBackendConfig, PollingConfig, ProviderConfig};
use llmgate_core::{AttachmentDescriptor, BackendError, BackendResult, ConfigError};

use crate::extension::{ExtensionPolicy, ASSISTANT_EXTENSIONS};
use crate::openai::text_segments;
use crate::remote::RemoteClient;
use crate::staging::ScratchSpace;
use crate::traits::{BackendKind, ModelBackend};

pub use api::{AssistantApi, RunState, RunStatus};
pub use client::OpenAiAssistants;

use poll::wait_for_run;
use transform::{transform_messages, Uploader};

pub struct AssistantBackend {
    name: String,
    model_used: String,
    assistant_id: Option<String>,
    policy: ExtensionPolicy,
    api: Arc<dyn AssistantApi>,
    scratch_root: PathBuf,
    polling: PollingConfig,
}

impl AssistantBackend {
    pub fn new(
        name: &str,
        config: &AssistantBackendConfig,
        api: Arc<dyn AssistantApi>,
        scratch_root: PathBuf,
        polling: PollingConfig,
    ) -> Self {
        let policy = match &config.allowed_extensions {
            Some(list) => ExtensionPolicy::new(list),
            None => ExtensionPolicy::new(ASSISTANT_EXTENSIONS),
        };
        let assistant_id = Some(config.assistant_id.trim().to_string()).filter(|id| !id.is_empty());

        Self {
            name: name.to_string(),
            model_used: config
                .model_used
                .clone()
                .unwrap_or_else(|| name.to_string()),
            assistant_id,
            policy,
            api,
            scratch_root,
            polling,
        }
    }

    /// Backend talking to the OpenAI Assistants API.
    pub fn openai(
        name: &str,
        config: &AssistantBackendConfig,
        provider: &ProviderConfig,
        remote: RemoteClient,
        scratch_root: PathBuf,
        polling: PollingConfig,
    ) -> Result<Self, ConfigError> {
        let api = OpenAiAssistants::new(provider, name, remote)?;
        Ok(Self::new(name, config, Arc::new(api), scratch_root, polling))
    }

    pub fn policy(&self) -> &ExtensionPolicy {
        &self.policy
    }

    /// Request `assistant_id` wins over the configured one.
    fn resolve_assistant_id(&self, request: &Value) -> Result<String, BackendError> {
        request
            .get("assistant_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .or_else(|| self.assistant_id.clone())
            .ok_or_else(|| {
                ConfigError::MissingAssistantId {
                    backend: self.name.clone(),
                }
                .into()
            })
    }
}

/// The request's message list; absent means empty.
fn request_messages(request: &Value) -> Result<Vec<Value>, BackendError> {
    match request.get("messages") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(items.clone()),
        Some(_) => Err(BackendError::InvalidRequest(
            "'messages' must be an array.".to_string(),
        )),
    }
}

#[async_trait]
impl ModelBackend for AssistantBackend {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Assistant
    }

    async fn upload_and_query(
        &self,
        request: &Value,
        attachments: &[AttachmentDescriptor],
    ) -> Result<BackendResult, BackendError> {
        info!(
            backend = %self.name,
            attachments = attachments.len(),
            "assistant request"
        );

        // Stage
        self.policy.check_all(attachments)?;
        let mut messages = request_messages(request)?;
        if messages.is_empty() {
            warn!(backend = %self.name, "request carries no messages; creating an empty thread");
        }
        let assistant_id = self.resolve_assistant_id(request)?;
        let mut scratch = ScratchSpace::stage(&self.scratch_root, attachments).await?;

        // Transform
        let mut uploader = Uploader::new(
            self.api.as_ref(),
            &mut scratch,
            self.polling.upload_attempts,
            self.polling.interval(),
        );
        transform_messages(&mut messages, &mut uploader).await?;
        let produced = uploader.into_produced();
        drop(scratch);

        // Thread
        let thread_id = self.api.create_thread(&messages).await?;
        if thread_id.is_empty() {
            return Err(BackendError::Protocol(
                "Failed to create thread: the response carried no thread id.".to_string(),
            ));
        }

        // Run
        let run_id = self.api.create_run(&thread_id, &assistant_id).await?;
        if run_id.is_empty() {
            return Err(BackendError::Protocol(
                "Failed to create run: the response carried no run id.".to_string(),
            ));
        }
        info!(backend = %self.name, thread = %thread_id, run = %run_id, "run started");

        // Poll
        let tokens = wait_for_run(self.api.as_ref(), &thread_id, &run_id, &self.polling).await?;

        // Fetch
        let message_id = self.api.latest_message_id(&thread_id).await?;
        if message_id.is_empty() {
            return Err(BackendError::Protocol(
                "Failed to retrieve the last message id.".to_string(),
            ));
        }
        let message = self.api.message(&thread_id, &message_id).await?;
        let segments = message.get("content").map(text_segments).unwrap_or_default();
        if segments.is_empty() {
            return Err(BackendError::Protocol(
                "Failed to retrieve the final assistant message.".to_string(),
            ));
        }

        info!(backend = %self.name, tokens, files = produced.len(), "assistant run completed");
        Ok(BackendResult::success(&self.model_used, segments.join("\n"), tokens)
            .with_file_ids(produced))
    }
}
