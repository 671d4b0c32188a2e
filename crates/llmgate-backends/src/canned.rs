//! Canned backends: fixed answers, no remote calls.
//!
//! Useful for smoke-testing a deployment end to end without credentials.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use llmgate_core::{AttachmentDescriptor, BackendError, BackendResult};

use crate::extension::ExtensionPolicy;
use crate::traits::{BackendKind, ModelBackend};

/// Static description of one canned backend.
#[derive(Debug)]
pub struct CannedSpec {
    /// Model name, e.g. `"echo-backend"`.
    pub name: &'static str,
    /// Reply text returned for every request.
    pub text: &'static str,
    /// Token count reported for every request.
    pub tokens: u64,
    /// Whether attachments are ignored (`true`) or rejected (`false`).
    pub accepts_files: bool,
}

pub static CANNED: &[CannedSpec] = &[
    CannedSpec {
        name: "echo-backend",
        text: "Hello from the echo backend.",
        tokens: 1,
        accepts_files: true,
    },
    CannedSpec {
        name: "openai-gpt-4",
        text: "Hello from OpenAI GPT-4 dummy code.",
        tokens: 42,
        accepts_files: true,
    },
    CannedSpec {
        name: "openai-gpt-4o",
        text: "Hello from OpenAI GPT-4o dummy code.",
        tokens: 35,
        accepts_files: true,
    },
    CannedSpec {
        name: "openai-o1",
        text: "Hello from OpenAI o1 dummy code.",
        tokens: 10,
        accepts_files: true,
    },
    CannedSpec {
        name: "openai-o3-mini",
        text: "Hello from OpenAI o3 mini dummy code.",
        tokens: 25,
        accepts_files: true,
    },
    CannedSpec {
        name: "google-gemini-2.0-pro",
        text: "Hello from Google Gemini 2.0 Pro with no files allowed.",
        tokens: 50,
        accepts_files: false,
    },
];

/// Find a canned spec by model name.
pub fn find_canned(name: &str) -> Option<&'static CannedSpec> {
    CANNED.iter().find(|s| s.name == name)
}

pub struct CannedBackend {
    spec: &'static CannedSpec,
}

impl CannedBackend {
    pub fn new(spec: &'static CannedSpec) -> Self {
        Self { spec }
    }
}

#[async_trait]
impl ModelBackend for CannedBackend {
    fn name(&self) -> &str {
        self.spec.name
    }

    fn kind(&self) -> BackendKind {
        BackendKind::Canned
    }

    async fn upload_and_query(
        &self,
        _request: &Value,
        attachments: &[AttachmentDescriptor],
    ) -> Result<BackendResult, BackendError> {
        if !self.spec.accepts_files {
            ExtensionPolicy::deny_all().check_all(attachments)?;
        }
        debug!(model = self.spec.name, attachments = attachments.len(), "canned reply");
        Ok(BackendResult::success(
            self.spec.name,
            self.spec.text,
            self.spec.tokens,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_catalogue_names_unique() {
        let mut names: Vec<&str> = CANNED.iter().map(|s| s.name).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), CANNED.len());
    }

    #[tokio::test]
    async fn test_echo_backend() {
        let backend = CannedBackend::new(find_canned("echo-backend").unwrap());
        let result = backend
            .upload_and_query(&json!({"model": "echo-backend"}), &[])
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(result.model_used, "echo-backend");
        assert_eq!(result.text, "Hello from the echo backend.");
        assert_eq!(result.token_usage, 1);
        assert!(result.produced_file_ids.is_empty());
    }

    #[tokio::test]
    async fn test_attachments_ignored() {
        let backend = CannedBackend::new(find_canned("openai-gpt-4").unwrap());
        let files = vec![AttachmentDescriptor::new("1.mov", b"x".to_vec(), "video/quicktime")];
        let result = backend.upload_and_query(&json!({}), &files).await.unwrap();
        assert_eq!(result.token_usage, 42);
    }

    #[tokio::test]
    async fn test_gemini_rejects_files() {
        let backend = CannedBackend::new(find_canned("google-gemini-2.0-pro").unwrap());
        let files = vec![AttachmentDescriptor::new("1.png", b"x".to_vec(), "image/png")];
        let err = backend.upload_and_query(&json!({}), &files).await.unwrap_err();
        assert_eq!(err.code(), 400);

        let ok = backend.upload_and_query(&json!({}), &[]).await.unwrap();
        assert_eq!(ok.token_usage, 50);
    }

    #[test]
    fn test_find_canned_unknown() {
        assert!(find_canned("gpt-5").is_none());
    }
}
