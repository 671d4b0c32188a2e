//! Model backend trait: the one capability every model integration provides.
//!
//! Single-call backends (canned, chat-completions, qingyunke) and the
//! multi-step assistant backend all implement [`ModelBackend`]; the
//! dispatcher only ever sees `Arc<dyn ModelBackend>`.

use async_trait::async_trait;
use serde_json::Value;

use llmgate_core::{AttachmentDescriptor, BackendError, BackendResult};

/// Broad family a backend belongs to. Used for status output and logging.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    Canned,
    Chat,
    Assistant,
    Qingyunke,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Canned => "canned",
            BackendKind::Chat => "chat",
            BackendKind::Assistant => "assistant",
            BackendKind::Qingyunke => "qingyunke",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait that all model backends must implement.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Model name this backend is registered under (the request's `model`).
    fn name(&self) -> &str;

    fn kind(&self) -> BackendKind;

    /// Serve one request.
    ///
    /// # Arguments
    /// * `request`: the decoded request body (`model`, `messages`, extras).
    /// * `attachments`: files decoded by the HTTP boundary; may be empty.
    ///
    /// # Returns
    /// A successful [`BackendResult`], or the [`BackendError`] that stopped the
    /// protocol. Staged files are gone by the time this returns.
    async fn upload_and_query(
        &self,
        request: &Value,
        attachments: &[AttachmentDescriptor],
    ) -> Result<BackendResult, BackendError>;
}
