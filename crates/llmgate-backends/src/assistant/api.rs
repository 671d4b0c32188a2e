//! The remote operations the assistant protocol needs, as a trait.
//!
//! [`super::client::OpenAiAssistants`] is the production implementation;
//! tests drive the protocol through an in-memory fake.

use std::path::Path;

use async_trait::async_trait;
use serde_json::Value;

use llmgate_core::BackendError;

/// Lifecycle state of a remote run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RunState {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Completed,
    Failed,
    Cancelled,
    Expired,
    Incomplete,
    Other(String),
}

impl RunState {
    pub fn parse(s: &str) -> Self {
        match s {
            "queued" => RunState::Queued,
            "in_progress" => RunState::InProgress,
            "requires_action" => RunState::RequiresAction,
            "cancelling" => RunState::Cancelling,
            "completed" => RunState::Completed,
            "failed" => RunState::Failed,
            "cancelled" => RunState::Cancelled,
            "expired" => RunState::Expired,
            "incomplete" => RunState::Incomplete,
            other => RunState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            RunState::Queued => "queued",
            RunState::InProgress => "in_progress",
            RunState::RequiresAction => "requires_action",
            RunState::Cancelling => "cancelling",
            RunState::Completed => "completed",
            RunState::Failed => "failed",
            RunState::Cancelled => "cancelled",
            RunState::Expired => "expired",
            RunState::Incomplete => "incomplete",
            RunState::Other(s) => s,
        }
    }

    /// Terminal states that end the run without an answer.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            RunState::Failed | RunState::Cancelled | RunState::Expired | RunState::Incomplete
        )
    }
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One poll of a run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RunStatus {
    pub state: RunState,
    /// `usage.total_tokens`; zero until the run completes.
    pub total_tokens: u64,
}

/// Remote side of the assistant protocol.
///
/// Id-returning calls yield an empty string when the remote answered
/// successfully but without an id; the protocol decides what that means.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    /// Upload a staged file; returns the remote file id.
    async fn upload_file(&self, path: &Path, file_name: &str) -> Result<String, BackendError>;

    /// Create a thread holding `messages`; returns the thread id.
    async fn create_thread(&self, messages: &[Value]) -> Result<String, BackendError>;

    /// Start a run of `assistant_id` on a thread; returns the run id.
    async fn create_run(&self, thread_id: &str, assistant_id: &str)
        -> Result<String, BackendError>;

    async fn run_status(&self, thread_id: &str, run_id: &str) -> Result<RunStatus, BackendError>;

    /// Id of the most recent message in a thread.
    async fn latest_message_id(&self, thread_id: &str) -> Result<String, BackendError>;

    /// Full message object (`content` array included).
    async fn message(&self, thread_id: &str, message_id: &str) -> Result<Value, BackendError>;
}
