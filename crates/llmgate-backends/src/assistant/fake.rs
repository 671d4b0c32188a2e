//! In-memory [`AssistantApi`] used by the protocol tests.

use std::collections::VecDeque;
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use llmgate_core::BackendError;

use super::api::{AssistantApi, RunState, RunStatus};

pub(crate) struct FakeApi {
    /// `(file_name, bytes)` of every successful upload.
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
    /// Upload calls that fail with a transport error before one succeeds.
    pub upload_failures: AtomicU32,
    pub upload_calls: AtomicU32,
    pub thread_id: String,
    pub threads: Mutex<Vec<Vec<Value>>>,
    pub run_id: String,
    pub runs: Mutex<Vec<String>>,
    /// States returned by successive polls; `in_progress` once exhausted.
    pub states: Mutex<VecDeque<RunState>>,
    pub poll_error: bool,
    pub polls: AtomicU32,
    pub tokens: u64,
    pub message_id: String,
    pub message: Value,
}

impl Default for FakeApi {
    fn default() -> Self {
        Self {
            uploads: Mutex::new(Vec::new()),
            upload_failures: AtomicU32::new(0),
            upload_calls: AtomicU32::new(0),
            thread_id: "thread_1".into(),
            threads: Mutex::new(Vec::new()),
            run_id: "run_1".into(),
            runs: Mutex::new(Vec::new()),
            states: Mutex::new(VecDeque::from(vec![RunState::Completed])),
            poll_error: false,
            polls: AtomicU32::new(0),
            tokens: 0,
            message_id: "msg_1".into(),
            message: json!({"content": [{"type": "text", "text": {"value": "answer"}}]}),
        }
    }
}

impl FakeApi {
    pub fn with_states(states: Vec<RunState>) -> Self {
        Self {
            states: Mutex::new(VecDeque::from(states)),
            ..Default::default()
        }
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }

    pub fn poll_count(&self) -> u32 {
        self.polls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AssistantApi for FakeApi {
    async fn upload_file(&self, path: &Path, file_name: &str) -> Result<String, BackendError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if self
            .upload_failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(BackendError::Transport("connection reset".into()));
        }
        let bytes = std::fs::read(path)?;
        let mut uploads = self.uploads.lock().unwrap();
        uploads.push((file_name.to_string(), bytes));
        Ok(format!("file-{}", uploads.len()))
    }

    async fn create_thread(&self, messages: &[Value]) -> Result<String, BackendError> {
        self.threads.lock().unwrap().push(messages.to_vec());
        Ok(self.thread_id.clone())
    }

    async fn create_run(
        &self,
        _thread_id: &str,
        assistant_id: &str,
    ) -> Result<String, BackendError> {
        self.runs.lock().unwrap().push(assistant_id.to_string());
        Ok(self.run_id.clone())
    }

    async fn run_status(&self, _thread_id: &str, _run_id: &str) -> Result<RunStatus, BackendError> {
        self.polls.fetch_add(1, Ordering::SeqCst);
        if self.poll_error {
            return Err(BackendError::Transport("connection refused".into()));
        }
        let state = self
            .states
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(RunState::InProgress);
        let total_tokens = if state == RunState::Completed { self.tokens } else { 0 };
        Ok(RunStatus {
            state,
            total_tokens,
        })
    }

    async fn latest_message_id(&self, _thread_id: &str) -> Result<String, BackendError> {
        Ok(self.message_id.clone())
    }

    async fn message(&self, _thread_id: &str, _message_id: &str) -> Result<Value, BackendError> {
        Ok(self.message.clone())
    }
}
