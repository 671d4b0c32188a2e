//! Core data types shared by the gateway, the dispatcher and every backend.
//!
//! - [`AttachmentDescriptor`]: one decoded file handed over by the HTTP boundary
//! - [`BackendResult`]: what a backend returns for one invocation
//! - [`ExternalResponse`]: the only shape that crosses the system boundary

use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────
// Attachments
// ─────────────────────────────────────────────

/// A file attachment decoded by the HTTP boundary.
///
/// `filename` is the correlation id the client used when referencing the file
/// from its messages (e.g. `"1093847.png"`), not the user-facing name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttachmentDescriptor {
    filename: String,
    body: Vec<u8>,
    content_type: String,
}

impl AttachmentDescriptor {
    pub fn new(
        filename: impl Into<String>,
        body: impl Into<Vec<u8>>,
        content_type: impl Into<String>,
    ) -> Self {
        Self {
            filename: filename.into(),
            body: body.into(),
            content_type: content_type.into(),
        }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    pub fn content_type(&self) -> &str {
        &self.content_type
    }

    /// Whether the declared MIME type is an image type.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

// ─────────────────────────────────────────────
// Backend result
// ─────────────────────────────────────────────

/// Normalized outcome of one backend invocation.
///
/// [`BackendResult::success`] and [`BackendResult::failure`] keep the
/// code/message invariant: success ⇒ `error_code == 200`; failure ⇒
/// `error_code >= 400` and a non-empty `error_message`. The fields stay
/// public for backends and tests, so the dispatcher re-establishes the
/// invariant with [`BackendResult::normalized`] before answering.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BackendResult {
    pub success: bool,
    pub model_used: String,
    pub text: String,
    pub token_usage: u64,
    pub error_code: u16,
    pub error_message: String,
    pub produced_file_ids: Vec<String>,
}

impl BackendResult {
    /// A successful result.
    pub fn success(
        model_used: impl Into<String>,
        text: impl Into<String>,
        token_usage: u64,
    ) -> Self {
        Self {
            success: true,
            model_used: model_used.into(),
            text: text.into(),
            token_usage,
            error_code: 200,
            error_message: String::new(),
            produced_file_ids: Vec::new(),
        }
    }

    /// A failed result. Codes below 400 are clamped to 500 and an empty
    /// message is replaced by a generic one.
    pub fn failure(model_used: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.is_empty() {
            message = "Unknown backend failure.".to_string();
        }
        Self {
            success: false,
            model_used: model_used.into(),
            text: String::new(),
            token_usage: 0,
            error_code: if code >= 400 { code } else { 500 },
            error_message: message,
            produced_file_ids: Vec::new(),
        }
    }

    /// Re-derive `error_code` and `error_message` from `success`.
    pub fn normalized(self) -> Self {
        if !self.success {
            return Self::failure(self.model_used, self.error_code, self.error_message);
        }
        Self {
            error_code: 200,
            error_message: String::new(),
            ..self
        }
    }

    /// Attach the remote file ids produced while serving the request.
    pub fn with_file_ids(mut self, ids: Vec<String>) -> Self {
        self.produced_file_ids = ids;
        self
    }
}

// ─────────────────────────────────────────────
// External response (wire schema)
// ─────────────────────────────────────────────

/// A file reference in the external response.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRef {
    pub file_id: String,
}

/// Wire schema returned to callers. The HTTP status always equals `ecode`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ExternalResponse {
    pub model: String,
    pub message: String,
    pub files: Vec<FileRef>,
    pub token_used: u64,
    pub ecode: u16,
    pub emessage: String,
}

impl ExternalResponse {
    /// A failure response that never reached a backend.
    pub fn client_error(code: u16, message: impl Into<String>) -> Self {
        Self::from(BackendResult::failure("", code, message))
    }

    pub fn is_success(&self) -> bool {
        self.ecode < 400
    }
}

impl From<BackendResult> for ExternalResponse {
    fn from(result: BackendResult) -> Self {
        ExternalResponse {
            model: result.model_used,
            message: result.text,
            files: result
                .produced_file_ids
                .into_iter()
                .map(|file_id| FileRef { file_id })
                .collect(),
            token_used: result.token_usage,
            ecode: result.error_code,
            emessage: if result.success {
                String::new()
            } else {
                result.error_message
            },
        }
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
