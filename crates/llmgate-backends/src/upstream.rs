//! Classification of non-2xx upstream answers.
//!
//! A structured `{"error": {...}}` body becomes [`BackendError::Upstream`]
//! with a code derived from the error category; anything else becomes a
//! generic 500 that remembers the HTTP status for retry decisions.

use serde::Deserialize;

use llmgate_core::BackendError;

use crate::remote::RemoteCallResult;

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: UpstreamError,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct UpstreamError {
    message: String,
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<serde_json::Value>,
}

impl UpstreamError {
    fn code_str(&self) -> Option<&str> {
        self.code.as_ref().and_then(|c| c.as_str())
    }
}

fn status_for(err: &UpstreamError, http_status: u16) -> u16 {
    let code = err.code_str().unwrap_or_default();
    let kind = err.kind.as_deref().unwrap_or_default();

    match (code, kind) {
        ("invalid_api_key", _) | (_, "authentication_error") | (_, "invalid_authentication") => {
            401
        }
        ("rate_limit_exceeded", _)
        | ("insufficient_quota", _)
        | (_, "rate_limit_error")
        | (_, "insufficient_quota") => 429,
        (_, "not_found_error") => 404,
        (_, "invalid_request_error") if http_status == 404 => 404,
        (_, "invalid_request_error") => 400,
        _ if http_status >= 400 => http_status,
        _ => 500,
    }
}

/// Turn a failed remote call made during `step` into a [`BackendError`].
pub fn classify(step: &str, result: &RemoteCallResult) -> BackendError {
    let parsed = serde_json::from_str::<ErrorEnvelope>(&result.body)
        .ok()
        .map(|envelope| envelope.error)
        .filter(|err| !err.message.is_empty());

    match parsed {
        Some(err) => BackendError::Upstream {
            code: status_for(&err, result.status_code),
            message: format!("{step} failed: {}", err.message),
        },
        None => BackendError::HttpStatus {
            status: result.status_code,
            message: format!("{step} failed with HTTP status {}.", result.status_code),
        },
    }
}

/// Whether retrying the same call could plausibly succeed.
pub fn is_transient(err: &BackendError) -> bool {
    match err {
        BackendError::Transport(_) => true,
        BackendError::Upstream { code, .. } => *code >= 500,
        BackendError::HttpStatus { status, .. } => *status >= 500,
        _ => false,
    }
}
