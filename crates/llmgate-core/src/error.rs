//! Error taxonomy shared by backends and the dispatcher.
//!
//! Every per-request failure is a [`BackendError`] carrying an HTTP-like code.
//! [`ConfigError`] means the service is not correctly deployed; it is never
//! folded into a per-request response.

use thiserror::Error;

/// Fatal deployment problem: a required credential or identifier is missing.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("backend '{backend}' requires {field}, but it is not configured")]
    MissingCredential {
        backend: String,
        field: &'static str,
    },

    #[error("backend '{backend}' has no assistant id configured")]
    MissingAssistantId { backend: String },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A per-request failure raised somewhere inside a backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The caller sent something we cannot serve (bad field, dangling reference).
    #[error("{0}")]
    InvalidRequest(String),

    /// An attachment's extension is not on the backend's allow-list.
    /// `message` is the preformatted rejection text.
    #[error("{message}")]
    UnsupportedExtension { extension: String, message: String },

    /// The remote API answered with a structured error object.
    #[error("{message}")]
    Upstream { code: u16, message: String },

    /// The remote call could not complete.
    #[error("{0}")]
    Transport(String),

    /// The remote API answered with a non-2xx status and no usable error body.
    /// Reported as a generic 500; `status` only drives retry decisions.
    #[error("{message}")]
    HttpStatus { status: u16, message: String },

    /// The remote API answered, but not in the shape the protocol expects.
    #[error("{0}")]
    Protocol(String),

    /// Polling exhausted its retry budget.
    #[error("{0}")]
    Timeout(String),

    /// Scratch storage could not be written.
    #[error("{0}")]
    Staging(String),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl BackendError {
    /// HTTP-like status code for this failure.
    pub fn code(&self) -> u16 {
        match self {
            BackendError::InvalidRequest(_) | BackendError::UnsupportedExtension { .. } => 400,
            BackendError::Upstream { code, .. } => *code,
            BackendError::Transport(_)
            | BackendError::HttpStatus { .. }
            | BackendError::Protocol(_)
            | BackendError::Timeout(_)
            | BackendError::Staging(_)
            | BackendError::Config(_) => 500,
        }
    }

    /// Whether this failure indicates a broken deployment rather than a bad request.
    pub fn is_fatal(&self) -> bool {
        matches!(self, BackendError::Config(_))
    }
}

impl From<std::io::Error> for BackendError {
    fn from(err: std::io::Error) -> Self {
        BackendError::Staging(format!("Could not stage attachment: {err}"))
    }
}
