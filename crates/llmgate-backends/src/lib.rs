//! Model backend layer for llmgate.
//!
//! # Architecture
//!
//! - [`traits::ModelBackend`]: trait that every backend implements
//! - [`registry::BackendRegistry`]: model name → backend table built from config
//! - [`remote`]: GET / JSON POST / multipart POST helpers over `reqwest`
//! - [`extension`]: per-backend file extension allow-lists
//! - [`staging`]: per-request scratch space for attachments
//! - [`assistant`]: the multi-step assistant-protocol backend
//! - [`canned`], [`chat`], [`qingyunke`]: single-call backends

pub mod assistant;
pub mod canned;
pub mod chat;
pub mod extension;
pub mod openai;
pub mod qingyunke;
pub mod registry;
pub mod remote;
pub mod staging;
pub mod traits;
pub mod upstream;

// Re-export main types for convenience
pub use assistant::{AssistantApi, AssistantBackend, OpenAiAssistants};
pub use canned::{CannedBackend, CANNED};
pub use chat::ChatBackend;
pub use extension::ExtensionPolicy;
pub use qingyunke::QingyunkeBackend;
pub use registry::BackendRegistry;
pub use remote::{RemoteCallResult, RemoteClient, RemoteError};
pub use traits::{BackendKind, ModelBackend};
