//! Shared types, configuration and accounting for the llmgate gateway.

pub mod config;
pub mod error;
pub mod types;
pub mod usage;
pub mod utils;

pub use error::{BackendError, ConfigError};
pub use types::{AttachmentDescriptor, BackendResult, ExternalResponse, FileRef};
pub use usage::UsageAccountant;
