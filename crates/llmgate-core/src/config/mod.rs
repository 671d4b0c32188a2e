//! Configuration system: schema, loading, and env var overrides.
//!
//! # Usage
//! ```no_run
//! use llmgate_core::config;
//!
//! let cfg = config::load_config(None);
//! println!("Listening on {}:{}", cfg.server.host, cfg.server.port);
//! ```

pub mod loader;
pub mod schema;

// Re-export key types
pub use loader::{get_config_path, load_config, save_config, try_load_config, LoadError};
pub use schema::{
    AssistantBackendConfig, BackendsConfig, ChatBackendConfig, Config, LoggingConfig,
    PollingConfig, ProviderConfig, ProvidersConfig, QingyunkeConfig, ServerConfig,
};
