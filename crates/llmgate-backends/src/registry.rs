//! Backend registry: the static model-name → backend table.
//!
//! Built once at startup from [`Config`] and read-only afterwards. Adding a
//! model means registering another [`ModelBackend`], never touching the
//! dispatcher.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use llmgate_core::config::Config;
use llmgate_core::utils::expand_home;
use llmgate_core::ConfigError;

use crate::assistant::AssistantBackend;
use crate::canned::{CannedBackend, CANNED};
use crate::chat::ChatBackend;
use crate::qingyunke::QingyunkeBackend;
use crate::remote::RemoteClient;
use crate::traits::{BackendKind, ModelBackend};

/// Per-call timeout for every outbound request.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Stores backends keyed by model name.
///
/// Owns `Arc<dyn ModelBackend>` so backends can be shared across request tasks.
pub struct BackendRegistry {
    backends: HashMap<String, Arc<dyn ModelBackend>>,
}

impl BackendRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            backends: HashMap::new(),
        }
    }

    /// Build every backend the configuration declares.
    ///
    /// Fails when the configuration is incomplete; the service must not
    /// start in that case.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        config.validate()?;

        let remote = RemoteClient::new(REQUEST_TIMEOUT)
            .map_err(|e| ConfigError::Invalid(e.to_string()))?;
        let scratch_root = expand_home(&config.server.scratch_dir);
        let mut registry = Self::new();

        if config.backends.canned {
            for spec in CANNED {
                registry.register(Arc::new(CannedBackend::new(spec)));
            }
        }

        for (name, chat) in &config.backends.chat {
            let backend = ChatBackend::new(name, chat, &config.providers.openai, remote.clone())?;
            registry.register(Arc::new(backend));
        }

        for (name, assistant) in &config.backends.assistants {
            let backend = AssistantBackend::openai(
                name,
                assistant,
                &config.providers.openai,
                remote.clone(),
                scratch_root.clone(),
                config.polling.clone(),
            )?;
            registry.register(Arc::new(backend));
        }

        if config.backends.qingyunke.enabled {
            registry.register(Arc::new(QingyunkeBackend::new(
                &config.backends.qingyunke,
                remote.clone(),
            )));
        }

        info!(backends = registry.len(), "backend registry ready");
        Ok(registry)
    }

    /// Register a backend. Overwrites any previous backend with the same name.
    pub fn register(&mut self, backend: Arc<dyn ModelBackend>) {
        let name = backend.name().to_string();
        if self.backends.contains_key(&name) {
            warn!(model = %name, "replacing registered backend");
        }
        info!(model = %name, kind = %backend.kind(), "registered backend");
        self.backends.insert(name, backend);
    }

    /// Look up a backend by exact model name.
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ModelBackend>> {
        self.backends.get(name)
    }

    pub fn has(&self, name: &str) -> bool {
        self.backends.contains_key(name)
    }

    /// Names of all registered backends, sorted for determinism.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.backends.keys().cloned().collect();
        names.sort();
        names
    }

    /// `(name, kind)` for every backend, sorted by name.
    pub fn entries(&self) -> Vec<(String, BackendKind)> {
        let mut entries: Vec<(String, BackendKind)> = self
            .backends
            .iter()
            .map(|(name, b)| (name.clone(), b.kind()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }
}

impl Default for BackendRegistry {
    fn default() -> Self {
        Self::new()
    }
}
