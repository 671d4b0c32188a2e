//! Dispatcher: routes a decoded request to its model backend.
//!
//! The dispatcher owns the only cross-request mutable state (the usage
//! accountant and the request counter). Every per-request failure comes back
//! as an [`ExternalResponse`]; only a broken deployment escapes as
//! [`DispatchError`].

use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use llmgate_backends::BackendRegistry;
use llmgate_core::{
    AttachmentDescriptor, BackendError, BackendResult, ExternalResponse, UsageAccountant,
};

use crate::telemetry::{REQUESTS_TOTAL, TOKENS_TOTAL};

#[derive(Debug, Error)]
pub enum DispatchError {
    /// The backend reported that the service is not correctly configured.
    #[error("backend '{model}' is misconfigured: {source}")]
    Misconfigured {
        model: String,
        #[source]
        source: BackendError,
    },
}

pub struct Dispatcher {
    registry: Arc<BackendRegistry>,
    usage: Arc<UsageAccountant>,
    requests: AtomicU64,
}

impl Dispatcher {
    pub fn new(registry: Arc<BackendRegistry>, usage: Arc<UsageAccountant>) -> Self {
        Self {
            registry,
            usage,
            requests: AtomicU64::new(0),
        }
    }

    pub fn registry(&self) -> &BackendRegistry {
        &self.registry
    }

    pub fn usage(&self) -> &UsageAccountant {
        &self.usage
    }

    /// Number of dispatches attempted since startup.
    pub fn total_requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Route `request` to the backend named by its `model` field.
    ///
    /// The backend runs on its own task so that a panic inside it becomes a
    /// 500 response instead of taking the worker down. Tokens are recorded
    /// only for successful results.
    pub async fn dispatch(
        &self,
        request: Value,
        attachments: Vec<AttachmentDescriptor>,
    ) -> Result<ExternalResponse, DispatchError> {
        self.requests.fetch_add(1, Ordering::Relaxed);
        metrics::counter!(REQUESTS_TOTAL).increment(1);

        let model = match request.get("model").and_then(Value::as_str) {
            Some(model) if !model.trim().is_empty() => model.to_string(),
            _ => {
                warn!("request without a model");
                return Ok(ExternalResponse::client_error(400, "No model was provided."));
            }
        };

        let Some(backend) = self.registry.get(&model).cloned() else {
            warn!(model = %model, "unrecognized model");
            return Ok(ExternalResponse::client_error(
                400,
                format!("Unrecognized model: {model}"),
            ));
        };

        info!(
            model = %model,
            kind = %backend.kind(),
            attachments = attachments.len(),
            "dispatching request"
        );

        let task = tokio::spawn(async move {
            backend.upload_and_query(&request, &attachments).await
        });

        let result = match task.await {
            Ok(Ok(result)) => result.normalized(),
            Ok(Err(err)) if err.is_fatal() => {
                error!(model = %model, error = %err, "backend configuration error");
                return Err(DispatchError::Misconfigured { model, source: err });
            }
            Ok(Err(err)) => {
                warn!(model = %model, code = err.code(), error = %err, "backend failed");
                BackendResult::failure(&model, err.code(), err.to_string())
            }
            Err(join) => {
                let message = if join.is_panic() {
                    panic_message(join.into_panic())
                } else {
                    "Backend task was cancelled.".to_string()
                };
                error!(model = %model, error = %message, "backend task aborted");
                BackendResult::failure(&model, 500, message)
            }
        };

        if result.success {
            self.usage.add_usage(result.token_usage);
            metrics::counter!(TOKENS_TOTAL).increment(result.token_usage);
            debug!(
                model = %model,
                tokens = result.token_usage,
                total = self.usage.total(),
                "recorded usage"
            );
        }

        Ok(ExternalResponse::from(result))
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("Backend panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("Backend panicked: {s}")
    } else {
        "Backend panicked.".to_string()
    }
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
