//! Prometheus exposition of the gateway counters.
//!
//! The dispatcher records through the `metrics` facade; this module installs
//! the process-wide Prometheus recorder once and hands out its render handle.

use std::sync::OnceLock;

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tracing::{debug, warn};

pub const REQUESTS_TOTAL: &str = "llmgate_requests_total";
pub const TOKENS_TOTAL: &str = "llmgate_tokens_total";

static RECORDER: OnceLock<Option<PrometheusHandle>> = OnceLock::new();

/// Handle of the installed recorder, installing it on first call.
///
/// `None` when another global recorder was installed before ours.
pub fn prometheus_handle() -> Option<PrometheusHandle> {
    RECORDER.get_or_init(install).clone()
}

fn install() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => {
            metrics::describe_counter!(REQUESTS_TOTAL, "Completion requests dispatched.");
            metrics::describe_counter!(TOKENS_TOTAL, "Tokens consumed by successful completions.");
            debug!("prometheus recorder installed");
            Some(handle)
        }
        Err(e) => {
            warn!(error = %e, "prometheus recorder not installed, /metrics will be empty");
            None
        }
    }
}
