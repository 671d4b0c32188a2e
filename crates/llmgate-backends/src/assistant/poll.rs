//! Bounded run-status polling.

use tracing::{debug, warn};

use llmgate_core::config::PollingConfig;
use llmgate_core::BackendError;

use super::api::{AssistantApi, RunState};

/// Poll a run until it reaches a terminal state.
///
/// Returns the run's total token usage on `completed`. A failure state ends
/// polling at once; so does any error from the status call itself. After
/// `max_attempts` polls without a terminal state the run is abandoned.
pub(crate) async fn wait_for_run(
    api: &dyn AssistantApi,
    thread_id: &str,
    run_id: &str,
    polling: &PollingConfig,
) -> Result<u64, BackendError> {
    for attempt in 1..=polling.max_attempts {
        let status = api.run_status(thread_id, run_id).await?;
        debug!(run = run_id, attempt, state = %status.state, "polled run");

        if status.state == RunState::Completed {
            return Ok(status.total_tokens);
        }
        if status.state.is_failure() {
            warn!(run = run_id, state = %status.state, "run ended without an answer");
            return Err(BackendError::Protocol(format!(
                "Run did not complete successfully: status '{}'.",
                status.state
            )));
        }

        if attempt < polling.max_attempts {
            tokio::time::sleep(polling.interval()).await;
        }
    }

    warn!(run = run_id, attempts = polling.max_attempts, "run polling timed out");
    Err(BackendError::Timeout(format!(
        "Run did not complete within {} polling attempts.",
        polling.max_attempts
    )))
}
