//! Action dispatcher: validate a batch, run it concurrently, record results.

use futures::future::join_all;
use rustedscout_core::action::{Action, ActionRegistry, ActionResult};
use rustedscout_core::error::{ActionError, DispatchError};
use rustedscout_core::message::ActionRequest;
use rustedscout_core::state::AgentState;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct ActionDispatcher {
    registry: ActionRegistry,
    timeout: Duration,
}

impl ActionDispatcher {
    pub fn new(registry: ActionRegistry, timeout: Duration) -> Self {
        Self { registry, timeout }
    }

    /// Execute a batch of requests.
    ///
    /// The whole batch is validated before anything runs, so a malformed
    /// request fails with [`DispatchError`] and no side effects. Valid
    /// requests run concurrently, each under its own timeout; individual
    /// failures become [`ActionError`] outcomes. Results are returned in
    /// request order.
    pub async fn execute(
        &self,
        requests: &[ActionRequest],
    ) -> Result<Vec<ActionResult>, DispatchError> {
        let actions = requests
            .iter()
            .map(|request| self.registry.validate(request))
            .collect::<Result<Vec<_>, _>>()?;

        let calls = requests
            .iter()
            .zip(actions)
            .map(|(request, action)| self.run_one(request, action));
        Ok(join_all(calls).await)
    }

    async fn run_one(&self, request: &ActionRequest, action: Arc<dyn Action>) -> ActionResult {
        let started = Instant::now();
        let outcome =
            match tokio::time::timeout(self.timeout, action.execute(request.arguments.clone()))
                .await
            {
                Ok(outcome) => outcome,
                Err(_) => Err(ActionError::Timeout {
                    action: request.name.clone(),
                    timeout_secs: self.timeout.as_secs(),
                }),
            };

        let duration_ms = started.elapsed().as_millis() as u64;
        match &outcome {
            Ok(text) => debug!(
                action = %request.name,
                id = %request.id,
                duration_ms,
                bytes = text.len(),
                "Action completed"
            ),
            Err(e) => warn!(
                action = %request.name,
                id = %request.id,
                duration_ms,
                error = %e,
                "Action failed"
            ),
        }

        ActionResult {
            request: request.clone(),
            outcome,
        }
    }

    /// Append one action-result message per result, in order, and fold
    /// successful output into the research content.
    pub fn record(state: &mut AgentState, results: &[ActionResult]) {
        for result in results {
            state.push(result.to_message());
            if let Ok(text) = &result.outcome {
                let heading = format!("{} ({})", result.request.name, result.request.id);
                state.append_research(&heading, text);
            }
        }
    }
}
