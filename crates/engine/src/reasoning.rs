//! Reasoning step: one model call per pass, with timeout and bounded retry.
//!
//! The step either appends exactly one assistant message to the state and
//! returns its interpretation, or fails and leaves the state untouched.

use crate::prompt::system_prompt;
use rustedscout_config::RetryConfig;
use rustedscout_core::action::ActionDefinition;
use rustedscout_core::error::{ProviderError, ReasoningError};
use rustedscout_core::message::{ActionRequest, Message, Role};
use rustedscout_core::provider::{Provider, ProviderRequest};
use rustedscout_core::state::AgentState;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Text the model emits once it judges the research sufficient.
pub const COMPLETION_MARKER: &str = "RESEARCH_COMPLETE";

/// What the model asked for on this pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ReasoningOutput {
    /// Actions to run before reasoning again, in request order.
    ActionRequest { actions: Vec<ActionRequest> },
    /// No further actions; closing content supplied directly.
    FinalAnswer { text: String },
}

impl ReasoningOutput {
    pub fn actions(&self) -> &[ActionRequest] {
        match self {
            Self::ActionRequest { actions } => actions,
            Self::FinalAnswer { .. } => &[],
        }
    }
}

/// Model parameters for the reasoning call.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Exponential backoff before retry number `retry_index` (0-based), capped.
pub fn retry_backoff_ms(retry: &RetryConfig, retry_index: u32) -> u64 {
    let initial = retry.initial_backoff_ms;
    let cap = retry.max_backoff_ms.max(initial);
    let factor = 1u64.checked_shl(retry_index.min(20)).unwrap_or(u64::MAX);
    initial.saturating_mul(factor).min(cap)
}

pub struct ReasoningStep {
    provider: Arc<dyn Provider>,
    actions: Vec<ActionDefinition>,
    settings: ModelSettings,
    timeout: Duration,
    retry: RetryConfig,
}

impl ReasoningStep {
    pub fn new(
        provider: Arc<dyn Provider>,
        actions: Vec<ActionDefinition>,
        settings: ModelSettings,
        timeout: Duration,
        retry: RetryConfig,
    ) -> Self {
        Self {
            provider,
            actions,
            settings,
            timeout,
            retry,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Worst-case wall time of one [`decide`](Self::decide) call.
    pub fn time_bound(&self) -> Duration {
        let attempts = self.retry.max_attempts.max(1);
        let backoff: u64 = (0..attempts - 1)
            .map(|i| retry_backoff_ms(&self.retry, i))
            .sum();
        self.timeout * attempts + Duration::from_millis(backoff)
    }

    /// Assemble the model request: system prompt first, then history.
    pub fn build_request(&self, state: &AgentState) -> Result<ProviderRequest, ReasoningError> {
        if state.latest_query().is_none() {
            return Err(ReasoningError::EmptyConversation);
        }

        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        messages.push(Message::system(system_prompt(
            chrono::Local::now().date_naive(),
            COMPLETION_MARKER,
        )));
        messages.extend(
            state
                .messages
                .iter()
                .filter(|m| m.role != Role::System)
                .cloned(),
        );

        Ok(ProviderRequest {
            model: self.settings.model.clone(),
            messages,
            temperature: self.settings.temperature,
            max_tokens: Some(self.settings.max_tokens),
            actions: self.actions.clone(),
        })
    }

    /// Run one reasoning pass against `state`.
    ///
    /// On success exactly one assistant message is appended and, if the model
    /// emitted [`COMPLETION_MARKER`], the completion flag is raised. On
    /// failure `state` is unchanged.
    pub async fn decide(&self, state: &mut AgentState) -> Result<ReasoningOutput, ReasoningError> {
        let request = self.build_request(state)?;
        let taken = issued_action_ids(state);
        let max_attempts = self.retry.max_attempts.max(1);
        let mut last_error = ReasoningError::EmptyConversation;

        for attempt in 1..=max_attempts {
            let started = Instant::now();
            let mut retry_after: Option<u64> = None;

            match tokio::time::timeout(self.timeout, self.provider.complete(request.clone())).await
            {
                Ok(Ok(response)) => match interpret(response.message, &taken) {
                    Ok((message, output)) => {
                        debug!(
                            provider = self.provider.name(),
                            attempt,
                            actions = output.actions().len(),
                            duration_ms = started.elapsed().as_millis() as u64,
                            "Reasoning pass produced output"
                        );
                        let complete = message.content.contains(COMPLETION_MARKER);
                        state.push(message);
                        if complete {
                            state.mark_research_complete();
                        }
                        return Ok(output);
                    }
                    Err(e) => last_error = e,
                },
                Ok(Err(e)) if !e.is_retryable() => {
                    return Err(ReasoningError::NonRetryable(e.to_string()));
                }
                Ok(Err(e)) => {
                    if let ProviderError::RateLimited { retry_after_secs } = &e {
                        retry_after = Some(retry_after_secs.saturating_mul(1000));
                    }
                    last_error = ReasoningError::Exhausted {
                        attempts: attempt,
                        last_error: e.to_string(),
                    };
                }
                Err(_) => {
                    last_error = ReasoningError::Timeout {
                        timeout_secs: self.timeout.as_secs(),
                    };
                }
            }

            if attempt < max_attempts {
                let wait_ms = retry_backoff_ms(&self.retry, attempt - 1).max(retry_after.unwrap_or(0));
                warn!(
                    attempt,
                    max_attempts,
                    wait_ms,
                    error = %last_error,
                    "Reasoning call failed, retrying"
                );
                tokio::time::sleep(Duration::from_millis(wait_ms)).await;
            }
        }

        if max_attempts == 1 {
            return Err(last_error);
        }
        Err(ReasoningError::Exhausted {
            attempts: max_attempts,
            last_error: last_error.to_string(),
        })
    }
}

/// Every action id already used by a request or a result in the history.
fn issued_action_ids(state: &AgentState) -> HashSet<String> {
    state
        .messages
        .iter()
        .flat_map(|m| {
            m.actions
                .iter()
                .map(|a| a.id.clone())
                .chain(m.action_id.clone())
        })
        .collect()
}

/// Turn a raw model message into a history entry and its interpretation.
///
/// Action ids are made non-empty and unique across the whole history
/// (`taken` plus this message), so every result matches exactly one request
/// even when a model reuses ids between turns.
fn interpret(
    mut message: Message,
    taken: &HashSet<String>,
) -> Result<(Message, ReasoningOutput), ReasoningError> {
    message.role = Role::Assistant;
    if message.content.trim().is_empty() && !message.has_actions() {
        return Err(ReasoningError::Malformed(
            "response had neither text nor action requests".into(),
        ));
    }

    let mut seen = HashSet::new();
    for action in &mut message.actions {
        if action.name.trim().is_empty() {
            return Err(ReasoningError::Malformed("action request without a name".into()));
        }
        if action.id.is_empty() || taken.contains(&action.id) || !seen.insert(action.id.clone()) {
            let fresh = ActionRequest::new(action.name.clone(), serde_json::Value::Null);
            action.id = fresh.id;
            seen.insert(action.id.clone());
        }
    }

    let output = if !message.has_actions() {
        ReasoningOutput::FinalAnswer {
            text: message.content.clone(),
        }
    } else {
        ReasoningOutput::ActionRequest {
            actions: message.actions.clone(),
        }
    };
    Ok((message, output))
}
