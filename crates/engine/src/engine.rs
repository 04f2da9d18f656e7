//! The execution engine: drives one research run through its stages.
//!
//! ```text
//! INIT ──checkpoint──▶ REASONING ──▶ ROUTING ──▶ ACTING ──checkpoint──▶ REASONING ...
//!                                      │
//!                                      └──▶ FORMATTING ──checkpoint──▶ DONE
//! ```
//!
//! Every run holds its thread's lease from load to final save, so concurrent
//! invocations on one thread never interleave. Checkpoints are only written
//! at stage boundaries; a failed, timed-out or cancelled stage leaves the
//! last checkpoint as it was.

use crate::cancel::{CancelAware, CancellationToken, await_or_cancel, is_cancelled};
use crate::dispatcher::ActionDispatcher;
use crate::formatter::{CitationFormatter, Source};
use crate::reasoning::{ModelSettings, ReasoningStep};
use crate::router::{Route, route};
use crate::stream_event::{EngineEvent, Stage};
use rustedscout_config::{AppConfig, BusyPolicy, RetryConfig};
use rustedscout_core::action::ActionRegistry;
use rustedscout_core::error::{Error, Result};
use rustedscout_core::message::{Message, ThreadId};
use rustedscout_core::provider::Provider;
use rustedscout_core::state::AgentState;
use rustedscout_store::{ConversationStore, ThreadLease};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Runtime settings of the engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub model: ModelSettings,
    pub max_turns: u32,
    pub reasoning_timeout: Duration,
    pub action_timeout: Duration,
    /// Overall bound for one run; derived from the per-call bounds if unset.
    pub turn_timeout: Option<Duration>,
    pub default_thread_id: ThreadId,
    pub busy_policy: BusyPolicy,
    pub retry: RetryConfig,
    pub max_sources: usize,
}

impl EngineConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        let engine = &config.engine;
        Self {
            model: ModelSettings {
                model: config.default_model.clone(),
                temperature: config.default_temperature,
                max_tokens: config.default_max_tokens,
            },
            max_turns: engine.max_turns,
            reasoning_timeout: Duration::from_secs(engine.reasoning_timeout_secs),
            action_timeout: Duration::from_secs(engine.action_timeout_secs),
            turn_timeout: engine.turn_timeout_secs.map(Duration::from_secs),
            default_thread_id: ThreadId::from(engine.default_thread_id.as_str()),
            busy_policy: engine.busy_policy,
            retry: engine.retry.clone(),
            max_sources: config.formatter.max_sources,
        }
    }
}

/// One invocation: a query on a thread.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchRequest {
    /// Uses the configured default thread when absent.
    pub thread_id: Option<ThreadId>,
    pub query: String,
}

impl ResearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            thread_id: None,
            query: query.into(),
        }
    }

    pub fn on_thread(mut self, thread_id: impl Into<ThreadId>) -> Self {
        self.thread_id = Some(thread_id.into());
        self
    }
}

/// The outcome of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResearchResponse {
    pub thread_id: ThreadId,
    pub text: String,
    pub sources: Vec<Source>,
    /// Reasoning passes this run took.
    pub turns: u32,
    pub insufficient: bool,
}

/// Per-invocation controls.
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub cancel: Option<CancellationToken>,
    pub events: Option<mpsc::Sender<EngineEvent>>,
    /// Overrides the configured turn cap for this run.
    pub max_turns: Option<u32>,
}

pub struct ResearchEngine {
    store: Arc<ConversationStore>,
    reasoning: ReasoningStep,
    dispatcher: ActionDispatcher,
    formatter: CitationFormatter,
    config: EngineConfig,
}

impl ResearchEngine {
    pub fn new(
        provider: Arc<dyn Provider>,
        actions: ActionRegistry,
        store: Arc<ConversationStore>,
        config: EngineConfig,
    ) -> Self {
        let reasoning = ReasoningStep::new(
            provider,
            actions.definitions(),
            config.model.clone(),
            config.reasoning_timeout,
            config.retry.clone(),
        );
        let dispatcher = ActionDispatcher::new(actions, config.action_timeout);
        let formatter = CitationFormatter::new(config.max_sources);
        Self {
            store,
            reasoning,
            dispatcher,
            formatter,
            config,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<ConversationStore> {
        &self.store
    }

    /// Run a query to completion.
    pub async fn run(&self, request: ResearchRequest) -> Result<ResearchResponse> {
        self.run_with(request, RunOptions::default()).await
    }

    /// Run a query, reporting progress on `events`.
    pub async fn run_streaming(
        &self,
        request: ResearchRequest,
        events: mpsc::Sender<EngineEvent>,
    ) -> Result<ResearchResponse> {
        let options = RunOptions {
            events: Some(events),
            ..RunOptions::default()
        };
        self.run_with(request, options).await
    }

    /// Run a query with explicit cancellation, events and limits.
    pub async fn run_with(
        &self,
        request: ResearchRequest,
        options: RunOptions,
    ) -> Result<ResearchResponse> {
        let query = request.query.trim().to_string();
        if query.is_empty() {
            return self
                .fail(&options, Error::InvalidRequest("query must not be empty".into()))
                .await;
        }
        let thread_id = request
            .thread_id
            .unwrap_or_else(|| self.config.default_thread_id.clone());

        let lease = match self.lease(&thread_id, &options).await {
            Ok(lease) => lease,
            Err(e) => return self.fail(&options, e).await,
        };

        let mut state = match lease.load().await {
            Ok(state) => state,
            Err(e) => return self.fail(&options, e.into()).await,
        };
        if !state.begin_query(query) {
            debug!(thread = %thread_id, "Query already pending on thread, not re-appended");
        }

        self.drive_with_deadline(&lease, state, &options).await
    }

    /// Continue an interrupted run from its last checkpoint.
    pub async fn resume(
        &self,
        thread_id: &ThreadId,
        options: RunOptions,
    ) -> Result<ResearchResponse> {
        let lease = match self.lease(thread_id, &options).await {
            Ok(lease) => lease,
            Err(e) => return self.fail(&options, e).await,
        };
        let state = match lease.load().await {
            Ok(state) => state,
            Err(e) => return self.fail(&options, e.into()).await,
        };
        if !state.is_resumable() {
            let err = Error::InvalidRequest(format!(
                "thread '{thread_id}' has no interrupted run to resume"
            ));
            return self.fail(&options, err).await;
        }
        info!(thread = %thread_id, turn = state.turn, "Resuming interrupted run");
        self.drive_with_deadline(&lease, state, &options).await
    }

    /// The overall bound for a run of `max_turns` passes: every pass may
    /// spend its full reasoning allowance plus one action batch.
    pub fn run_deadline(&self, max_turns: u32) -> Duration {
        self.config.turn_timeout.unwrap_or_else(|| {
            (self.reasoning.time_bound() + self.config.action_timeout) * max_turns.max(1)
        })
    }

    async fn lease(&self, thread_id: &ThreadId, options: &RunOptions) -> Result<ThreadLease> {
        let acquire = self.store.acquire(thread_id, self.config.busy_policy);
        match await_or_cancel(options.cancel.as_ref(), acquire).await {
            CancelAware::Cancelled => Err(cancelled(Stage::Init)),
            CancelAware::Value(Ok(lease)) => Ok(lease),
            CancelAware::Value(Err(e)) => {
                warn!(thread = %thread_id, error = %e, "Could not take thread");
                Err(e.into())
            }
        }
    }

    async fn drive_with_deadline(
        &self,
        lease: &ThreadLease,
        state: AgentState,
        options: &RunOptions,
    ) -> Result<ResearchResponse> {
        let max_turns = options.max_turns.unwrap_or(self.config.max_turns).max(1);
        let deadline = self.run_deadline(max_turns);

        let run = self.drive(lease, state, options, max_turns);
        let outcome = match tokio::time::timeout(deadline, run).await {
            Ok(outcome) => outcome,
            Err(_) => Err(Error::TurnTimeout {
                timeout_secs: deadline.as_secs(),
            }),
        };
        match outcome {
            Ok(response) => Ok(response),
            Err(e) => self.fail(options, e).await,
        }
    }

    /// The state machine proper.
    async fn drive(
        &self,
        lease: &ThreadLease,
        mut state: AgentState,
        options: &RunOptions,
        max_turns: u32,
    ) -> Result<ResearchResponse> {
        let cancel = options.cancel.as_ref();
        let thread_id = lease.thread_id().clone();
        let first_turn = state.turn;

        // INIT
        debug!(
            thread = %thread_id,
            provider = self.reasoning.provider_name(),
            turn = state.turn,
            max_turns,
            "Starting research run"
        );
        self.emit(options, EngineEvent::Stage { stage: Stage::Init, turn: state.turn })
            .await;
        self.checkpoint(lease, &state, Stage::Init, options).await?;

        loop {
            if is_cancelled(cancel) {
                return Err(cancelled(Stage::Reasoning));
            }

            // REASONING
            self.emit(
                options,
                EngineEvent::Stage {
                    stage: Stage::Reasoning,
                    turn: state.turn + 1,
                },
            )
            .await;
            let output = match await_or_cancel(cancel, self.reasoning.decide(&mut state)).await {
                CancelAware::Cancelled => return Err(cancelled(Stage::Reasoning)),
                CancelAware::Value(result) => result?,
            };
            state.turn += 1;
            self.emit(
                options,
                EngineEvent::Reasoning {
                    stage: Stage::Reasoning,
                    turn: state.turn,
                    content: state
                        .messages
                        .last()
                        .map(|m| m.content.clone())
                        .unwrap_or_default(),
                    actions: output.actions().to_vec(),
                    research_complete: state.is_research_complete,
                },
            )
            .await;

            // ROUTING
            self.emit(
                options,
                EngineEvent::Stage {
                    stage: Stage::Routing,
                    turn: state.turn,
                },
            )
            .await;
            let next = route(&state, &output, max_turns);
            info!(
                thread = %thread_id,
                turn = state.turn,
                route = ?next,
                actions = output.actions().len(),
                "Routed reasoning output"
            );
            match next {
                Route::Terminate => {
                    return Err(Error::Internal(
                        "reasoning output is not the latest history entry".into(),
                    ));
                }
                Route::Format => break,
                Route::ContinueWithActions => {}
            }

            if is_cancelled(cancel) {
                return Err(cancelled(Stage::Acting));
            }

            // ACTING
            self.emit(
                options,
                EngineEvent::Stage {
                    stage: Stage::Acting,
                    turn: state.turn,
                },
            )
            .await;
            let dispatch = self.dispatcher.execute(output.actions());
            let results = match await_or_cancel(cancel, dispatch).await {
                CancelAware::Cancelled => return Err(cancelled(Stage::Acting)),
                CancelAware::Value(result) => result?,
            };
            for result in &results {
                self.emit(
                    options,
                    EngineEvent::ActionResult {
                        stage: Stage::Acting,
                        id: result.request.id.clone(),
                        name: result.request.name.clone(),
                        success: result.is_success(),
                        output: result.content(),
                    },
                )
                .await;
            }
            ActionDispatcher::record(&mut state, &results);
            self.checkpoint(lease, &state, Stage::Acting, options).await?;
        }

        if is_cancelled(cancel) {
            return Err(cancelled(Stage::Formatting));
        }

        // FORMATTING
        self.emit(
            options,
            EngineEvent::Stage {
                stage: Stage::Formatting,
                turn: state.turn,
            },
        )
        .await;
        state.mark_research_complete();
        let response = self.formatter.format(&state);
        let mut answer = Message::assistant(response.text.clone());
        answer
            .metadata
            .insert("formatted".into(), serde_json::Value::Bool(true));
        state.push(answer);
        state.finished = true;
        self.checkpoint(lease, &state, Stage::Formatting, options).await?;

        // DONE
        let turns = state.turn.saturating_sub(first_turn);
        info!(
            thread = %thread_id,
            turns,
            sources = response.sources.len(),
            insufficient = response.insufficient,
            "Research run complete"
        );
        self.emit(
            options,
            EngineEvent::Done {
                stage: Stage::Done,
                thread_id: thread_id.to_string(),
                turns,
                text: response.text.clone(),
            },
        )
        .await;

        Ok(ResearchResponse {
            thread_id,
            text: response.text,
            sources: response.sources,
            turns,
            insufficient: response.insufficient,
        })
    }

    async fn checkpoint(
        &self,
        lease: &ThreadLease,
        state: &AgentState,
        stage: Stage,
        options: &RunOptions,
    ) -> Result<()> {
        lease.save(state).await?;
        debug!(
            thread = %lease.thread_id(),
            stage = %stage,
            messages = state.messages.len(),
            "Checkpoint saved"
        );
        self.emit(
            options,
            EngineEvent::Checkpoint {
                stage,
                thread_id: lease.thread_id().to_string(),
                messages: state.messages.len(),
            },
        )
        .await;
        Ok(())
    }

    async fn emit(&self, options: &RunOptions, event: EngineEvent) {
        if let Some(events) = &options.events {
            if events.send(event).await.is_err() {
                debug!("Event receiver dropped");
            }
        }
    }

    /// Report a failed run on the event stream and hand the error back.
    async fn fail<T>(&self, options: &RunOptions, error: Error) -> Result<T> {
        warn!(kind = %error.kind(), error = %error, "Research run failed");
        self.emit(
            options,
            EngineEvent::Error {
                stage: Stage::Failed,
                kind: error.kind().to_string(),
                message: error.to_string(),
            },
        )
        .await;
        Err(error)
    }
}

fn cancelled(stage: Stage) -> Error {
    Error::Cancelled {
        stage: stage.to_string(),
    }
}
