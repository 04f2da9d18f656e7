//! End-to-end integration tests for the RustedScout research engine.
//!
//! These drive the full pipeline (reasoning, routing, concurrent actions,
//! checkpointing and citation formatting) with a scripted model and canned
//! web actions, against real checkpoint backends.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use rustedscout_config::{AppConfig, ActionsConfig, BusyPolicy};
use rustedscout_core::action::{Action, ActionRegistry};
use rustedscout_core::error::{ActionError, ErrorKind, ProviderError};
use rustedscout_core::message::{ActionRequest, Message, Role, ThreadId};
use rustedscout_core::provider::{Provider, ProviderRequest, ProviderResponse};
use rustedscout_core::store::CheckpointStore;
use rustedscout_engine::{
    CancellationToken, EngineConfig, EngineEvent, ResearchEngine, ResearchRequest, RunOptions,
};
use rustedscout_store::{ConversationStore, FileStore, InMemoryStore};
use rustedscout_tools::tavily::SearchResponse;
use rustedscout_tools::web_search::format_search_results;

// ── Scripted Provider ────────────────────────────────────────────────────

/// A provider that plays back a script; the last entry repeats.
struct ScriptedProvider {
    responses: Vec<Result<Message, ProviderError>>,
    call_count: AtomicUsize,
    delay: Option<Duration>,
    requests: std::sync::Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    fn new(responses: Vec<Result<Message, ProviderError>>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            delay: None,
            requests: std::sync::Mutex::new(Vec::new()),
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    fn calls(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn last_request(&self) -> ProviderRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "e2e_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let index = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let message = self.responses[index.min(self.responses.len() - 1)].clone()?;
        Ok(ProviderResponse {
            message,
            usage: None,
            model: "e2e-model".into(),
        })
    }
}

fn think(text: &str, actions: &[(&str, serde_json::Value)]) -> Result<Message, ProviderError> {
    let requests = actions
        .iter()
        .map(|(name, args)| ActionRequest::new(*name, args.clone()))
        .collect();
    Ok(Message::assistant_with_actions(text, requests))
}

fn answer(text: &str) -> Result<Message, ProviderError> {
    Ok(Message::assistant(text))
}

// ── Canned Web Actions ───────────────────────────────────────────────────

/// `web_search` answering from a canned Tavily payload, rendered exactly
/// as the real action renders it.
struct CannedSearch {
    payload: serde_json::Value,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl CannedSearch {
    fn new(payload: serde_json::Value) -> Self {
        Self {
            payload,
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    fn slow(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

#[async_trait::async_trait]
impl Action for CannedSearch {
    fn name(&self) -> &str {
        "web_search"
    }

    fn description(&self) -> &str {
        "Canned web search"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "query": { "type": "string" } },
            "required": ["query"]
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<String, ActionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let response: SearchResponse = serde_json::from_value(self.payload.clone())
            .map_err(|e| ActionError::InvalidArguments(e.to_string()))?;
        Ok(format_search_results(&response))
    }
}

/// `web_extract` that always fails upstream.
struct BrokenExtract;

#[async_trait::async_trait]
impl Action for BrokenExtract {
    fn name(&self) -> &str {
        "web_extract"
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "properties": { "urls": { "type": "string" } },
            "required": ["urls"]
        })
    }

    async fn execute(&self, _arguments: serde_json::Value) -> Result<String, ActionError> {
        Err(ActionError::Failed {
            action: "web_extract".into(),
            reason: "HTTP 502".into(),
        })
    }
}

fn ai_payload() -> serde_json::Value {
    serde_json::json!({
        "results": [
            {
                "title": "Artificial intelligence - Overview",
                "url": "https://example.org/ai",
                "content": "Artificial intelligence is intelligence exhibited by machines.",
                "raw_content": null
            },
            {
                "title": "History of AI",
                "url": "https://example.org/ai-history",
                "content": "The field was founded in 1956.",
                "raw_content": null
            }
        ]
    })
}

// ── Harness ──────────────────────────────────────────────────────────────

fn engine_config() -> EngineConfig {
    let mut app = AppConfig::default();
    app.engine.retry.max_attempts = 1;
    app.engine.action_timeout_secs = 5;
    EngineConfig::from_app_config(&app)
}

fn registry(actions: Vec<Arc<dyn Action>>) -> ActionRegistry {
    let mut registry = ActionRegistry::new();
    for action in actions {
        registry.register(action);
    }
    registry
}

fn memory_store() -> Arc<ConversationStore> {
    Arc::new(ConversationStore::new(Arc::new(InMemoryStore::new())))
}

// ── Tests ────────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_search_and_cite() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        think(
            "I will search for a definition.",
            &[("web_search", serde_json::json!({"query": "What is AI?"}))],
        ),
        answer(
            "AI is intelligence exhibited by machines (https://example.org/ai), \
             a field founded in 1956 (https://example.org/ai-history). RESEARCH_COMPLETE",
        ),
    ]));
    let search = Arc::new(CannedSearch::new(ai_payload()));
    let store = memory_store();
    let engine = ResearchEngine::new(
        provider.clone(),
        registry(vec![search.clone()]),
        store.clone(),
        engine_config(),
    );

    let response = engine
        .run(ResearchRequest::new("What is AI?").on_thread("t1"))
        .await
        .unwrap();

    assert_eq!(provider.calls(), 2);
    assert_eq!(search.calls.load(Ordering::SeqCst), 1);
    assert!(!response.insufficient);
    assert_eq!(response.sources.len(), 2);
    assert_eq!(response.sources[0].url, "https://example.org/ai");
    assert_eq!(
        response.sources[0].title.as_deref(),
        Some("Artificial intelligence - Overview")
    );
    assert!(response.text.contains("[1]"));
    assert!(response.text.contains("[2]"));
    assert!(response.text.contains("## Sources"));

    // The model saw the action result on its second pass, system prompt first.
    let request = provider.last_request();
    assert_eq!(request.messages[0].role, Role::System);
    assert!(request.messages[0].content.contains("RESEARCH_COMPLETE"));
    assert!(request.messages.iter().any(|m| m.role == Role::ActionResult
        && m.content.contains("RESULT 1:")));
    assert_eq!(request.actions.len(), 1);
}

#[tokio::test]
async fn e2e_partial_action_failure_is_tolerated() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        think(
            "Search and extract in parallel.",
            &[
                ("web_search", serde_json::json!({"query": "AI"})),
                ("web_extract", serde_json::json!({"urls": "example.org/ai"})),
            ],
        ),
        answer("AI is covered at https://example.org/ai."),
    ]));
    let store = memory_store();
    let engine = ResearchEngine::new(
        provider,
        registry(vec![Arc::new(CannedSearch::new(ai_payload())), Arc::new(BrokenExtract)]),
        store.clone(),
        engine_config(),
    );

    let response = engine
        .run(ResearchRequest::new("AI").on_thread("t1"))
        .await
        .unwrap();
    assert!(!response.insufficient);

    let state = store.peek(&ThreadId::from("t1")).await.unwrap().unwrap();
    let results: Vec<&Message> = state
        .messages
        .iter()
        .filter(|m| m.role == Role::ActionResult)
        .collect();
    assert_eq!(results.len(), 2);
    // Results are recorded in request order.
    assert_eq!(results[0].metadata["success"], true);
    assert_eq!(results[1].metadata["success"], false);
    assert!(results[1].content.contains("HTTP 502"));
    assert!(!state.research_content.contains("HTTP 502"));
    assert!(state.validate().is_ok());
}

#[tokio::test]
async fn e2e_unconfigured_web_actions_yield_insufficient_answer() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        think(
            "Searching.",
            &[("web_search", serde_json::json!({"query": "quantum gravity"}))],
        ),
        answer("I could not verify anything."),
    ]));
    let actions = rustedscout_tools::default_registry(&ActionsConfig::default());
    let engine = ResearchEngine::new(provider, actions, memory_store(), engine_config());

    let response = engine
        .run(ResearchRequest::new("quantum gravity"))
        .await
        .unwrap();
    assert!(response.insufficient);
    assert!(response.sources.is_empty());
    assert!(response.text.starts_with("Insufficient information"));
    assert!(response.text.contains("I could not verify anything."));
}

#[tokio::test(start_paused = true)]
async fn e2e_slow_search_times_out_and_run_continues() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        think("Searching.", &[("web_search", serde_json::json!({"query": "AI"}))]),
        answer("Nothing found in time."),
    ]));
    let slow = Arc::new(CannedSearch::new(ai_payload()).slow(Duration::from_secs(30)));
    let store = memory_store();
    let engine = ResearchEngine::new(provider.clone(), registry(vec![slow]), store.clone(), engine_config());

    let response = engine.run(ResearchRequest::new("AI").on_thread("t1")).await.unwrap();
    assert_eq!(provider.calls(), 2);
    assert!(response.insufficient);

    let state = store.peek(&ThreadId::from("t1")).await.unwrap().unwrap();
    let result = state
        .messages
        .iter()
        .find(|m| m.role == Role::ActionResult)
        .unwrap();
    assert!(result.content.contains("timed out after 5s"));
}

#[tokio::test]
async fn e2e_checkpoints_survive_engine_restart() {
    let dir = tempfile::tempdir().unwrap();
    let backend: Arc<dyn CheckpointStore> = Arc::new(FileStore::new(dir.path()));

    // First process: the model is down, so the run stops after INIT.
    let failing = Arc::new(ScriptedProvider::new(vec![Err(
        ProviderError::AuthenticationFailed("expired key".into()),
    )]));
    let engine = ResearchEngine::new(
        failing,
        registry(vec![]),
        Arc::new(ConversationStore::new(backend.clone())),
        engine_config(),
    );
    let err = engine
        .run(ResearchRequest::new("What is AI?").on_thread("crash"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Reasoning);
    drop(engine);

    // Second process: a fresh store over the same directory resumes.
    let provider = Arc::new(ScriptedProvider::new(vec![
        think("Searching.", &[("web_search", serde_json::json!({"query": "AI"}))]),
        answer("See https://example.org/ai. RESEARCH_COMPLETE"),
    ]));
    let store = Arc::new(ConversationStore::new(Arc::new(FileStore::new(dir.path()))));
    let engine = ResearchEngine::new(
        provider,
        registry(vec![Arc::new(CannedSearch::new(ai_payload()))]),
        store.clone(),
        engine_config(),
    );
    let response = engine
        .resume(&ThreadId::from("crash"), RunOptions::default())
        .await
        .unwrap();
    assert_eq!(response.turns, 2);
    assert!(!response.insufficient);

    let state = store.peek(&ThreadId::from("crash")).await.unwrap().unwrap();
    assert!(state.finished);
    let queries = state.messages.iter().filter(|m| m.role == Role::User).count();
    assert_eq!(queries, 1);
    assert_eq!(store.list_threads().await.unwrap(), vec![ThreadId::from("crash")]);
}

#[tokio::test(start_paused = true)]
async fn e2e_queue_policy_serializes_runs_on_one_thread() {
    let provider = Arc::new(
        ScriptedProvider::new(vec![answer("Answer.")]).slow(Duration::from_secs(2)),
    );
    let mut config = engine_config();
    config.busy_policy = BusyPolicy::Queue;
    let store = memory_store();
    let engine = Arc::new(ResearchEngine::new(provider.clone(), registry(vec![]), store.clone(), config));

    let first = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run(ResearchRequest::new("one").on_thread("t")).await })
    };
    let second = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run(ResearchRequest::new("two").on_thread("t")).await })
    };
    assert!(first.await.unwrap().is_ok());
    assert!(second.await.unwrap().is_ok());
    assert_eq!(provider.calls(), 2);

    let state = store.peek(&ThreadId::from("t")).await.unwrap().unwrap();
    let queries: Vec<&str> = state
        .messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.as_str())
        .collect();
    assert_eq!(queries.len(), 2);
    assert!(state.validate().is_ok());
}

#[tokio::test(start_paused = true)]
async fn e2e_cancellation_during_actions_discards_the_batch() {
    let provider = Arc::new(ScriptedProvider::new(vec![
        think("Searching.", &[("web_search", serde_json::json!({"query": "AI"}))]),
        answer("unreachable"),
    ]));
    let slow = Arc::new(CannedSearch::new(ai_payload()).slow(Duration::from_secs(4)));
    let store = memory_store();
    let engine = Arc::new(ResearchEngine::new(provider, registry(vec![slow]), store.clone(), engine_config()));

    let cancel = CancellationToken::new();
    let (tx, mut rx) = tokio::sync::mpsc::channel(64);
    let run = {
        let engine = engine.clone();
        let options = RunOptions {
            cancel: Some(cancel.clone()),
            events: Some(tx),
            max_turns: None,
        };
        tokio::spawn(async move {
            engine
                .run_with(ResearchRequest::new("AI").on_thread("t1"), options)
                .await
        })
    };
    tokio::time::sleep(Duration::from_secs(1)).await;
    cancel.cancel();

    let err = run.await.unwrap().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cancelled);

    // Only the INIT checkpoint was written: the reasoning output whose
    // actions never completed is not persisted.
    let state = store.peek(&ThreadId::from("t1")).await.unwrap().unwrap();
    assert_eq!(state.messages.len(), 1);

    let mut saw_error = false;
    while let Ok(event) = rx.try_recv() {
        if let EngineEvent::Error { kind, .. } = event {
            assert_eq!(kind, "cancelled");
            saw_error = true;
        }
    }
    assert!(saw_error);
}
