//! Shared test helpers: a scripted provider and controllable actions.

use async_trait::async_trait;
use rustedscout_core::action::Action;
use rustedscout_core::error::{ActionError, ProviderError};
use rustedscout_core::message::{ActionRequest, Message};
use rustedscout_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// A mock provider that returns a sequence of scripted results.
///
/// Each call to `complete` returns the next entry. Once the script is
/// exhausted the last entry is repeated, so "keeps requesting actions"
/// scenarios need only one scripted response.
pub struct SequentialMockProvider {
    responses: Vec<Result<ProviderResponse, ProviderError>>,
    call_count: AtomicUsize,
    delay: Option<Duration>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Result<ProviderResponse, ProviderError>>) -> Self {
        Self {
            responses,
            call_count: AtomicUsize::new(0),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Delay every call, to exercise timeouts and cancellation.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let index = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self
            .responses
            .get(index)
            .or_else(|| self.responses.last())
            .unwrap_or_else(|| panic!("SequentialMockProvider: no responses scripted"));
        scripted.clone()
    }
}

/// A plain text response (no action requests).
pub fn text_response(text: &str) -> ProviderResponse {
    ProviderResponse {
        message: Message::assistant(text),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        model: "mock-model".into(),
    }
}

/// A response requesting the given `(name, arguments)` actions.
pub fn action_response(thought: &str, actions: &[(&str, serde_json::Value)]) -> ProviderResponse {
    let requests = actions
        .iter()
        .map(|(name, args)| ActionRequest::new(*name, args.clone()))
        .collect();
    ProviderResponse {
        message: Message::assistant_with_actions(thought, requests),
        usage: None,
        model: "mock-model".into(),
    }
}

/// An action returning canned text after an optional delay, or failing.
pub struct MockAction {
    name: String,
    output: Result<String, String>,
    delay: Option<Duration>,
    calls: AtomicUsize,
}

impl MockAction {
    pub fn ok(name: &str, output: &str) -> Self {
        Self {
            name: name.into(),
            output: Ok(output.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &str, reason: &str) -> Self {
        Self {
            name: name.into(),
            output: Err(reason.into()),
            delay: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Action for MockAction {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Mock action for tests"
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
        self.output.clone().map_err(|reason| ActionError::Failed {
            action: self.name.clone(),
            reason,
        })
    }
}
