//! Action trait: the abstraction over information-gathering capabilities.
//!
//! Actions are what let the research engine reach outside the conversation:
//! search the web, extract a page, crawl a site. To the engine each one is a
//! black box: structured arguments in, text out.

use crate::error::{ActionError, DispatchError};
use crate::message::{ActionRequest, Message};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// An action definition sent to the model so it knows what it can request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    /// The action name
    pub name: String,

    /// Description of what the action does
    pub description: String,

    /// JSON Schema describing the action's parameters
    pub parameters: serde_json::Value,
}

/// The core Action trait.
#[async_trait]
pub trait Action: Send + Sync {
    /// The unique name of this action (e.g. "web_search").
    fn name(&self) -> &str;

    /// A description of what this action does (sent to the model).
    fn description(&self) -> &str;

    /// JSON Schema describing this action's parameters.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Execute the action with the given arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<String, ActionError>;

    /// Argument names the request must carry, read from the schema's
    /// `required` list.
    fn required_arguments(&self) -> Vec<String> {
        self.parameters_schema()["required"]
            .as_array()
            .map(|names| {
                names
                    .iter()
                    .filter_map(|n| n.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Convert this action into an ActionDefinition for the model.
    fn to_definition(&self) -> ActionDefinition {
        ActionDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.parameters_schema(),
        }
    }
}

/// The outcome of one requested action.
#[derive(Debug, Clone, PartialEq)]
pub struct ActionResult {
    /// The originating request
    pub request: ActionRequest,

    /// Text result or the recovered failure
    pub outcome: Result<String, ActionError>,
}

impl ActionResult {
    pub fn is_success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The text recorded into history for this result.
    pub fn content(&self) -> String {
        match &self.outcome {
            Ok(text) => text.clone(),
            Err(e) => format!("action failed: {e}"),
        }
    }

    /// The action-result message answering the originating request.
    pub fn to_message(&self) -> Message {
        let mut msg = Message::action_result(&self.request, self.content());
        msg.metadata
            .insert("success".into(), serde_json::Value::Bool(self.is_success()));
        msg
    }
}

/// A registry of available actions.
///
/// Names are kept sorted so definitions sent to the model are deterministic.
#[derive(Clone, Default)]
pub struct ActionRegistry {
    actions: BTreeMap<String, Arc<dyn Action>>,
}

impl ActionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. Replaces any existing action with the same name.
    pub fn register(&mut self, action: Arc<dyn Action>) {
        let name = action.name().to_string();
        self.actions.insert(name, action);
    }

    /// Get an action by name.
    pub fn get(&self, name: &str) -> Option<Arc<dyn Action>> {
        self.actions.get(name).cloned()
    }

    /// All action definitions (for sending to the model).
    pub fn definitions(&self) -> Vec<ActionDefinition> {
        self.actions.values().map(|a| a.to_definition()).collect()
    }

    /// List all registered action names.
    pub fn names(&self) -> Vec<&str> {
        self.actions.keys().map(|s| s.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Check that a request names a known action and carries its required
    /// arguments.
    pub fn validate(&self, request: &ActionRequest) -> Result<Arc<dyn Action>, DispatchError> {
        let action = self
            .get(&request.name)
            .ok_or_else(|| DispatchError::UnknownAction {
                id: request.id.clone(),
                name: request.name.clone(),
            })?;

        let Some(args) = request.arguments.as_object() else {
            return Err(DispatchError::InvalidArguments {
                action: request.name.clone(),
            });
        };

        for required in action.required_arguments() {
            match args.get(&required) {
                None | Some(serde_json::Value::Null) => {
                    return Err(DispatchError::MissingArgument {
                        action: request.name.clone(),
                        argument: required,
                    });
                }
                Some(_) => {}
            }
        }

        Ok(action)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// A simple test action for unit tests.
    struct EchoAction;

    #[async_trait]
    impl Action for EchoAction {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "Echoes back the input"
        }
        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({
                "type": "object",
                "properties": {
                    "text": { "type": "string" }
                },
                "required": ["text"]
            })
        }
        async fn execute(&self, arguments: serde_json::Value) -> Result<String, ActionError> {
            Ok(arguments["text"].as_str().unwrap_or("").to_string())
        }
    }

    fn registry() -> ActionRegistry {
        let mut registry = ActionRegistry::new();
        registry.register(Arc::new(EchoAction));
        registry
    }

    #[test]
    fn registry_register_and_lookup() {
        let registry = registry();
        assert!(registry.get("echo").is_some());
        assert!(registry.get("nonexistent").is_none());
        assert_eq!(registry.names(), vec!["echo"]);
    }

    #[test]
    fn registry_definitions() {
        let defs = registry().definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }

    #[test]
    fn required_arguments_come_from_schema() {
        assert_eq!(EchoAction.required_arguments(), vec!["text".to_string()]);
    }

    #[test]
    fn validate_rejects_unknown_and_incomplete_requests() {
        let registry = registry();

        let unknown = ActionRequest::new("teleport", serde_json::json!({}));
        assert!(matches!(
            registry.validate(&unknown),
            Err(DispatchError::UnknownAction { .. })
        ));

        let missing = ActionRequest::new("echo", serde_json::json!({"other": 1}));
        assert_eq!(
            registry.validate(&missing).err(),
            Some(DispatchError::MissingArgument {
                action: "echo".into(),
                argument: "text".into(),
            })
        );

        let not_object = ActionRequest::new("echo", serde_json::json!("text"));
        assert!(matches!(
            registry.validate(&not_object),
            Err(DispatchError::InvalidArguments { .. })
        ));

        let ok = ActionRequest::new("echo", serde_json::json!({"text": "hi"}));
        assert!(registry.validate(&ok).is_ok());
    }

    #[tokio::test]
    async fn validated_action_executes() {
        let registry = registry();
        let req = ActionRequest::new("echo", serde_json::json!({"text": "hello world"}));
        let action = registry.validate(&req).unwrap();
        assert_eq!(action.execute(req.arguments.clone()).await.unwrap(), "hello world");
    }

    #[test]
    fn failed_result_is_recorded_as_text() {
        let req = ActionRequest::new("web_search", serde_json::json!({"query": "q"}));
        let result = ActionResult {
            request: req.clone(),
            outcome: Err(ActionError::Timeout {
                action: "web_search".into(),
                timeout_secs: 30,
            }),
        };
        assert!(!result.is_success());
        assert_eq!(result.content(), "action failed: web_search timed out after 30s");

        let msg = result.to_message();
        assert_eq!(msg.action_id.as_deref(), Some(req.id.as_str()));
        assert_eq!(msg.metadata["success"], false);
    }
}
