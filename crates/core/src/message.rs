//! Message and thread domain types.
//!
//! These are the value objects that flow through the whole engine:
//! user query → reasoning (assistant message, maybe with action requests)
//! → action results → reasoning → formatted answer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque key identifying a persistent conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ThreadId(pub String);

impl ThreadId {
    /// A fresh random thread id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl std::fmt::Display for ThreadId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// The end user
    User,
    /// The reasoning step (or the formatter's final answer)
    Assistant,
    /// System instructions; only ever sent to the model, never checkpointed
    System,
    /// Result of one executed action
    ActionResult,
}

/// One requested action, attached to an assistant message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Unique id for this request (matches the model's tool-use id)
    pub id: String,

    /// Name of the action to run (e.g. "web_search")
    pub name: String,

    /// Structured arguments, a JSON object
    #[serde(default)]
    pub arguments: serde_json::Value,
}

impl ActionRequest {
    pub fn new(name: impl Into<String>, arguments: serde_json::Value) -> Self {
        Self {
            id: format!("call_{}", Uuid::new_v4().simple()),
            name: name.into(),
            arguments,
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }
}

/// A single entry in the conversation history. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique message ID
    #[serde(default)]
    pub id: String,

    /// Who produced this message
    pub role: Role,

    /// The text content
    #[serde(default)]
    pub content: String,

    /// Actions requested by the assistant (if any)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<ActionRequest>,

    /// If this is an action result, which request it answers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,

    /// Optional metadata (action name, model, ...)
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    pub metadata: serde_json::Map<String, serde_json::Value>,
}

impl Message {
    fn with_role(role: Role, content: String) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            role,
            content,
            actions: Vec::new(),
            action_id: None,
            timestamp: Utc::now(),
            metadata: serde_json::Map::new(),
        }
    }

    /// Create a new user message.
    pub fn user(content: impl Into<String>) -> Self {
        Self::with_role(Role::User, content.into())
    }

    /// Create a new assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::with_role(Role::Assistant, content.into())
    }

    /// Create an assistant message that requests actions.
    pub fn assistant_with_actions(content: impl Into<String>, actions: Vec<ActionRequest>) -> Self {
        let mut msg = Self::with_role(Role::Assistant, content.into());
        msg.actions = actions;
        msg
    }

    /// Create a new system message.
    pub fn system(content: impl Into<String>) -> Self {
        Self::with_role(Role::System, content.into())
    }

    /// Create an action result message answering `request`.
    pub fn action_result(request: &ActionRequest, content: impl Into<String>) -> Self {
        let mut msg = Self::with_role(Role::ActionResult, content.into());
        msg.action_id = Some(request.id.clone());
        msg.metadata.insert(
            "action".into(),
            serde_json::Value::String(request.name.clone()),
        );
        msg
    }

    /// Whether this assistant message requests any actions.
    pub fn has_actions(&self) -> bool {
        !self.actions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_user_message() {
        let msg = Message::user("What is AI?");
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "What is AI?");
        assert!(!msg.has_actions());
        assert!(msg.action_id.is_none());
    }

    #[test]
    fn action_result_links_to_request() {
        let req = ActionRequest::new("web_search", serde_json::json!({"query": "ai"}))
            .with_id("toolu_1");
        let msg = Message::action_result(&req, "RESULT 1: ...");
        assert_eq!(msg.role, Role::ActionResult);
        assert_eq!(msg.action_id.as_deref(), Some("toolu_1"));
        assert_eq!(msg.metadata["action"], "web_search");
    }

    #[test]
    fn role_serializes_snake_case() {
        let json = serde_json::to_string(&Role::ActionResult).unwrap();
        assert_eq!(json, r#""action_result""#);
    }

    #[test]
    fn message_tolerates_missing_and_unknown_fields() {
        let json = r#"{"role":"user","content":"hi","future_field":42}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.role, Role::User);
        assert_eq!(msg.content, "hi");
        assert!(msg.actions.is_empty());
        assert!(msg.id.is_empty());
    }

    #[test]
    fn generated_request_ids_are_unique() {
        let a = ActionRequest::new("web_search", serde_json::json!({}));
        let b = ActionRequest::new("web_search", serde_json::json!({}));
        assert_ne!(a.id, b.id);
        assert!(a.id.starts_with("call_"));
    }
}
