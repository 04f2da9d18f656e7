//! The checkpointed research state of one thread.

use crate::message::{Message, Role};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// The unit of checkpointing: everything needed to resume a thread.
///
/// Every field has a serde default and unknown fields are ignored, so older
/// and newer checkpoints load without migration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentState {
    /// Ordered, append-only conversation history
    pub messages: Vec<Message>,

    /// Accumulated findings from successful actions
    pub research_content: String,

    /// Set once the reasoning step or router judges the research sufficient
    pub is_research_complete: bool,

    /// Reasoning passes completed in the current run
    pub turn: u32,

    /// Whether the current run reached a formatted answer
    pub finished: bool,
}

/// Violations of the [`AgentState`] invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateError {
    #[error("conversation has no messages")]
    Empty,

    #[error("action result at position {index} answers unknown request '{action_id}'")]
    OrphanActionResult { index: usize, action_id: String },

    #[error("action result at position {index} has no request id")]
    MissingActionId { index: usize },

    #[error("request '{action_id}' was answered more than once")]
    DuplicateActionResult { action_id: String },
}

impl AgentState {
    /// A state seeded with the user's query.
    pub fn new(query: impl Into<String>) -> Self {
        let mut state = Self::default();
        state.begin_query(query);
        state
    }

    /// Start a new top-level query on this thread.
    ///
    /// Resets the completion flag and turn counter; history and research
    /// content are kept. Submitting the same query again while it is still
    /// unanswered and nothing else happened does not duplicate the message.
    /// Returns whether a new user message was appended.
    pub fn begin_query(&mut self, query: impl Into<String>) -> bool {
        let query = query.into();
        self.is_research_complete = false;
        self.turn = 0;
        self.finished = false;

        let repeated = matches!(
            self.messages.last(),
            Some(last) if last.role == Role::User && last.content == query
        );
        if repeated {
            return false;
        }
        self.messages.push(Message::user(query));
        true
    }

    /// Append one message to the history.
    pub fn push(&mut self, message: Message) {
        self.messages.push(message);
    }

    /// Flip the completion flag. Returns `true` only on the false→true edge.
    pub fn mark_research_complete(&mut self) -> bool {
        if self.is_research_complete {
            return false;
        }
        self.is_research_complete = true;
        true
    }

    /// Append a headed section of findings to `research_content`.
    pub fn append_research(&mut self, heading: &str, body: &str) {
        let body = body.trim();
        if body.is_empty() {
            return;
        }
        if !self.research_content.is_empty() {
            self.research_content.push_str("\n\n");
        }
        self.research_content.push_str("### ");
        self.research_content.push_str(heading);
        self.research_content.push('\n');
        self.research_content.push_str(body);
    }

    /// The most recent user query, if any.
    pub fn latest_query(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }

    /// Messages produced since (and including) the latest user query.
    pub fn current_run(&self) -> &[Message] {
        let start = self
            .messages
            .iter()
            .rposition(|m| m.role == Role::User)
            .unwrap_or(0);
        &self.messages[start..]
    }

    /// Whether an interrupted run can be continued from this checkpoint.
    pub fn is_resumable(&self) -> bool {
        !self.finished && self.latest_query().is_some()
    }

    /// Check the causal invariants of the history.
    pub fn validate(&self) -> Result<(), StateError> {
        if self.messages.is_empty() {
            return Err(StateError::Empty);
        }

        let mut requested: HashSet<&str> = HashSet::new();
        let mut answered: HashSet<&str> = HashSet::new();

        for (index, message) in self.messages.iter().enumerate() {
            match message.role {
                Role::Assistant => {
                    requested.extend(message.actions.iter().map(|a| a.id.as_str()));
                }
                Role::ActionResult => {
                    let Some(action_id) = message.action_id.as_deref() else {
                        return Err(StateError::MissingActionId { index });
                    };
                    if !requested.contains(action_id) {
                        return Err(StateError::OrphanActionResult {
                            index,
                            action_id: action_id.to_string(),
                        });
                    }
                    if !answered.insert(action_id) {
                        return Err(StateError::DuplicateActionResult {
                            action_id: action_id.to_string(),
                        });
                    }
                }
                Role::User | Role::System => {}
            }
        }

        Ok(())
    }
}
