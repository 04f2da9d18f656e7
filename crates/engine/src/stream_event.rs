//! Engine-level streaming events.
//!
//! `EngineEvent` reports stage transitions and intermediate results of a
//! run so callers can observe progress. Every event carries the stage it
//! belongs to. Events are observational only; a run's outcome never depends
//! on whether anybody listens.

use rustedscout_core::message::ActionRequest;
use serde::{Deserialize, Serialize};

/// Stages of the execution state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Reasoning,
    Routing,
    Acting,
    Formatting,
    Done,
    Failed,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Reasoning => "reasoning",
            Self::Routing => "routing",
            Self::Acting => "acting",
            Self::Formatting => "formatting",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events emitted by the engine during a run.
///
/// - `stage`: a stage was entered
/// - `reasoning`: a reasoning pass produced output
/// - `action_result`: one action of a batch finished
/// - `checkpoint`: state was durably saved
/// - `done`: the run produced its final answer
/// - `error`: the run failed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EngineEvent {
    Stage { stage: Stage, turn: u32 },

    Reasoning {
        stage: Stage,
        turn: u32,
        content: String,
        actions: Vec<ActionRequest>,
        research_complete: bool,
    },

    ActionResult {
        stage: Stage,
        id: String,
        name: String,
        success: bool,
        output: String,
    },

    Checkpoint {
        stage: Stage,
        thread_id: String,
        messages: usize,
    },

    Done {
        stage: Stage,
        thread_id: String,
        turns: u32,
        text: String,
    },

    Error {
        stage: Stage,
        kind: String,
        message: String,
    },
}

impl EngineEvent {
    /// Event name, matching the serialized `type` tag.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Stage { .. } => "stage",
            Self::Reasoning { .. } => "reasoning",
            Self::ActionResult { .. } => "action_result",
            Self::Checkpoint { .. } => "checkpoint",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn stage(&self) -> Stage {
        match self {
            Self::Stage { stage, .. }
            | Self::Reasoning { stage, .. }
            | Self::ActionResult { stage, .. }
            | Self::Checkpoint { stage, .. }
            | Self::Done { stage, .. }
            | Self::Error { stage, .. } => *stage,
        }
    }
}
