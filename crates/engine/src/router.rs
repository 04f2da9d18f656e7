//! Router: the pure decision between acting, formatting and giving up.

use crate::reasoning::ReasoningOutput;
use rustedscout_core::message::Role;
use rustedscout_core::state::AgentState;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    /// Run the requested actions, then reason again.
    ContinueWithActions,
    /// Produce the final answer.
    Format,
    /// The state cannot be continued; abort the run.
    Terminate,
}

/// Pick the next stage after a reasoning pass.
///
/// Precedence: an inconsistent state terminates; the turn cap wins over
/// pending actions; a raised completion flag wins over pending actions;
/// otherwise actions continue the loop and anything else is formatted.
pub fn route(state: &AgentState, output: &ReasoningOutput, max_turns: u32) -> Route {
    // The reasoning output must be the newest history entry.
    match state.messages.last() {
        Some(last) if last.role == Role::Assistant && last.actions == output.actions() => {}
        _ => return Route::Terminate,
    }

    if state.turn >= max_turns || state.is_research_complete {
        return Route::Format;
    }

    match output {
        ReasoningOutput::ActionRequest { actions } if !actions.is_empty() => {
            Route::ContinueWithActions
        }
        _ => Route::Format,
    }
}
