//! The RustedScout execution engine.
//!
//! A research run is an explicit state machine:
//!
//! ```text
//! INIT -> REASONING -> ROUTING -> ACTING -> REASONING ... -> FORMATTING -> DONE
//! ```
//!
//! - [`reasoning::ReasoningStep`] wraps the model call with timeouts and retries
//! - [`router::route`] is the pure decision between looping and formatting
//! - [`dispatcher::ActionDispatcher`] runs a batch of actions concurrently
//! - [`formatter::CitationFormatter`] renders the cited answer
//! - [`engine::ResearchEngine`] drives the stages and checkpoints between them

pub mod cancel;
pub mod dispatcher;
pub mod engine;
pub mod formatter;
pub mod prompt;
pub mod reasoning;
pub mod router;
pub mod stream_event;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use cancel::{CancelAware, CancellationToken, await_or_cancel};
pub use dispatcher::ActionDispatcher;
pub use engine::{EngineConfig, ResearchEngine, ResearchRequest, ResearchResponse, RunOptions};
pub use formatter::{CitationFormatter, FinalResponse, Source};
pub use reasoning::{COMPLETION_MARKER, ModelSettings, ReasoningOutput, ReasoningStep};
pub use router::{Route, route};
pub use stream_event::{EngineEvent, Stage};
