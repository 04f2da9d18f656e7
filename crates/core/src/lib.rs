//! # RustedScout Core
//!
//! Domain types, capability traits, and error definitions for the RustedScout
//! research engine. This crate has **zero framework dependencies**: it defines
//! the domain model that the store, tools, providers and engine crates
//! implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is a trait here:
//! - [`Provider`]: the model call behind the reasoning step
//! - [`Action`]: one information-gathering capability (search, extract, crawl)
//! - [`CheckpointStore`]: durable storage for [`AgentState`] snapshots
//!
//! Implementations live in their respective crates and are injected into the
//! engine, so tests can swap any of them for scripted mocks.

pub mod action;
pub mod error;
pub mod message;
pub mod provider;
pub mod state;
pub mod store;

// Re-export key types at crate root for ergonomics
pub use action::{Action, ActionDefinition, ActionRegistry, ActionResult};
pub use error::{
    ActionError, DispatchError, Error, ErrorKind, ProviderError, ReasoningError, Result,
    StoreError,
};
pub use message::{ActionRequest, Message, Role, ThreadId};
pub use provider::{Provider, ProviderRequest, ProviderResponse, Usage};
pub use state::{AgentState, StateError};
pub use store::{CheckpointStore, ThreadGuard};
