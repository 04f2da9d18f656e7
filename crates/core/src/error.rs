//! Error types for the RustedScout domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; the engine boundary folds
//! them into [`Error`], which always carries a stable [`ErrorKind`].

use thiserror::Error;

/// The top-level error returned at the engine boundary.
///
/// Local, recoverable failures ([`ActionError`]) never reach this type: the
/// dispatcher records them into the conversation instead.
#[derive(Debug, Error)]
pub enum Error {
    // --- Reasoning ---
    #[error("Reasoning failed: {0}")]
    Reasoning(#[from] ReasoningError),

    // --- Dispatch ---
    #[error("Malformed action request: {0}")]
    Dispatch(#[from] DispatchError),

    // --- Persistence ---
    #[error("Checkpoint persistence failed: {0}")]
    Persistence(StoreError),

    #[error("Thread '{thread_id}' is busy with another invocation")]
    ThreadBusy { thread_id: String },

    // --- Run control ---
    #[error("Run cancelled during {stage}")]
    Cancelled { stage: String },

    #[error("Turn exceeded its overall timeout of {timeout_secs}s")]
    TurnTimeout { timeout_secs: u64 },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    // --- Configuration ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ThreadBusy { thread_id } => Error::ThreadBusy { thread_id },
            other => Error::Persistence(other),
        }
    }
}

/// Stable, machine-readable classification of an engine [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Reasoning,
    Dispatch,
    Persistence,
    ThreadBusy,
    Cancelled,
    TurnTimeout,
    InvalidRequest,
    Config,
    Internal,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Reasoning => "reasoning",
            Self::Dispatch => "dispatch",
            Self::Persistence => "persistence",
            Self::ThreadBusy => "thread_busy",
            Self::Cancelled => "cancelled",
            Self::TurnTimeout => "turn_timeout",
            Self::InvalidRequest => "invalid_request",
            Self::Config => "config",
            Self::Internal => "internal",
        }
    }

    /// Whether the caller may simply retry the same request later.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Reasoning | Self::Persistence | Self::ThreadBusy | Self::TurnTimeout
        )
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Reasoning(_) => ErrorKind::Reasoning,
            Self::Dispatch(_) => ErrorKind::Dispatch,
            Self::Persistence(_) => ErrorKind::Persistence,
            Self::ThreadBusy { .. } => ErrorKind::ThreadBusy,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::TurnTimeout { .. } => ErrorKind::TurnTimeout,
            Self::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Self::Config { .. } => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Transport-level failures of the model backend.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Malformed provider response: {0}")]
    MalformedResponse(String),
}

impl ProviderError {
    /// Transient failures are worth another attempt after backoff.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. }
            | Self::Timeout(_)
            | Self::Network(_)
            | Self::MalformedResponse(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::AuthenticationFailed(_) | Self::NotConfigured(_) => false,
        }
    }
}

/// Failure of the reasoning step after its own retry policy ran.
#[derive(Debug, Clone, Error)]
pub enum ReasoningError {
    #[error("model call failed after {attempts} attempt(s): {last_error}")]
    Exhausted { attempts: u32, last_error: String },

    #[error("model call failed and is not retryable: {0}")]
    NonRetryable(String),

    #[error("model call timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("model returned malformed output: {0}")]
    Malformed(String),

    #[error("conversation has no user query to reason about")]
    EmptyConversation,
}

/// A batch of action requests that cannot be executed at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("unknown action '{name}' (request {id})")]
    UnknownAction { id: String, name: String },

    #[error("action '{action}' is missing required argument '{argument}'")]
    MissingArgument { action: String, argument: String },

    #[error("action '{action}' arguments must be a JSON object")]
    InvalidArguments { action: String },
}

/// Failure of one individual action; recovered locally by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionError {
    #[error("{action} failed: {reason}")]
    Failed { action: String, reason: String },

    #[error("{action} timed out after {timeout_secs}s")]
    Timeout { action: String, timeout_secs: u64 },

    #[error("{action} is not configured: {reason}")]
    NotConfigured { action: String, reason: String },

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
}

/// Checkpoint storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Checkpoint serialization failed: {0}")]
    Serialization(String),

    #[error("Checkpoint for thread '{thread_id}' is invalid: {reason}")]
    InvalidCheckpoint { thread_id: String, reason: String },

    #[error("Thread '{thread_id}' is busy")]
    ThreadBusy { thread_id: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        };
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn provider_error_retry_classification() {
        assert!(ProviderError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(ProviderError::Network("reset".into()).is_retryable());
        assert!(
            ProviderError::ApiError {
                status_code: 503,
                message: "overloaded".into()
            }
            .is_retryable()
        );
        assert!(
            !ProviderError::ApiError {
                status_code: 400,
                message: "bad".into()
            }
            .is_retryable()
        );
        assert!(!ProviderError::AuthenticationFailed("nope".into()).is_retryable());
    }

    #[test]
    fn store_busy_maps_to_thread_busy_kind() {
        let err: Error = StoreError::ThreadBusy {
            thread_id: "t1".into(),
        }
        .into();
        assert_eq!(err.kind(), ErrorKind::ThreadBusy);
        assert!(err.to_string().contains("t1"));

        let err: Error = StoreError::Storage("disk full".into()).into();
        assert_eq!(err.kind(), ErrorKind::Persistence);
    }

    #[test]
    fn error_kinds_are_stable_strings() {
        let err = Error::Reasoning(ReasoningError::Timeout { timeout_secs: 30 });
        assert_eq!(err.kind().as_str(), "reasoning");
        let err = Error::Dispatch(DispatchError::UnknownAction {
            id: "call_1".into(),
            name: "teleport".into(),
        });
        assert_eq!(err.kind().to_string(), "dispatch");
        assert!(err.to_string().contains("teleport"));
        assert!(!ErrorKind::Dispatch.is_retryable());
        assert!(ErrorKind::ThreadBusy.is_retryable());
    }
}
