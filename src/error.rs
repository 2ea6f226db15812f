//! Error types for the dialogue core.

use std::time::Duration;

/// Top-level error type for the dialogue core.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Dialogue error: {0}")]
    Dialogue(#[from] DialogueError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// Errors raised by the LLM collaborator.
///
/// None of these ever reach the user: the classifier and synthesizer recover
/// every variant locally with deterministic fallbacks.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("No LLM provider configured")]
    Unavailable,

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },

    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Invalid response from {provider}: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl LlmError {
    /// Short label for structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Unavailable => "unavailable",
            Self::Timeout { .. } => "timeout",
            Self::RequestFailed { .. } => "request_failed",
            Self::InvalidResponse { .. } => "invalid_response",
        }
    }
}

/// Dialogue-level outcomes that are errors in the taxonomy sense.
///
/// Only `InvalidTransition` is ever returned as `Err`, and only when strict
/// transitions are enabled. The orchestrator logs the other two at the
/// rejection and clarification sites; the turn itself still succeeds.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DialogueError {
    #[error("Action {action} rejected: {reason}")]
    ValidationRejection { action: String, reason: String },

    #[error("Input could not be classified (confidence {confidence:.2})")]
    UnclassifiableInput { confidence: f32 },

    #[error("Invalid stage transition from {from} to {to}")]
    InvalidTransition { from: String, to: String },
}
