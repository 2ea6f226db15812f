//! Helpdesk dialogue: conversation core for a bilingual tech-support assistant.

pub mod config;
pub mod error;
pub mod llm;
pub mod locale;
pub mod onboarding;
pub mod pipeline;
pub mod session;

pub use config::{ClarificationPolicy, DialogueConfig, LowConfidenceAction};
pub use error::{ConfigError, DialogueError, Error, LlmError};
pub use locale::Language;
pub use onboarding::{Stage, StageMachine};
pub use pipeline::{TurnOrchestrator, TurnOutcome, TurnResult};
pub use session::Session;
