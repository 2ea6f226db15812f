//! Dialogue stages.
//!
//! Onboarding walks language → name → need. After that the conversation
//! carries either a declared diagnostic/escalation stage or a contextual
//! label set by the synthesizer. `StageMachine` applies every change and
//! keeps the audit trail on the session.

pub mod manager;
pub mod state;

pub use manager::StageMachine;
pub use state::{DECLARED_STAGES, Stage};
