//! Turn pipeline.
//!
//! Every user turn flows through:
//! 1. `ActionValidator::validate()`: action tokens checked against the last intent
//! 2. `actions::apply_action()`: deterministic control buttons
//! 3. `IntentClassifier::classify()`: auxiliary short-circuit, LLM, regex fallback
//! 4. `tracker::update_active_intent()`: the single open dialogue goal
//! 5. `ResponseSynthesizer::synthesize()`: reply, options, next stage
//!
//! `TurnOrchestrator` composes them and commits the session once per turn.

pub mod actions;
pub mod classifier;
pub mod fallback;
pub mod options;
pub mod orchestrator;
pub mod prompts;
pub mod rules;
pub mod synthesizer;
pub mod tracker;
pub mod types;
pub mod validator;

pub use classifier::{ClassificationContext, IntentClassifier};
pub use options::{ReplyOption, tokens};
pub use orchestrator::{TurnOrchestrator, TurnOutcome, TurnResult};
pub use rules::RulesEngine;
pub use synthesizer::{NextAction, ResponseSynthesizer, Synthesis, SynthesisContext};
pub use tracker::{TrackerUpdate, update_active_intent};
pub use types::{
    ActiveIntent, ClassificationSource, DeviceType, FallbackReason, IntentAnalysis, IntentKind,
    Urgency,
};
pub use validator::{
    ActionValidator, AlternativeAction, RejectionReason, ValidationContext, ValidationResult,
};
