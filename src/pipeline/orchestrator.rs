//! Turn orchestrator: one call per user turn.
//!
//! Flow:
//! 1. Validate an action token against the last detected intent
//! 2. Control buttons (onboarding, outcomes, escalation) answer directly
//! 3. Classify the utterance (or the pressed option's label)
//! 4. Low-confidence policy for the current stage
//! 5. Active-intent tracker and slot updates
//! 6. Synthesize, then move to the reply's contextual stage
//!
//! All mutation happens on a draft copy of the session that is committed
//! with a single assignment at the end, so a turn dropped mid-way (for
//! example on cancellation at a collaborator call) leaves no partial state.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::{DialogueConfig, LowConfidenceAction};
use crate::error::DialogueError;
use crate::llm::LlmGateway;
use crate::locale::Language;
use crate::onboarding::{Stage, StageMachine};
use crate::pipeline::actions::{self, ActionOutcome};
use crate::pipeline::classifier::{ClassificationContext, IntentClassifier};
use crate::pipeline::fallback;
use crate::pipeline::options::{self, tokens, ReplyOption};
use crate::pipeline::rules::RulesEngine;
use crate::pipeline::synthesizer::{NextAction, ResponseSynthesizer, SynthesisContext};
use crate::pipeline::tracker::{self, TrackerUpdate};
use crate::pipeline::types::{ActiveIntent, IntentAnalysis, IntentKind};
use crate::pipeline::validator::{ActionValidator, ValidationContext, ValidationResult};
use crate::session::{NeedType, Session};

/// Reply for one handled turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnResult {
    pub reply: String,
    pub options: Vec<ReplyOption>,
    pub stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent_detected: Option<IntentKind>,
    pub reasoning: String,
    /// Present when an action token was rejected.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub validation: Option<ValidationResult>,
}

/// Result of `handle_turn`.
#[derive(Debug, Clone, PartialEq)]
pub enum TurnOutcome {
    Handled(TurnResult),
    /// The core declines this turn so an external onboarding validator can
    /// answer. The session is left untouched.
    NotHandled,
}

impl TurnOutcome {
    pub fn into_result(self) -> Option<TurnResult> {
        match self {
            Self::Handled(result) => Some(result),
            Self::NotHandled => None,
        }
    }
}

/// Composes validator, classifier, tracker and synthesizer.
///
/// Holds only read-only state, so one instance can serve every session.
#[derive(Debug, Clone)]
pub struct TurnOrchestrator {
    classifier: IntentClassifier,
    synthesizer: ResponseSynthesizer,
    validator: ActionValidator,
    stages: StageMachine,
    config: DialogueConfig,
}

impl TurnOrchestrator {
    pub fn new(gateway: LlmGateway, config: DialogueConfig) -> Self {
        let rules = Arc::new(RulesEngine::default_rules());
        Self {
            classifier: IntentClassifier::new(gateway.clone(), rules, &config),
            synthesizer: ResponseSynthesizer::new(gateway, &config),
            validator: ActionValidator::new(),
            stages: StageMachine::new(config.strict_transitions),
            config,
        }
    }

    pub fn stage_machine(&self) -> &StageMachine {
        &self.stages
    }

    pub fn classifier(&self) -> &IntentClassifier {
        &self.classifier
    }

    pub fn synthesizer(&self) -> &ResponseSynthesizer {
        &self.synthesizer
    }

    pub fn validator(&self) -> &ActionValidator {
        &self.validator
    }

    /// Process one turn. Never fails; collaborator problems degrade to
    /// deterministic replies.
    ///
    /// `locale` overrides the session locale for this and later turns.
    pub async fn handle_turn(
        &self,
        utterance: &str,
        action_token: Option<&str>,
        session: &mut Session,
        locale: Option<&str>,
    ) -> TurnOutcome {
        let mut draft = session.clone();
        if let Some(locale) = locale.map(str::trim).filter(|l| !l.is_empty()) {
            draft.locale = locale.to_string();
        }
        let language = draft.language();
        let mut text = utterance.trim().to_string();

        if let Some(token) = action_token.map(str::trim).filter(|t| !t.is_empty()) {
            let shown = options::label_for(token, language).unwrap_or(token).to_string();

            let validation = self.validator.validate(
                token,
                draft.last_detected_intent,
                &ValidationContext {
                    has_attempted_basic_tests: draft.has_attempted_basic_tests(),
                    language,
                },
            );
            if !validation.is_valid {
                let result = self.rejected(&mut draft, token, &shown, validation, language);
                *session = draft;
                return TurnOutcome::Handled(result);
            }

            match actions::apply_action(token, &mut draft, &self.stages, language) {
                ActionOutcome::Reply {
                    reply,
                    options,
                    reasoning,
                } => {
                    debug!(session = %draft.id, action = token, "Action answered");
                    draft.push_user(shown);
                    draft.push_bot(reply.clone());
                    let result = TurnResult {
                        reply,
                        options,
                        stage: draft.stage.clone(),
                        intent_detected: None,
                        reasoning,
                        validation: None,
                    };
                    *session = draft;
                    return TurnOutcome::Handled(result);
                }
                ActionOutcome::Anchored { analysis } => {
                    let result = self.respond(&mut draft, &shown, &analysis, false).await;
                    *session = draft;
                    return TurnOutcome::Handled(result);
                }
                ActionOutcome::Text => {
                    if text.is_empty() {
                        text = shown;
                    }
                }
            }
        }

        if text.is_empty() {
            let result = self.clarify(&mut draft, &text, None, "empty turn");
            *session = draft;
            return TurnOutcome::Handled(result);
        }

        let classified = {
            let context = ClassificationContext {
                active_intent: draft.unresolved_intent(),
                stage: &draft.stage,
            };
            self.classifier.classify(&text, &context, language).await
        };

        let policy = &self.config.clarification;
        let unsure = classified.clarification_needed || policy.is_low(classified.confidence);
        // An unsure reading never displaces the open goal.
        let analysis = match draft.unresolved_intent() {
            Some(active) if unsure => {
                debug!(
                    goal = %active.kind,
                    classified = %classified.intent,
                    confidence = classified.confidence,
                    "Low confidence, anchoring to the open goal"
                );
                anchor_to_goal(active, &text, classified)
            }
            _ => classified,
        };
        draft.last_detected_intent = Some(analysis.intent);
        draft.last_intent_confidence = Some(analysis.confidence);

        if unsure && draft.unresolved_intent().is_none() {
            match policy.action_for(&draft.stage) {
                LowConfidenceAction::DeclineTurn => {
                    info!(
                        session = %session.id,
                        stage = %draft.stage,
                        confidence = analysis.confidence,
                        "Turn declined for external onboarding handling"
                    );
                    return TurnOutcome::NotHandled;
                }
                LowConfidenceAction::Clarify => {
                    let result = self.clarify(&mut draft, &text, Some(&analysis), "low confidence");
                    *session = draft;
                    return TurnOutcome::Handled(result);
                }
                LowConfidenceAction::ProceedToSynthesis => {
                    debug!(stage = %draft.stage, "Low confidence, synthesizing anyway");
                }
            }
        }

        let update = tracker::update_active_intent(&mut draft, &analysis, &text);
        apply_slots(&mut draft, &analysis, &text, update);

        let result = self.respond(&mut draft, &text, &analysis, true).await;
        *session = draft;
        TurnOutcome::Handled(result)
    }

    /// Synthesize, move to the contextual stage, append the transcript.
    async fn respond(
        &self,
        draft: &mut Session,
        user_text: &str,
        analysis: &IntentAnalysis,
        contextual_stage: bool,
    ) -> TurnResult {
        let language = draft.language();
        let synthesis = {
            let context = SynthesisContext::from_session(draft, self.config.transcript_window);
            self.synthesizer
                .synthesize(analysis, user_text, &context, language)
                .await
        };

        if contextual_stage && draft.stage.is_post_onboarding() && !draft.stage.is_terminal() {
            if let Some(stage) = synthesis.next_action.stage() {
                actions::move_to(&self.stages, draft, stage);
            }
        }
        if synthesis.next_action == NextAction::CloseConversation {
            if let Some(active) = draft.active_intent.as_mut() {
                active.resolved = true;
            }
        }

        info!(
            session = %draft.id,
            intent = %analysis.intent,
            path = analysis.source.label(),
            stage = %draft.stage,
            fallback = synthesis.from_fallback,
            "Turn handled"
        );

        draft.push_user(user_text);
        draft.push_bot(synthesis.reply.clone());

        TurnResult {
            reply: synthesis.reply,
            options: synthesis.options,
            stage: draft.stage.clone(),
            intent_detected: Some(analysis.intent),
            reasoning: format!("{}; {}", analysis.reasoning, synthesis.reasoning),
            validation: None,
        }
    }

    /// Generic clarification prompt with no options.
    fn clarify(
        &self,
        draft: &mut Session,
        user_text: &str,
        analysis: Option<&IntentAnalysis>,
        why: &str,
    ) -> TurnResult {
        let language = draft.language();
        let reply = fallback::clarification(language);
        draft.attempts.clarifications += 1;
        if !user_text.is_empty() {
            draft.push_user(user_text);
        }
        draft.push_bot(reply.clone());

        let error = DialogueError::UnclassifiableInput {
            confidence: analysis.map(|a| a.confidence).unwrap_or(0.0),
        };
        info!(
            session = %draft.id,
            stage = %draft.stage,
            attempts = draft.attempts.clarifications,
            error = %error,
            "Clarification requested"
        );

        let reasoning = match analysis {
            Some(a) => format!("clarification: {why} ({})", a.reasoning),
            None => format!("clarification: {why}"),
        };
        TurnResult {
            reply,
            options: Vec::new(),
            stage: draft.stage.clone(),
            intent_detected: analysis.map(|a| a.intent),
            reasoning,
            validation: None,
        }
    }

    /// Corrective reply for a rejected action. The stage is not touched.
    fn rejected(
        &self,
        draft: &mut Session,
        token: &str,
        shown: &str,
        validation: ValidationResult,
        language: Language,
    ) -> TurnResult {
        let reason = validation.reason.map(|r| r.as_str()).unwrap_or("rejected");
        let error = DialogueError::ValidationRejection {
            action: token.to_string(),
            reason: reason.to_string(),
        };
        info!(session = %draft.id, stage = %draft.stage, error = %error, "Action not applied");

        let reply = validation
            .message
            .clone()
            .unwrap_or_else(|| fallback::clarification(language));
        let mut choices = Vec::with_capacity(2);
        if let Some(alternative) = validation.alternative_action {
            choices.push(alternative.option_token());
        }
        if !choices.contains(&tokens::CONNECT_TECH) {
            choices.push(tokens::CONNECT_TECH);
        }

        draft.push_user(shown);
        draft.push_bot(reply.clone());

        TurnResult {
            reply,
            options: options::options(&choices, language),
            stage: draft.stage.clone(),
            intent_detected: draft.last_detected_intent,
            reasoning: format!("validation: {reason}"),
            validation: Some(validation),
        }
    }
}

/// Re-read an unsure classification as a reply to the open goal, keeping
/// any slots it detected.
fn anchor_to_goal(active: &ActiveIntent, text: &str, classified: IntentAnalysis) -> IntentAnalysis {
    let mut anchored = actions::anchored_analysis(active, text);
    anchored.device_type = classified.device_type.or(anchored.device_type);
    anchored.operating_system = classified.operating_system;
    anchored.device_brand = classified.device_brand;
    anchored
}

/// Copy detected slots onto the session.
fn apply_slots(session: &mut Session, analysis: &IntentAnalysis, text: &str, update: TrackerUpdate) {
    if let Some(device) = analysis.device_type {
        session.device = Some(device);
    }
    if let Some(os) = &analysis.operating_system {
        session.operating_system = Some(os.clone());
    }
    if let Some(brand) = &analysis.device_brand {
        session.device_brand = Some(brand.clone());
    }
    if update.opened_goal() {
        session.problem = Some(text.to_string());
        if session.need_type.is_none() {
            session.need_type = Some(if analysis.intent.is_problem() {
                NeedType::Problem
            } else {
                NeedType::Task
            });
        }
    }
}
