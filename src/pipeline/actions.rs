//! Deterministic handling of control buttons.
//!
//! Runs after validation. Onboarding shortcuts, test outcomes, escalation and
//! closing are answered here without the collaborator. Diagnostic and guide
//! buttons are anchored to the open goal and continue to synthesis. Anything
//! else (option pickers such as `BTN_OS_WINDOWS`) is read as its label.

use tracing::{info, warn};

use crate::locale::Language;
use crate::onboarding::{Stage, StageMachine};
use crate::pipeline::fallback;
use crate::pipeline::options::{self, tokens, ReplyOption};
use crate::pipeline::types::{ActiveIntent, ClassificationSource, IntentAnalysis};
use crate::session::{NeedType, Session};

/// Stage label set while an escalation offer awaits a yes/no.
pub const OFFERING_ESCALATION: &str = "OFFERING_ESCALATION";

/// Stage label set after the user declines an escalation offer.
pub const AWAITING_DETAILS: &str = "AWAITING_DETAILS";

/// What the orchestrator should do with an action token.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionOutcome {
    /// Answered deterministically.
    Reply {
        reply: String,
        options: Vec<ReplyOption>,
        reasoning: String,
    },
    /// Synthesize a reply anchored to the open goal.
    Anchored { analysis: IntentAnalysis },
    /// Not a control action: classify the token's label as text.
    Text,
}

/// Apply a validated action token to the draft session.
pub fn apply_action(
    token: &str,
    session: &mut Session,
    stages: &StageMachine,
    language: Language,
) -> ActionOutcome {
    match token {
        tokens::LANG_ES_AR | tokens::LANG_ES_ES | tokens::LANG_EN => {
            session.locale = match token {
                tokens::LANG_ES_AR => "es-AR",
                tokens::LANG_ES_ES => "es-ES",
                _ => "en",
            }
            .to_string();
            let language = session.language();
            if session.stage == Stage::AskLanguage {
                move_to(stages, session, Stage::AskName);
            }
            reply(
                language.pick("¡Perfecto! ¿Cómo te llamás?", "Great! What's your name?"),
                &[tokens::NO_NAME],
                language,
                "language selected",
            )
        }
        tokens::NO_NAME => {
            if session.stage == Stage::AskName {
                move_to(stages, session, Stage::AskNeed);
            }
            reply(
                language.pick(
                    "¡Sin problema! ¿En qué te puedo ayudar hoy?",
                    "No problem! How can I help you today?",
                ),
                &[tokens::HELP, tokens::TASK],
                language,
                "name skipped",
            )
        }
        tokens::HELP | tokens::TASK => {
            let need = if token == tokens::HELP {
                NeedType::Problem
            } else {
                NeedType::Task
            };
            session.need_type = Some(need);
            if session.stage == Stage::AskName {
                move_to(stages, session, Stage::AskNeed);
            }
            let text = match need {
                NeedType::Problem => language.pick(
                    "Contame qué problema tenés y en qué equipo pasa.",
                    "Tell me what problem you have and on which device.",
                ),
                NeedType::Task => language.pick(
                    "Contame qué necesitás hacer, por ejemplo instalar o configurar algo.",
                    "Tell me what you need to do, for example install or configure something.",
                ),
            };
            reply(text, &[], language, "need type recorded")
        }
        tokens::TESTS_DONE => {
            session.attempts.basic_tests += 1;
            move_to(stages, session, Stage::BasicTests);
            reply(
                language.pick("¡Bien! ¿Se solucionó el problema?", "Nice! Is the problem solved?"),
                &[tokens::SOLVED, tokens::TESTS_FAIL, tokens::CONNECT_TECH],
                language,
                "basic tests reported",
            )
        }
        tokens::TESTS_FAIL => {
            // A failed guide is not a diagnostic attempt: only problem goals
            // count it and keep advanced tests on the table.
            let diagnosing = session
                .unresolved_intent()
                .map(|a| a.kind)
                .or(session.last_detected_intent)
                .is_some_and(|kind| kind.is_problem());
            if diagnosing {
                session.attempts.basic_tests += 1;
            }
            move_to(stages, session, Stage::Contextual(OFFERING_ESCALATION.into()));
            let advanced_left = diagnosing && session.attempts.advanced_tests == 0;
            let text = if advanced_left {
                language.pick(
                    "Qué lástima que siga igual. ¿Querés que te conecte con un técnico? También podemos probar pruebas avanzadas.",
                    "Sorry it's still not working. Want me to connect you with a technician? We can also try advanced tests.",
                )
            } else {
                language.pick(
                    "Qué lástima que siga igual. ¿Querés que te conecte con un técnico?",
                    "Sorry it's still not working. Want me to connect you with a technician?",
                )
            };
            let choices: &[&str] = if advanced_left {
                &[tokens::YES, tokens::ADVANCED_TESTS, tokens::NO]
            } else {
                &[tokens::YES, tokens::NO]
            };
            reply(text, choices, language, "tests failed, escalation offered")
        }
        tokens::BASIC_TESTS => anchored(token, session, stages, Some(Stage::BasicTests), language),
        tokens::ADVANCED_TESTS => {
            let outcome = anchored(token, session, stages, Some(Stage::AdvancedTests), language);
            if matches!(outcome, ActionOutcome::Anchored { .. }) {
                session.attempts.advanced_tests += 1;
            }
            outcome
        }
        tokens::STEP_BY_STEP => anchored(token, session, stages, None, language),
        tokens::SOLVED => {
            resolve_active(session);
            move_to(stages, session, Stage::Ended);
            reply(
                language.pick(
                    "¡Excelente! Me alegra que se haya solucionado. Si necesitás algo más, escribime.",
                    "Excellent! Glad it's solved. If you need anything else, just write.",
                ),
                &[],
                language,
                "resolved by user",
            )
        }
        tokens::CLOSE => {
            resolve_active(session);
            move_to(stages, session, Stage::Ended);
            reply(&fallback::farewell(language), &[], language, "closed by user")
        }
        tokens::CONNECT_TECH => escalate(session, stages, language),
        tokens::YES if is_offering_escalation(session) => escalate(session, stages, language),
        tokens::NO if is_offering_escalation(session) => {
            move_to(stages, session, Stage::Contextual(AWAITING_DETAILS.into()));
            reply(
                language.pick(
                    "Dale, seguimos. Contame qué ves ahora o qué cambió.",
                    "Okay, let's keep going. Tell me what you see now or what changed.",
                ),
                &[tokens::CONNECT_TECH, tokens::CLOSE],
                language,
                "escalation declined",
            )
        }
        _ => ActionOutcome::Text,
    }
}

fn is_offering_escalation(session: &Session) -> bool {
    session.stage == Stage::Contextual(OFFERING_ESCALATION.into())
}

fn escalate(session: &mut Session, stages: &StageMachine, language: Language) -> ActionOutcome {
    move_to(stages, session, Stage::Escalate);
    info!(session = %session.id, "Escalation requested");
    reply(
        language.pick(
            "Listo, te derivo con un técnico. Voy a generar un pedido con el resumen de la conversación y te van a contactar a la brevedad.",
            "Done, I'm handing you over to a technician. I'll open a request with a summary of our chat and they'll contact you shortly.",
        ),
        &[],
        language,
        "escalated",
    )
}

fn anchored(
    token: &str,
    session: &mut Session,
    stages: &StageMachine,
    stage: Option<Stage>,
    language: Language,
) -> ActionOutcome {
    let Some(active) = session.unresolved_intent().cloned() else {
        return ActionOutcome::Text;
    };
    if let Some(stage) = stage {
        move_to(stages, session, stage);
    }
    let data = options::label_for(token, language).unwrap_or(token);
    ActionOutcome::Anchored {
        analysis: anchored_analysis(&active, data),
    }
}

/// An auxiliary analysis carrying the open goal forward.
pub fn anchored_analysis(active: &ActiveIntent, data: &str) -> IntentAnalysis {
    IntentAnalysis {
        intent: active.kind,
        confidence: active.confidence,
        reasoning: format!("Action on the open {} goal", active.kind),
        requires_diagnostic: active.requires_diagnostic,
        device_type: active.device_type,
        operating_system: None,
        device_brand: None,
        topic: active.topic.clone(),
        urgency: active.urgency,
        clarification_needed: false,
        source: ClassificationSource::Auxiliary {
            data: data.to_string(),
        },
    }
}

fn resolve_active(session: &mut Session) {
    if let Some(active) = session.active_intent.as_mut() {
        active.resolved = true;
    }
}

/// Change stage, keeping the current one if strict mode refuses.
pub(crate) fn move_to(stages: &StageMachine, session: &mut Session, stage: Stage) {
    if let Err(e) = stages.change_stage(session, stage, false) {
        warn!(session = %session.id, error = %e, "Stage left unchanged");
    }
}

fn reply(text: &str, choices: &[&str], language: Language, reasoning: &str) -> ActionOutcome {
    ActionOutcome::Reply {
        reply: text.to_string(),
        options: options::options(choices, language),
        reasoning: format!("action: {reasoning}"),
    }
}
