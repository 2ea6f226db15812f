//! Stage/action validator: is a UI action coherent with the dialogue goal?
//!
//! Runs strictly before any reply is generated so an incoherent action is
//! never silently honored. Tokens outside the rule table (free text, option
//! pickers, onboarding buttons) are implicitly valid.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::locale::Language;
use crate::pipeline::options::tokens;
use crate::pipeline::types::IntentKind;

/// A condition an action depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    BasicTestsAttempted,
}

impl Prerequisite {
    fn is_met(&self, context: &ValidationContext) -> bool {
        match self {
            Self::BasicTestsAttempted => context.has_attempted_basic_tests,
        }
    }

    /// What to do instead when this prerequisite is missing.
    fn remedy(&self) -> AlternativeAction {
        match self {
            Self::BasicTestsAttempted => AlternativeAction::StartBasicDiagnostics,
        }
    }

    fn message(&self, language: Language) -> &'static str {
        match self {
            Self::BasicTestsAttempted => language.pick(
                "Antes de pasar a las pruebas avanzadas hagamos las pruebas básicas: muchas veces el problema se resuelve ahí. ¿Arrancamos?",
                "Before moving on to advanced tests, let's run the basic checks first; they often solve the problem. Shall we start?",
            ),
        }
    }
}

/// Static validation rule for one action token.
#[derive(Debug, Clone, Copy)]
pub struct ActionRule {
    pub token: &'static str,
    pub valid_intents: &'static [IntentKind],
    pub prerequisites: &'static [Prerequisite],
    pub message_es: &'static str,
    pub message_en: &'static str,
}

const PROBLEM_INTENTS: &[IntentKind] = &[
    IntentKind::TechnicalProblem,
    IntentKind::PerformanceIssue,
    IntentKind::ConnectionProblem,
];

const GUIDED_INTENTS: &[IntentKind] = &[
    IntentKind::InstallationHelp,
    IntentKind::ConfigurationHelp,
    IntentKind::HowToQuestion,
];

/// Goals whose steps can be reported as not working.
const OUTCOME_INTENTS: &[IntentKind] = &[
    IntentKind::TechnicalProblem,
    IntentKind::PerformanceIssue,
    IntentKind::ConnectionProblem,
    IntentKind::InstallationHelp,
    IntentKind::ConfigurationHelp,
    IntentKind::HowToQuestion,
];

const DIAGNOSTIC_MISMATCH_ES: &str = "Las pruebas de diagnóstico son para cuando algo no funciona. Para lo que me pediste te conviene otro camino:";
const DIAGNOSTIC_MISMATCH_EN: &str =
    "Diagnostic tests are for when something is broken. For what you asked, there's a better path:";

/// The action-validation table. Read-only for the life of the process.
pub const ACTION_RULES: &[ActionRule] = &[
    ActionRule {
        token: tokens::BASIC_TESTS,
        valid_intents: PROBLEM_INTENTS,
        prerequisites: &[],
        message_es: DIAGNOSTIC_MISMATCH_ES,
        message_en: DIAGNOSTIC_MISMATCH_EN,
    },
    ActionRule {
        token: tokens::TESTS_DONE,
        valid_intents: PROBLEM_INTENTS,
        prerequisites: &[],
        message_es: DIAGNOSTIC_MISMATCH_ES,
        message_en: DIAGNOSTIC_MISMATCH_EN,
    },
    ActionRule {
        token: tokens::TESTS_FAIL,
        valid_intents: OUTCOME_INTENTS,
        prerequisites: &[],
        message_es: "Todavía no sé qué es lo que no está funcionando. Antes de seguir:",
        message_en: "I don't know yet what isn't working. Before going on:",
    },
    ActionRule {
        token: tokens::ADVANCED_TESTS,
        valid_intents: PROBLEM_INTENTS,
        prerequisites: &[Prerequisite::BasicTestsAttempted],
        message_es: DIAGNOSTIC_MISMATCH_ES,
        message_en: DIAGNOSTIC_MISMATCH_EN,
    },
    ActionRule {
        token: tokens::STEP_BY_STEP,
        valid_intents: GUIDED_INTENTS,
        prerequisites: &[],
        message_es: "La guía paso a paso es para instalar o configurar algo. Por ahora:",
        message_en: "The step-by-step guide is for installing or configuring something. For now:",
    },
];

/// Look up the rule for a token.
pub fn rule_for(token: &str) -> Option<&'static ActionRule> {
    ACTION_RULES.iter().find(|r| r.token == token)
}

/// Session facts the validator needs.
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext {
    pub has_attempted_basic_tests: bool,
    pub language: Language,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    IntentMismatch,
    PrerequisitesNotMet,
}

impl RejectionReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::IntentMismatch => "intent_mismatch",
            Self::PrerequisitesNotMet => "prerequisites_not_met",
        }
    }
}

/// What the assistant should do instead of a rejected action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlternativeAction {
    ProvideInstallationGuide,
    ProvideConfigurationSteps,
    ProvideStepByStep,
    ProvideInformation,
    StartBasicDiagnostics,
    ConnectTechnician,
    AskClarification,
}

impl AlternativeAction {
    /// Derive the natural next action for the current intent.
    pub fn for_intent(intent: Option<IntentKind>) -> Self {
        match intent {
            Some(IntentKind::InstallationHelp) => Self::ProvideInstallationGuide,
            Some(IntentKind::ConfigurationHelp) => Self::ProvideConfigurationSteps,
            Some(IntentKind::HowToQuestion) => Self::ProvideStepByStep,
            Some(IntentKind::InformationRequest) => Self::ProvideInformation,
            Some(
                IntentKind::TechnicalProblem
                | IntentKind::PerformanceIssue
                | IntentKind::ConnectionProblem,
            ) => Self::StartBasicDiagnostics,
            Some(IntentKind::EscalationRequest) => Self::ConnectTechnician,
            Some(IntentKind::Feedback | IntentKind::CloseChat | IntentKind::Unclear) | None => {
                Self::AskClarification
            }
        }
    }

    /// Option token that carries this action out.
    pub fn option_token(&self) -> &'static str {
        match self {
            Self::ProvideInstallationGuide
            | Self::ProvideConfigurationSteps
            | Self::ProvideStepByStep => tokens::STEP_BY_STEP,
            Self::ProvideInformation => tokens::SOLVED,
            Self::StartBasicDiagnostics => tokens::BASIC_TESTS,
            Self::ConnectTechnician => tokens::CONNECT_TECH,
            Self::AskClarification => tokens::HELP,
        }
    }

    fn hint(&self, language: Language) -> &'static str {
        match self {
            Self::ProvideInstallationGuide => language.pick(
                "te guío con la instalación paso a paso.",
                "I'll walk you through the installation.",
            ),
            Self::ProvideConfigurationSteps => language.pick(
                "te paso los pasos de configuración.",
                "I'll give you the configuration steps.",
            ),
            Self::ProvideStepByStep => language.pick(
                "te lo explico paso a paso.",
                "I'll explain it step by step.",
            ),
            Self::ProvideInformation => language.pick(
                "te doy la información que necesitás.",
                "I'll get you the information you need.",
            ),
            Self::StartBasicDiagnostics => language.pick(
                "como se trata de una falla, empecemos por las pruebas básicas.",
                "since this is a fault, let's start with the basic checks.",
            ),
            Self::ConnectTechnician => language.pick(
                "te conecto con un técnico.",
                "I'll connect you with a technician.",
            ),
            Self::AskClarification => language.pick(
                "contame un poco más qué necesitás.",
                "tell me a bit more about what you need.",
            ),
        }
    }
}

/// Outcome of validating an action token.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<RejectionReason>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternative_action: Option<AlternativeAction>,
}

impl ValidationResult {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            reason: None,
            message: None,
            alternative_action: None,
        }
    }

    fn rejected(reason: RejectionReason, message: String, alternative: AlternativeAction) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason),
            message: Some(message),
            alternative_action: Some(alternative),
        }
    }
}

/// Stateless validator over the static rule table.
#[derive(Debug, Clone, Copy, Default)]
pub struct ActionValidator;

impl ActionValidator {
    pub fn new() -> Self {
        Self
    }

    /// Whether the token is governed by a validation rule.
    pub fn is_known(&self, token: &str) -> bool {
        rule_for(token).is_some()
    }

    /// Validate `token` against the current intent and session facts.
    pub fn validate(
        &self,
        token: &str,
        current_intent: Option<IntentKind>,
        context: &ValidationContext,
    ) -> ValidationResult {
        let Some(rule) = rule_for(token) else {
            return ValidationResult::valid();
        };
        let language = context.language;

        let intent_ok = current_intent.is_some_and(|i| rule.valid_intents.contains(&i));
        if !intent_ok {
            let alternative = AlternativeAction::for_intent(current_intent);
            info!(
                action = token,
                intent = current_intent.map(|i| i.label()).unwrap_or("none"),
                alternative = ?alternative,
                "Action rejected: intent mismatch"
            );
            let message = format!(
                "{} {}",
                language.pick(rule.message_es, rule.message_en),
                alternative.hint(language)
            );
            return ValidationResult::rejected(RejectionReason::IntentMismatch, message, alternative);
        }

        if let Some(missing) = rule.prerequisites.iter().find(|p| !p.is_met(context)) {
            info!(
                action = token,
                prerequisite = ?missing,
                "Action rejected: prerequisites not met"
            );
            return ValidationResult::rejected(
                RejectionReason::PrerequisitesNotMet,
                missing.message(language).to_string(),
                missing.remedy(),
            );
        }

        ValidationResult::valid()
    }
}
