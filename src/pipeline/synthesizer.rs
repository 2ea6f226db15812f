//! Response synthesizer: reply text + quick-reply options from an analysis.
//!
//! Stateless. The synthesizer reads the session through a borrowed
//! [`SynthesisContext`] and never mutates it; the orchestrator commits.
//!
//! Two branches:
//! - auxiliary: a short reply to an open goal goes to a goal-specific builder
//!   whose prompt forbids re-asking what is already known
//! - fresh: persona + per-intent behavior, options from the static table
//!
//! Any collaborator failure routes to the deterministic templates in
//! [`crate::pipeline::fallback`]. The reply is never empty.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::DialogueConfig;
use crate::llm::{CompletionOptions, LlmGateway};
use crate::locale::Language;
use crate::onboarding::Stage;
use crate::pipeline::actions::OFFERING_ESCALATION;
use crate::pipeline::fallback;
use crate::pipeline::options::{self, tokens, ReplyOption, OS_PICKERS};
use crate::pipeline::prompts::{self, KnownSlots};
use crate::pipeline::types::{ActiveIntent, DeviceType, IntentAnalysis, IntentKind};
use crate::session::{Session, TranscriptEntry};

/// Borrowed view of the session used for synthesis.
#[derive(Debug, Clone, Copy)]
pub struct SynthesisContext<'a> {
    pub stage: &'a Stage,
    pub transcript: &'a [TranscriptEntry],
    pub active_intent: Option<&'a ActiveIntent>,
    pub device: Option<DeviceType>,
    pub operating_system: Option<&'a str>,
    pub device_brand: Option<&'a str>,
    pub user_name: Option<&'a str>,
    pub has_attempted_basic_tests: bool,
}

impl<'a> SynthesisContext<'a> {
    pub fn from_session(session: &'a Session, transcript_window: usize) -> Self {
        Self {
            stage: &session.stage,
            transcript: session.recent_transcript(transcript_window),
            active_intent: session.unresolved_intent(),
            device: session.device,
            operating_system: session.operating_system.as_deref(),
            device_brand: session.device_brand.as_deref(),
            user_name: session.user_name.as_deref(),
            has_attempted_basic_tests: session.has_attempted_basic_tests(),
        }
    }
}

/// What the reply sets up for the next turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    AskOperatingSystem,
    AskDevice,
    GuideInstallation,
    GuideConfiguration,
    RunDiagnostics,
    ExplainSteps,
    ProvideInformation,
    OfferEscalation,
    AwaitDetails,
    CloseConversation,
}

impl NextAction {
    /// Stage the conversation moves to after this reply, if any.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::AskOperatingSystem => Some(Stage::AskOs),
            Self::AskDevice => Some(Stage::AskDevice),
            Self::GuideInstallation => Some(Stage::Contextual("GUIDING_INSTALLATION".into())),
            Self::GuideConfiguration => Some(Stage::Contextual("GUIDING_CONFIGURATION".into())),
            Self::RunDiagnostics => Some(Stage::Contextual("DIAGNOSING_PROBLEM".into())),
            Self::ExplainSteps => Some(Stage::Contextual("EXPLAINING_STEPS".into())),
            Self::ProvideInformation => Some(Stage::Contextual("PROVIDING_INFORMATION".into())),
            Self::OfferEscalation => Some(Stage::Contextual(OFFERING_ESCALATION.into())),
            Self::CloseConversation => Some(Stage::Ended),
            Self::AwaitDetails => None,
        }
    }
}

/// A synthesized reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Synthesis {
    pub reply: String,
    pub options: Vec<ReplyOption>,
    pub next_action: NextAction,
    pub reasoning: String,
    /// The reply came from a deterministic template.
    pub from_fallback: bool,
}

/// Everything decided before the collaborator is called.
struct ReplyPlan {
    branch: &'static str,
    next_action: NextAction,
    options: Vec<ReplyOption>,
    system_prompt: String,
    fallback: String,
}

/// Reply synthesizer.
#[derive(Debug, Clone)]
pub struct ResponseSynthesizer {
    gateway: LlmGateway,
    temperature: f32,
    max_tokens: u32,
}

impl ResponseSynthesizer {
    pub fn new(gateway: LlmGateway, config: &DialogueConfig) -> Self {
        Self {
            gateway,
            temperature: config.synthesis_temperature,
            max_tokens: config.synthesis_max_tokens,
        }
    }

    /// Produce the reply for an analyzed utterance.
    pub async fn synthesize(
        &self,
        analysis: &IntentAnalysis,
        utterance: &str,
        context: &SynthesisContext<'_>,
        language: Language,
    ) -> Synthesis {
        let slots = merged_slots(analysis, context);
        let plan = plan_reply(analysis, context, &slots, language);

        let original_request = context
            .active_intent
            .filter(|_| analysis.is_auxiliary_response())
            .map(|a| a.original_message.as_str());
        let user_prompt = prompts::synthesis_user_prompt(
            utterance,
            original_request,
            context.transcript,
            analysis.confidence,
            &KnownSlots {
                device: slots.device.map(|d| d.label()),
                operating_system: slots.operating_system,
                device_brand: slots.device_brand,
                topic: slots.topic,
            },
        );

        let options_cfg = CompletionOptions::text(self.temperature, self.max_tokens);
        let completion = self
            .gateway
            .complete(&plan.system_prompt, &user_prompt, options_cfg)
            .await;

        let mut options = plan.options;
        let (reply, from_fallback, reasoning) = match completion {
            Ok(text) if !text.trim().is_empty() => (
                text.trim().to_string(),
                false,
                format!("{}: {} → {:?}", plan.branch, analysis.intent, plan.next_action),
            ),
            Ok(_) => {
                warn!(intent = %analysis.intent, "Empty synthesis, using template");
                (
                    plan.fallback,
                    true,
                    format!("{}: {} → template (empty completion)", plan.branch, analysis.intent),
                )
            }
            Err(e) => {
                debug!(error = %e, kind = e.kind(), "Synthesis unavailable, using template");
                (
                    plan.fallback,
                    true,
                    format!("{}: {} → template ({})", plan.branch, analysis.intent, e.kind()),
                )
            }
        };

        if from_fallback
            && !matches!(
                plan.next_action,
                NextAction::CloseConversation | NextAction::OfferEscalation
            )
            && !options.iter().any(|o| o.token == tokens::CONNECT_TECH)
        {
            options.push(options::option(tokens::CONNECT_TECH, language));
        }

        Synthesis {
            reply,
            options,
            next_action: plan.next_action,
            reasoning,
            from_fallback,
        }
    }
}

/// Slots from this turn, falling back to what the session already knows.
struct MergedSlots<'a> {
    device: Option<DeviceType>,
    operating_system: Option<&'a str>,
    device_brand: Option<&'a str>,
    topic: Option<&'a str>,
}

fn merged_slots<'a>(analysis: &'a IntentAnalysis, context: &SynthesisContext<'a>) -> MergedSlots<'a> {
    MergedSlots {
        device: analysis.device_type.or(context.device),
        operating_system: analysis
            .operating_system
            .as_deref()
            .or(context.operating_system),
        device_brand: analysis.device_brand.as_deref().or(context.device_brand),
        topic: analysis
            .topic
            .as_deref()
            .or_else(|| context.active_intent.and_then(|a| a.topic.as_deref())),
    }
}

fn plan_reply(
    analysis: &IntentAnalysis,
    context: &SynthesisContext<'_>,
    slots: &MergedSlots<'_>,
    language: Language,
) -> ReplyPlan {
    let persona = prompts::persona_prompt(language, context.user_name);
    let intent = analysis.intent;

    if analysis.is_auxiliary_response() && intent.is_principal() {
        let advanced = *context.stage == Stage::AdvancedTests;
        let outcome = [tokens::SOLVED, tokens::TESTS_FAIL, tokens::CONNECT_TECH];
        return match intent {
            IntentKind::InstallationHelp => match slots.operating_system {
                Some(os) => ReplyPlan {
                    branch: "auxiliary/guide",
                    next_action: NextAction::GuideInstallation,
                    options: options::options(&outcome, language),
                    system_prompt: format!("{persona}\n\n{}", prompts::guide_builder_prompt(intent)),
                    fallback: fallback::install_steps(os, slots.topic, language),
                },
                None => ask_os_plan("auxiliary/guide", &persona, slots, language),
            },
            IntentKind::ConfigurationHelp => ReplyPlan {
                branch: "auxiliary/guide",
                next_action: NextAction::GuideConfiguration,
                options: options::options(&outcome, language),
                system_prompt: format!("{persona}\n\n{}", prompts::guide_builder_prompt(intent)),
                fallback: fallback::configuration_steps(slots.topic, language),
            },
            IntentKind::TechnicalProblem
            | IntentKind::PerformanceIssue
            | IntentKind::ConnectionProblem => ReplyPlan {
                branch: "auxiliary/diagnostic",
                next_action: NextAction::RunDiagnostics,
                options: options::options(
                    &[tokens::TESTS_DONE, tokens::TESTS_FAIL, tokens::CONNECT_TECH],
                    language,
                ),
                system_prompt: format!(
                    "{persona}\n\n{}",
                    prompts::diagnostic_builder_prompt(advanced)
                ),
                fallback: fallback::diagnostic_steps(slots.device, advanced, language),
            },
            IntentKind::HowToQuestion => ReplyPlan {
                branch: "auxiliary/how_to",
                next_action: NextAction::ExplainSteps,
                options: options::options(&outcome, language),
                system_prompt: format!("{persona}\n\n{}", prompts::how_to_builder_prompt()),
                fallback: fallback::how_to_steps(slots.topic, language),
            },
            _ => ReplyPlan {
                branch: "auxiliary/how_to",
                next_action: NextAction::ProvideInformation,
                options: options::options(&[tokens::SOLVED, tokens::CONNECT_TECH], language),
                system_prompt: format!("{persona}\n\n{}", prompts::how_to_builder_prompt()),
                fallback: fallback::information(slots.topic, language),
            },
        };
    }

    let system_prompt = format!("{persona}\n\n{}", prompts::intent_behavior(intent));
    let table_options = options::options_for_intent(
        intent,
        analysis.requires_diagnostic,
        context.has_attempted_basic_tests,
        language,
    );
    let plan = |next_action, fallback| ReplyPlan {
        branch: "fresh",
        next_action,
        options: table_options.clone(),
        system_prompt: system_prompt.clone(),
        fallback,
    };

    match intent {
        IntentKind::InstallationHelp => match slots.operating_system {
            Some(os) => plan(
                NextAction::GuideInstallation,
                fallback::install_steps(os, slots.topic, language),
            ),
            None => ask_os_plan("fresh", &persona, slots, language),
        },
        IntentKind::ConfigurationHelp => plan(
            NextAction::GuideConfiguration,
            fallback::configuration_steps(slots.topic, language),
        ),
        IntentKind::TechnicalProblem
        | IntentKind::PerformanceIssue
        | IntentKind::ConnectionProblem => match slots.device {
            Some(device) => plan(
                NextAction::RunDiagnostics,
                fallback::diagnostic_steps(Some(device), false, language),
            ),
            None => plan(NextAction::AskDevice, fallback::ask_device(language)),
        },
        IntentKind::HowToQuestion => plan(
            NextAction::ExplainSteps,
            fallback::how_to_steps(slots.topic, language),
        ),
        IntentKind::InformationRequest => plan(
            NextAction::ProvideInformation,
            fallback::information(slots.topic, language),
        ),
        IntentKind::EscalationRequest => plan(
            NextAction::OfferEscalation,
            fallback::escalation_offer(language),
        ),
        IntentKind::Feedback => plan(NextAction::AwaitDetails, fallback::feedback_thanks(language)),
        IntentKind::CloseChat => plan(NextAction::CloseConversation, fallback::farewell(language)),
        IntentKind::Unclear => plan(NextAction::AwaitDetails, fallback::generic_steps(language)),
    }
}

fn ask_os_plan(
    branch: &'static str,
    persona: &str,
    slots: &MergedSlots<'_>,
    language: Language,
) -> ReplyPlan {
    ReplyPlan {
        branch,
        next_action: NextAction::AskOperatingSystem,
        options: options::options(&OS_PICKERS, language),
        system_prompt: format!(
            "{persona}\n\n{}",
            prompts::intent_behavior(IntentKind::InstallationHelp)
        ),
        fallback: fallback::ask_operating_system(slots.topic, language),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;
    use crate::llm::testing::ScriptedLlm;
    use crate::pipeline::types::{ClassificationSource, Urgency};

    fn synthesizer(llm: Option<Arc<ScriptedLlm>>) -> ResponseSynthesizer {
        let gateway = match llm {
            Some(llm) => LlmGateway::new(llm, Duration::from_secs(5)),
            None => LlmGateway::unavailable(),
        };
        ResponseSynthesizer::new(gateway, &DialogueConfig::default())
    }

    fn analysis(intent: IntentKind) -> IntentAnalysis {
        IntentAnalysis {
            intent,
            confidence: 0.9,
            reasoning: String::new(),
            requires_diagnostic: intent.is_problem(),
            device_type: None,
            operating_system: None,
            device_brand: None,
            topic: None,
            urgency: Urgency::Low,
            clarification_needed: false,
            source: ClassificationSource::Classified,
        }
    }

    fn tokens_of(s: &Synthesis) -> Vec<&str> {
        s.options.iter().map(|o| o.token.as_str()).collect()
    }

    fn install_session() -> Session {
        let mut session = Session::new("es-AR");
        session.stage = Stage::AskOs;
        let mut a = analysis(IntentKind::InstallationHelp);
        a.topic = Some("anydesk".into());
        session.active_intent = Some(ActiveIntent::from_analysis(&a, "quiero instalar anydesk"));
        session
    }

    #[tokio::test]
    async fn fresh_installation_without_os_asks_for_it() {
        let session = Session::new("es-AR");
        let ctx = SynthesisContext::from_session(&session, 6);
        let mut a = analysis(IntentKind::InstallationHelp);
        a.topic = Some("anydesk".into());

        let out = synthesizer(None)
            .synthesize(&a, "quiero instalar anydesk", &ctx, Language::Spanish)
            .await;
        assert_eq!(out.next_action, NextAction::AskOperatingSystem);
        assert!(out.reply.contains("sistema operativo"));
        assert!(tokens_of(&out).contains(&tokens::OS_WINDOWS));
        assert!(!tokens_of(&out).contains(&tokens::BASIC_TESTS));
        assert!(out.from_fallback);
    }

    #[tokio::test]
    async fn auxiliary_windows_reply_gives_windows_steps() {
        let session = install_session();
        let ctx = SynthesisContext::from_session(&session, 6);
        let mut a = analysis(IntentKind::InstallationHelp);
        a.operating_system = Some("Windows".into());
        a.source = ClassificationSource::Auxiliary {
            data: "windows".into(),
        };

        let out = synthesizer(None)
            .synthesize(&a, "windows", &ctx, Language::Spanish)
            .await;
        assert_eq!(out.next_action, NextAction::GuideInstallation);
        assert!(out.reply.contains("Windows"));
        assert!(out.reply.contains("anydesk"));
        assert!(!out.reply.contains("sistema operativo tenés"));
        assert_eq!(
            tokens_of(&out),
            vec![tokens::SOLVED, tokens::TESTS_FAIL, tokens::CONNECT_TECH]
        );
    }

    #[tokio::test]
    async fn auxiliary_prompt_forbids_reasking() {
        let llm = Arc::new(ScriptedLlm::new(None, Some("1. Descargá AnyDesk...")));
        let session = install_session();
        let ctx = SynthesisContext::from_session(&session, 6);
        let mut a = analysis(IntentKind::InstallationHelp);
        a.operating_system = Some("Windows".into());
        a.source = ClassificationSource::Auxiliary {
            data: "windows".into(),
        };

        let out = synthesizer(Some(llm.clone()))
            .synthesize(&a, "windows", &ctx, Language::Spanish)
            .await;
        assert_eq!(out.reply, "1. Descargá AnyDesk...");
        assert!(!out.from_fallback);

        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].json_mode);
        assert!(calls[0].system.contains("Do NOT ask again what they want to install"));
        assert!(calls[0].user.contains("Original request: quiero instalar anydesk"));
        assert!(calls[0].user.contains("- Operating system: Windows"));
    }

    #[tokio::test]
    async fn problem_options_respect_basic_test_attempts() {
        let mut session = Session::new("es");
        session.stage = Stage::AskNeed;
        let mut a = analysis(IntentKind::TechnicalProblem);
        a.device_type = Some(DeviceType::Desktop);

        let ctx = SynthesisContext::from_session(&session, 6);
        let out = synthesizer(None)
            .synthesize(&a, "mi pc no prende", &ctx, Language::Spanish)
            .await;
        assert_eq!(out.next_action, NextAction::RunDiagnostics);
        assert!(tokens_of(&out).contains(&tokens::BASIC_TESTS));
        assert!(!tokens_of(&out).contains(&tokens::ADVANCED_TESTS));

        session.attempts.basic_tests = 1;
        let ctx = SynthesisContext::from_session(&session, 6);
        let out = synthesizer(None)
            .synthesize(&a, "sigue sin prender", &ctx, Language::Spanish)
            .await;
        assert!(tokens_of(&out).contains(&tokens::ADVANCED_TESTS));
    }

    #[tokio::test]
    async fn collaborator_failure_yields_numbered_fallback_with_escalation() {
        let session = Session::new("en");
        let ctx = SynthesisContext::from_session(&session, 6);
        let out = synthesizer(Some(Arc::new(ScriptedLlm::failing())))
            .synthesize(&analysis(IntentKind::Unclear), "hmm", &ctx, Language::English)
            .await;
        assert!(!out.reply.is_empty());
        assert!(out.reply.contains("1. "));
        assert!(tokens_of(&out).contains(&tokens::CONNECT_TECH));
        assert!(out.reasoning.contains("request_failed"));
    }

    #[tokio::test]
    async fn blank_completion_uses_template() {
        let llm = Arc::new(ScriptedLlm::new(None, Some("   ")));
        let session = Session::new("es");
        let ctx = SynthesisContext::from_session(&session, 6);
        let out = synthesizer(Some(llm))
            .synthesize(&analysis(IntentKind::CloseChat), "chau", &ctx, Language::Spanish)
            .await;
        assert!(out.from_fallback);
        assert!(!out.reply.trim().is_empty());
        assert_eq!(out.next_action, NextAction::CloseConversation);
        assert!(out.options.is_empty());
    }

    #[test]
    fn next_action_stages() {
        assert_eq!(NextAction::AskOperatingSystem.stage(), Some(Stage::AskOs));
        assert_eq!(
            NextAction::RunDiagnostics.stage(),
            Some(Stage::Contextual("DIAGNOSING_PROBLEM".into()))
        );
        assert_eq!(NextAction::CloseConversation.stage(), Some(Stage::Ended));
        assert_eq!(NextAction::AwaitDetails.stage(), None);
    }
}
