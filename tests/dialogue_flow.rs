//! End-to-end dialogue tests through the public `TurnOrchestrator` API.
//!
//! The collaborator is a stub provider: classification calls (JSON mode) are
//! answered by matching the user message, synthesis calls get a canned reply.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use helpdesk_dialogue::error::LlmError;
use helpdesk_dialogue::llm::{
    CompletionRequest, CompletionResponse, FinishReason, LlmGateway, LlmProvider, Role,
};
use helpdesk_dialogue::pipeline::{
    ActionValidator, AlternativeAction, IntentKind, RejectionReason, ValidationContext, tokens,
};
use helpdesk_dialogue::{DialogueConfig, Language, Session, Stage, StageMachine, TurnOrchestrator, TurnResult};

/// Stub LLM provider for integration tests (no real API calls).
struct StubLlm {
    classifications: Vec<(&'static str, &'static str)>,
    synthesis: Option<&'static str>,
    calls: Mutex<Vec<CompletionRequest>>,
}

impl StubLlm {
    fn new(classifications: Vec<(&'static str, &'static str)>, synthesis: Option<&'static str>) -> Self {
        Self {
            classifications,
            synthesis,
            calls: Mutex::new(Vec::new()),
        }
    }

    fn failing() -> Self {
        Self::new(Vec::new(), None)
    }

    fn classification_calls(&self) -> usize {
        self.calls.lock().unwrap().iter().filter(|r| r.json_mode).count()
    }

    fn last_synthesis(&self) -> (String, String) {
        let calls = self.calls.lock().unwrap();
        let request = calls.iter().rev().find(|r| !r.json_mode).expect("no synthesis call");
        (request.system_text(), user_text(request))
    }
}

fn user_text(request: &CompletionRequest) -> String {
    request
        .messages
        .iter()
        .filter(|m| m.role == Role::User)
        .map(|m| m.content.clone())
        .collect::<Vec<_>>()
        .join("\n")
}

fn failed() -> LlmError {
    LlmError::RequestFailed {
        provider: "stub".into(),
        reason: "no scripted reply".into(),
    }
}

#[async_trait]
impl LlmProvider for StubLlm {
    fn model_name(&self) -> &str {
        "stub"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let user = user_text(&request);
        let json_mode = request.json_mode;
        self.calls.lock().unwrap().push(request);

        let content = if json_mode {
            self.classifications
                .iter()
                .find(|(needle, _)| user.contains(needle))
                .map(|(_, json)| json.to_string())
        } else {
            self.synthesis.map(str::to_string)
        };
        let content = content.ok_or_else(failed)?;
        Ok(CompletionResponse {
            content,
            input_tokens: 0,
            output_tokens: 0,
            finish_reason: FinishReason::Stop,
        })
    }
}

fn orchestrator_with(llm: Arc<StubLlm>) -> TurnOrchestrator {
    TurnOrchestrator::new(
        LlmGateway::new(llm, Duration::from_secs(5)),
        DialogueConfig::default(),
    )
}

async fn turn(
    orch: &TurnOrchestrator,
    session: &mut Session,
    text: &str,
    token: Option<&str>,
) -> TurnResult {
    orch.handle_turn(text, token, session, None)
        .await
        .into_result()
        .expect("turn should be handled")
}

fn tokens_of(result: &TurnResult) -> Vec<&str> {
    result.options.iter().map(|o| o.token.as_str()).collect()
}

/// Walk onboarding with buttons: language, skip name.
async fn onboarded(orch: &TurnOrchestrator, language_token: &str) -> Session {
    let mut session = Session::new("es-AR");
    let result = turn(orch, &mut session, "", Some(language_token)).await;
    assert_eq!(result.stage, Stage::AskName);
    assert_eq!(tokens_of(&result), vec![tokens::NO_NAME]);

    let result = turn(orch, &mut session, "", Some(tokens::NO_NAME)).await;
    assert_eq!(result.stage, Stage::AskNeed);
    assert_eq!(tokens_of(&result), vec![tokens::HELP, tokens::TASK]);
    session
}

// ── Installation follow-up ──────────────────────────────────────────

#[tokio::test]
async fn install_request_then_os_reply_keeps_the_goal() {
    let llm = Arc::new(StubLlm::new(
        vec![(
            "quiero instalar anydesk",
            r#"{"intent": "installation_help", "confidence": 0.95, "requires_diagnostic": false, "topic": "anydesk"}"#,
        )],
        Some("Perfecto. Para Windows, descargá AnyDesk desde anydesk.com y ejecutá el instalador."),
    ));
    let orch = orchestrator_with(llm.clone());
    let mut session = onboarded(&orch, tokens::LANG_ES_AR).await;

    let first = turn(&orch, &mut session, "quiero instalar anydesk", None).await;
    assert_eq!(first.intent_detected, Some(IntentKind::InstallationHelp));
    assert_eq!(first.stage, Stage::AskOs);
    assert!(tokens_of(&first).contains(&tokens::OS_WINDOWS));
    let active = session.active_intent.clone().unwrap();
    assert_eq!(active.kind, IntentKind::InstallationHelp);
    assert!(!active.requires_diagnostic);
    assert_eq!(llm.classification_calls(), 1);

    let second = turn(&orch, &mut session, "windows", None).await;
    assert_eq!(second.intent_detected, Some(IntentKind::InstallationHelp));
    // Short reply: no second classification call, no new goal.
    assert_eq!(llm.classification_calls(), 1);
    assert_eq!(session.active_intent, Some(active));
    assert_eq!(session.operating_system.as_deref(), Some("Windows"));
    assert_eq!(second.stage, Stage::Contextual("GUIDING_INSTALLATION".into()));
    assert!(tokens_of(&second).contains(&tokens::SOLVED));
    assert!(second.reply.contains("Windows"));

    let (system, user) = llm.last_synthesis();
    assert!(system.contains("Do NOT ask again what they want to install"));
    assert!(user.contains("Original request: quiero instalar anydesk"));
    assert!(user.contains("- Operating system: Windows"));
}

#[tokio::test]
async fn install_flow_without_collaborator_gives_os_specific_steps() {
    let orch = orchestrator_with(Arc::new(StubLlm::failing()));
    let mut session = onboarded(&orch, tokens::LANG_ES_AR).await;

    let first = turn(&orch, &mut session, "quiero instalar anydesk", None).await;
    assert_eq!(first.intent_detected, Some(IntentKind::InstallationHelp));
    assert!(first.reply.contains("sistema operativo"));

    let second = turn(&orch, &mut session, "", Some(tokens::OS_WINDOWS)).await;
    assert_eq!(second.intent_detected, Some(IntentKind::InstallationHelp));
    assert!(second.reply.contains(".exe"));
    assert!(!second.reply.contains("sistema operativo"));
}

// ── Problem diagnosis and action validation ─────────────────────────

#[tokio::test]
async fn advanced_tests_require_basic_tests_first() {
    let orch = orchestrator_with(Arc::new(StubLlm::failing()));
    let mut session = onboarded(&orch, tokens::LANG_ES_AR).await;

    let first = turn(&orch, &mut session, "mi pc no prende", None).await;
    assert_eq!(first.intent_detected, Some(IntentKind::TechnicalProblem));
    assert!(!first.reply.is_empty());
    assert!(session.active_intent.as_ref().unwrap().requires_diagnostic);
    let stage = session.stage.clone();

    let rejected = turn(&orch, &mut session, "", Some(tokens::ADVANCED_TESTS)).await;
    let validation = rejected.validation.clone().unwrap();
    assert!(!validation.is_valid);
    assert_eq!(validation.reason, Some(RejectionReason::PrerequisitesNotMet));
    assert_eq!(
        validation.alternative_action,
        Some(AlternativeAction::StartBasicDiagnostics)
    );
    assert_eq!(tokens_of(&rejected), vec![tokens::BASIC_TESTS, tokens::CONNECT_TECH]);
    assert_eq!(session.stage, stage);

    let basic = turn(&orch, &mut session, "", Some(tokens::BASIC_TESTS)).await;
    assert_eq!(basic.stage, Stage::BasicTests);
    assert!(tokens_of(&basic).contains(&tokens::TESTS_FAIL));

    let failed = turn(&orch, &mut session, "", Some(tokens::TESTS_FAIL)).await;
    assert_eq!(session.attempts.basic_tests, 1);
    assert!(tokens_of(&failed).contains(&tokens::ADVANCED_TESTS));

    let advanced = turn(&orch, &mut session, "", Some(tokens::ADVANCED_TESTS)).await;
    assert!(advanced.validation.is_none());
    assert_eq!(advanced.stage, Stage::AdvancedTests);
    assert_eq!(session.attempts.advanced_tests, 1);
    assert!(!advanced.reply.is_empty());
}

#[tokio::test]
async fn failed_configuration_guide_reaches_escalation() {
    let llm = Arc::new(StubLlm::new(
        vec![
            (
                "MikroTik RB750Gr3",
                r#"{"intent": "information_request", "confidence": 0.4}"#,
            ),
            (
                "asistencia para configurar una conexión wan",
                r#"{"intent": "configuration_help", "confidence": 0.92, "requires_diagnostic": false, "topic": "wan"}"#,
            ),
        ],
        None,
    ));
    let orch = orchestrator_with(llm);
    let mut session = Session::new("es-AR");

    let result = turn(&orch, &mut session, "", Some(tokens::LANG_EN)).await;
    assert_eq!(result.stage, Stage::AskName);

    // The host captures the name and moves the session on.
    let outcome = orch.handle_turn("Heber", None, &mut session, None).await;
    assert!(outcome.into_result().is_none());
    session.user_name = Some("Heber".into());
    orch.stage_machine()
        .change_stage(&mut session, Stage::AskNeed, false)
        .unwrap();

    turn(&orch, &mut session, "", Some(tokens::HELP)).await;
    let guide = turn(
        &orch,
        &mut session,
        "asistencia para configurar una conexión wan en un microtik",
        None,
    )
    .await;
    assert_eq!(guide.intent_detected, Some(IntentKind::ConfigurationHelp));

    let device = turn(&orch, &mut session, "MikroTik RB750Gr3", None).await;
    assert_eq!(device.intent_detected, Some(IntentKind::ConfigurationHelp));
    assert_eq!(session.last_detected_intent, Some(IntentKind::ConfigurationHelp));
    assert!(tokens_of(&device).contains(&tokens::TESTS_FAIL));

    let failed = turn(&orch, &mut session, "", Some(tokens::TESTS_FAIL)).await;
    assert!(failed.validation.is_none());
    assert_eq!(failed.stage, Stage::Contextual("OFFERING_ESCALATION".into()));
    assert_eq!(tokens_of(&failed), vec![tokens::YES, tokens::NO]);
    assert_eq!(session.attempts.basic_tests, 0);

    let escalated = turn(&orch, &mut session, "", Some(tokens::YES)).await;
    assert_eq!(escalated.stage, Stage::Escalate);
    assert_eq!(session.stage, Stage::Escalate);
}

#[tokio::test]
async fn diagnostic_button_on_an_install_goal_is_redirected() {
    let orch = orchestrator_with(Arc::new(StubLlm::failing()));
    let mut session = onboarded(&orch, tokens::LANG_EN).await;
    turn(&orch, &mut session, "I want to install zoom", None).await;

    let rejected = turn(&orch, &mut session, "", Some(tokens::BASIC_TESTS)).await;
    let validation = rejected.validation.unwrap();
    assert_eq!(validation.reason, Some(RejectionReason::IntentMismatch));
    assert_eq!(
        validation.alternative_action,
        Some(AlternativeAction::ProvideInstallationGuide)
    );
    assert_eq!(rejected.options[0].token, tokens::STEP_BY_STEP);
    assert_eq!(session.attempts.basic_tests, 0);
}

#[test]
fn unknown_tokens_are_always_valid() {
    let validator = ActionValidator::new();
    let context = ValidationContext {
        has_attempted_basic_tests: false,
        language: Language::Spanish,
    };
    for intent in [None, Some(IntentKind::InstallationHelp), Some(IntentKind::Unclear)] {
        assert!(validator.validate("BTN_SOMETHING_NEW", intent, &context).is_valid);
        assert!(validator.validate(tokens::OS_MACOS, intent, &context).is_valid);
    }
}

// ── Stage machine ───────────────────────────────────────────────────

#[test]
fn repeated_stage_change_is_recorded_once() {
    let machine = StageMachine::default();
    let mut session = Session::new("es");
    machine.change_stage(&mut session, Stage::AskName, false).unwrap();
    machine.change_stage(&mut session, Stage::AskName, false).unwrap();
    assert_eq!(session.stage_transitions.len(), 1);

    // Soft mode: undeclared jump is audited and applied.
    machine.change_stage(&mut session, Stage::TicketSent, false).unwrap();
    assert_eq!(session.stage, Stage::TicketSent);
    assert_eq!(session.stage_transitions.len(), 2);
    assert!(!session.stage_transitions[1].validated);
}

// ── Clarification policy and degradation ────────────────────────────

#[tokio::test]
async fn clarification_has_no_options_except_at_need_stage() {
    let orch = orchestrator_with(Arc::new(StubLlm::failing()));

    let mut session = onboarded(&orch, tokens::LANG_ES_AR).await;
    let at_need = turn(&orch, &mut session, "zzz qqq", None).await;
    assert!(!at_need.options.is_empty());

    let mut session = Session::new("es-AR");
    session.stage = Stage::AskProblem;
    let elsewhere = turn(&orch, &mut session, "zzz qqq", None).await;
    assert!(elsewhere.options.is_empty());
    assert!(!elsewhere.reply.is_empty());
    assert_eq!(session.attempts.clarifications, 1);
}

#[tokio::test]
async fn failing_collaborator_still_answers_every_turn() {
    let orch = orchestrator_with(Arc::new(StubLlm::failing()));
    let mut session = onboarded(&orch, tokens::LANG_EN).await;
    for text in [
        "my printer is not working",
        "how do I change my wifi password",
        "what is a vpn",
        "thanks!",
    ] {
        let result = turn(&orch, &mut session, text, None).await;
        assert!(!result.reply.trim().is_empty(), "empty reply for {text:?}");
    }
    assert_eq!(session.transcript.len(), 4 + 8);
}

#[tokio::test]
async fn malformed_classification_falls_back_to_heuristics() {
    let llm = Arc::new(StubLlm::new(
        vec![("no prende", "sure! it's a problem")],
        None,
    ));
    let orch = orchestrator_with(llm);
    let mut session = onboarded(&orch, tokens::LANG_ES_AR).await;
    let result = turn(&orch, &mut session, "mi notebook no prende", None).await;
    assert_eq!(result.intent_detected, Some(IntentKind::TechnicalProblem));
    assert!(!result.reply.is_empty());
    assert_eq!(session.device, Some(helpdesk_dialogue::pipeline::DeviceType::Notebook));
}

#[tokio::test]
async fn language_button_switches_replies_to_english() {
    let orch = orchestrator_with(Arc::new(StubLlm::failing()));
    let mut session = onboarded(&orch, tokens::LANG_EN).await;
    assert_eq!(session.locale, "en");
    let result = turn(&orch, &mut session, "I want to install zoom", None).await;
    assert!(result.reply.contains("operating system"));
    assert_eq!(result.options[0].label, "Windows");
}

#[tokio::test]
async fn onboarding_text_is_declined_for_the_host() {
    let orch = orchestrator_with(Arc::new(StubLlm::failing()));
    let mut session = Session::new("es-AR");
    session.stage = Stage::AskName;
    let outcome = orch.handle_turn("María", None, &mut session, None).await;
    assert!(outcome.into_result().is_none());
    assert!(session.transcript.is_empty());
    assert!(session.stage_transitions.is_empty());
}
