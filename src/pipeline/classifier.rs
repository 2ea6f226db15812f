//! Intent classifier: auxiliary short-circuit, LLM classification, regex fallback.
//!
//! Flow:
//! 1. Auxiliary short-circuit: a short reply to an open goal keeps that goal
//! 2. LLM classification: strict JSON against the closed taxonomy
//! 3. Regex fallback: when the collaborator is unavailable or misbehaves
//!
//! `classify` never fails. Every path yields a well-formed [`IntentAnalysis`].

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::DialogueConfig;
use crate::error::LlmError;
use crate::llm::{extract_json_object, CompletionOptions, LlmGateway};
use crate::locale::Language;
use crate::onboarding::Stage;
use crate::pipeline::rules::RulesEngine;
use crate::pipeline::types::{
    ActiveIntent, ClassificationSource, DeviceType, FallbackReason, IntentAnalysis, IntentKind,
    Urgency, ALL_INTENTS,
};

/// Confidence assumed when the LLM omits one.
const DEFAULT_LLM_CONFIDENCE: f32 = 0.8;

/// Cap on the utterance length sent for classification.
const MAX_UTTERANCE_CHARS: usize = 1000;

/// What the classifier knows about the conversation.
#[derive(Debug, Clone, Copy)]
pub struct ClassificationContext<'a> {
    /// The session's open goal, if unresolved.
    pub active_intent: Option<&'a ActiveIntent>,
    pub stage: &'a Stage,
}

/// Hybrid intent classifier.
#[derive(Clone)]
pub struct IntentClassifier {
    gateway: LlmGateway,
    rules: Arc<RulesEngine>,
    temperature: f32,
    max_tokens: u32,
}

impl IntentClassifier {
    pub fn new(gateway: LlmGateway, rules: Arc<RulesEngine>, config: &DialogueConfig) -> Self {
        Self {
            gateway,
            rules,
            temperature: config.classification_temperature,
            max_tokens: config.classification_max_tokens,
        }
    }

    pub fn rules(&self) -> &RulesEngine {
        &self.rules
    }

    /// Classify one utterance.
    pub async fn classify(
        &self,
        utterance: &str,
        context: &ClassificationContext<'_>,
        language: Language,
    ) -> IntentAnalysis {
        if let Some(active) = context.active_intent.filter(|a| !a.resolved) {
            if self.rules.is_auxiliary_reply(utterance) {
                let analysis = self.auxiliary(utterance, active);
                info!(
                    intent = %analysis.intent,
                    data = analysis.auxiliary_data().unwrap_or_default(),
                    "Auxiliary reply to open goal"
                );
                return analysis;
            }
        }

        let system = build_classification_system_prompt();
        let user = build_classification_user_prompt(utterance, context, language);
        let options = CompletionOptions::json(self.temperature, self.max_tokens);

        match self.gateway.complete(&system, &user, options).await {
            Ok(raw) => match parse_classification_response(&raw) {
                Ok(parsed) => {
                    let analysis = self.finish_llm_analysis(parsed, utterance);
                    info!(
                        intent = %analysis.intent,
                        confidence = analysis.confidence,
                        path = analysis.source.label(),
                        "Utterance classified"
                    );
                    analysis
                }
                Err(e) => {
                    warn!(error = %e, "Unparseable classification, using heuristics");
                    self.fallback(utterance, FallbackReason::MalformedResponse)
                }
            },
            Err(e) => {
                let reason = match e {
                    LlmError::Unavailable => FallbackReason::CollaboratorUnavailable,
                    _ => FallbackReason::CollaboratorError,
                };
                if reason == FallbackReason::CollaboratorError {
                    warn!(error = %e, kind = e.kind(), "Classification call failed, using heuristics");
                } else {
                    debug!("No collaborator configured, using heuristics");
                }
                self.fallback(utterance, reason)
            }
        }
    }

    /// Interpret a short reply against the open goal.
    fn auxiliary(&self, utterance: &str, active: &ActiveIntent) -> IntentAnalysis {
        let data = utterance.trim().to_string();
        IntentAnalysis {
            intent: active.kind,
            confidence: active.confidence,
            reasoning: format!("Short reply to the open {} goal", active.kind),
            requires_diagnostic: active.requires_diagnostic,
            device_type: self.rules.detect_device(&data).or(active.device_type),
            operating_system: self.rules.detect_operating_system(&data),
            device_brand: self.rules.detect_brand(&data),
            topic: active.topic.clone(),
            urgency: active.urgency,
            clarification_needed: false,
            source: ClassificationSource::Auxiliary { data },
        }
    }

    /// Normalize an LLM reply: clamp, default, backfill slots, enforce the
    /// installation/configuration guard.
    fn finish_llm_analysis(&self, parsed: ClassificationResponse, utterance: &str) -> IntentAnalysis {
        let label = parsed.intent.trim().to_string();
        let Some(mut intent) = IntentKind::from_label(&label) else {
            debug!(label = %label, "Unknown intent label from collaborator");
            let mut analysis = IntentAnalysis::unclear(
                format!("Collaborator returned unknown intent '{label}'"),
                ClassificationSource::Classified,
            );
            self.fill_slots(&mut analysis, utterance);
            return analysis;
        };

        let mut reasoning = non_empty(parsed.reasoning)
            .unwrap_or_else(|| format!("Classified as {intent}"));

        // Install/configure requests must never become fault reports.
        if intent.is_problem() {
            if let Some(rule) = self.rules.match_intent(utterance) {
                if matches!(
                    rule.intent,
                    IntentKind::InstallationHelp | IntentKind::ConfigurationHelp
                ) {
                    info!(from = %intent, to = %rule.intent, "Overriding problem classification");
                    reasoning = format!("{reasoning} (request wording is {})", rule.intent);
                    intent = rule.intent;
                }
            }
        }

        let requires_diagnostic = if intent.is_problem() {
            parsed
                .requires_diagnostic
                .unwrap_or_else(|| intent.default_requires_diagnostic())
        } else {
            false
        };

        let mut analysis = IntentAnalysis {
            intent,
            confidence: parsed
                .confidence
                .unwrap_or(DEFAULT_LLM_CONFIDENCE)
                .clamp(0.0, 1.0),
            reasoning,
            requires_diagnostic,
            device_type: parsed.device_type.as_deref().and_then(DeviceType::from_label),
            operating_system: parsed.operating_system.and_then(non_empty),
            device_brand: parsed.device_brand.and_then(non_empty),
            topic: parsed.topic.and_then(non_empty),
            urgency: parsed
                .urgency
                .as_deref()
                .and_then(Urgency::from_label)
                .unwrap_or_else(|| self.rules.detect_urgency(utterance, intent)),
            clarification_needed: parsed
                .clarification_needed
                .unwrap_or(intent == IntentKind::Unclear),
            source: ClassificationSource::Classified,
        };
        self.fill_slots(&mut analysis, utterance);
        analysis
    }

    /// Regex-only classification.
    fn fallback(&self, utterance: &str, reason: FallbackReason) -> IntentAnalysis {
        let source = ClassificationSource::Fallback { reason };
        let Some(rule) = self.rules.match_intent(utterance) else {
            let mut analysis = IntentAnalysis::unclear("No heuristic rule matched", source);
            self.fill_slots(&mut analysis, utterance);
            return analysis;
        };

        let intent = rule.intent;
        let mut analysis = IntentAnalysis {
            intent,
            confidence: rule.confidence,
            reasoning: format!("Heuristic rule: {}", rule.pattern),
            requires_diagnostic: intent.default_requires_diagnostic(),
            device_type: None,
            operating_system: None,
            device_brand: None,
            topic: None,
            urgency: self.rules.detect_urgency(utterance, intent),
            clarification_needed: false,
            source,
        };
        self.fill_slots(&mut analysis, utterance);
        info!(intent = %intent, rule = %rule.pattern, "Heuristic classification");
        analysis
    }

    /// Fill slots the analysis lacks from the local detectors.
    fn fill_slots(&self, analysis: &mut IntentAnalysis, utterance: &str) {
        if analysis.device_type.is_none() {
            analysis.device_type = self.rules.detect_device(utterance);
        }
        if analysis.operating_system.is_none() {
            analysis.operating_system = self.rules.detect_operating_system(utterance);
        }
        if analysis.device_brand.is_none() {
            analysis.device_brand = self.rules.detect_brand(utterance);
        }
        if analysis.topic.is_none() {
            analysis.topic = self.rules.detect_topic(utterance);
        }
    }
}

impl std::fmt::Debug for IntentClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntentClassifier")
            .field("gateway", &self.gateway)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

// ── Prompt construction ─────────────────────────────────────────────

fn build_classification_system_prompt() -> String {
    let taxonomy = ALL_INTENTS
        .iter()
        .map(|k| format!("- \"{}\": {}", k.label(), describe_intent(*k)))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are the intent classifier of a technical-support assistant. \
         Classify the user's message into exactly one intent.\n\n\
         Intents:\n{taxonomy}\n\n\
         Respond with ONLY a JSON object:\n\
         {{\"intent\": \"...\", \"confidence\": 0.0, \"reasoning\": \"...\", \
         \"requires_diagnostic\": false, \"device_type\": \"...\", \"operating_system\": \"...\", \
         \"device_brand\": \"...\", \"topic\": \"...\", \"urgency\": \"low|medium|high\", \
         \"clarification_needed\": false}}\n\n\
         Rules:\n\
         - Installation or configuration requests are NEVER technical_problem, \
         performance_issue or connection_problem, even if the user says they \"can't\" do it\n\
         - requires_diagnostic is true only for problems that need troubleshooting\n\
         - device_type is one of: desktop, notebook, smartphone, tablet, printer, router, tv, other\n\
         - Omit slots that are not mentioned; never invent them\n\
         - If the message is too vague to act on, use \"unclear\" with clarification_needed true\n\
         - Reasoning is one short sentence"
    )
}

fn describe_intent(kind: IntentKind) -> &'static str {
    match kind {
        IntentKind::TechnicalProblem => "something is broken or fails (won't turn on, errors, crashes)",
        IntentKind::PerformanceIssue => "something works but is slow, freezes or lags",
        IntentKind::ConnectionProblem => "no internet, Wi-Fi drops, cannot connect to a network",
        IntentKind::InstallationHelp => "wants to install, download or reinstall software or apps",
        IntentKind::ConfigurationHelp => "wants to configure, set up or pair a device, account or service",
        IntentKind::HowToQuestion => "asks how to do something",
        IntentKind::InformationRequest => "asks for information (what is, prices, hours)",
        IntentKind::EscalationRequest => "asks for a human technician",
        IntentKind::Feedback => "thanks, praise or complaints about the help",
        IntentKind::CloseChat => "wants to end the conversation",
        IntentKind::Unclear => "cannot be determined",
    }
}

fn build_classification_user_prompt(
    utterance: &str,
    context: &ClassificationContext<'_>,
    language: Language,
) -> String {
    let mut prompt = String::with_capacity(512);

    prompt.push_str(&format!("Conversation stage: {}\n", context.stage));
    prompt.push_str(&format!("User language: {}\n", language.prompt_name()));

    if let Some(active) = context.active_intent.filter(|a| !a.resolved) {
        prompt.push_str(&format!(
            "Open goal: {} (from: \"{}\")\n",
            active.kind, active.original_message
        ));
    }

    let preview: String = utterance.chars().take(MAX_UTTERANCE_CHARS).collect();
    prompt.push_str(&format!("\nMessage:\n{preview}"));

    prompt
}

// ── Response parsing ────────────────────────────────────────────────

/// LLM classification response structure. Everything is optional; the
/// classifier supplies defaults.
#[derive(Debug, Default, serde::Deserialize)]
struct ClassificationResponse {
    #[serde(default)]
    intent: String,
    #[serde(default)]
    confidence: Option<f32>,
    #[serde(default)]
    reasoning: String,
    #[serde(default, alias = "requiresDiagnostic")]
    requires_diagnostic: Option<bool>,
    #[serde(default, alias = "deviceType")]
    device_type: Option<String>,
    #[serde(default, alias = "operatingSystem")]
    operating_system: Option<String>,
    #[serde(default, alias = "deviceBrand")]
    device_brand: Option<String>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    urgency: Option<String>,
    #[serde(default, alias = "clarificationNeeded")]
    clarification_needed: Option<bool>,
}

fn parse_classification_response(raw: &str) -> Result<ClassificationResponse, String> {
    let response: ClassificationResponse = serde_json::from_str(extract_json_object(raw))
        .map_err(|e| format!("JSON parse error: {e}"))?;
    if response.intent.trim().is_empty() {
        return Err("classification has no intent".into());
    }
    Ok(response)
}

fn non_empty(s: String) -> Option<String> {
    let trimmed = s.trim();
    if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("null") || trimmed == "unknown" {
        None
    } else {
        Some(trimmed.to_string())
    }
}
