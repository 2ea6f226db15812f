//! Shared types for the turn pipeline.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ── Intent taxonomy ─────────────────────────────────────────────────

/// Closed intent taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    TechnicalProblem,
    PerformanceIssue,
    ConnectionProblem,
    InstallationHelp,
    ConfigurationHelp,
    HowToQuestion,
    InformationRequest,
    EscalationRequest,
    Feedback,
    CloseChat,
    Unclear,
}

/// Every intent, in prompt order.
pub const ALL_INTENTS: [IntentKind; 11] = [
    IntentKind::TechnicalProblem,
    IntentKind::PerformanceIssue,
    IntentKind::ConnectionProblem,
    IntentKind::InstallationHelp,
    IntentKind::ConfigurationHelp,
    IntentKind::HowToQuestion,
    IntentKind::InformationRequest,
    IntentKind::EscalationRequest,
    IntentKind::Feedback,
    IntentKind::CloseChat,
    IntentKind::Unclear,
];

impl IntentKind {
    /// Parse a taxonomy label. Unknown labels return `None`.
    pub fn from_label(label: &str) -> Option<Self> {
        ALL_INTENTS
            .iter()
            .copied()
            .find(|k| k.label() == label.trim().to_ascii_lowercase())
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::TechnicalProblem => "technical_problem",
            Self::PerformanceIssue => "performance_issue",
            Self::ConnectionProblem => "connection_problem",
            Self::InstallationHelp => "installation_help",
            Self::ConfigurationHelp => "configuration_help",
            Self::HowToQuestion => "how_to_question",
            Self::InformationRequest => "information_request",
            Self::EscalationRequest => "escalation_request",
            Self::Feedback => "feedback",
            Self::CloseChat => "close_chat",
            Self::Unclear => "unclear",
        }
    }

    /// Principal intents can own the session's active dialogue goal.
    pub fn is_principal(&self) -> bool {
        matches!(
            self,
            Self::TechnicalProblem
                | Self::PerformanceIssue
                | Self::ConnectionProblem
                | Self::InstallationHelp
                | Self::ConfigurationHelp
                | Self::HowToQuestion
                | Self::InformationRequest
        )
    }

    /// Problem intents are diagnosed; task intents are guided.
    pub fn is_problem(&self) -> bool {
        matches!(
            self,
            Self::TechnicalProblem | Self::PerformanceIssue | Self::ConnectionProblem
        )
    }

    /// Default for `requires_diagnostic` when the classifier does not say.
    pub fn default_requires_diagnostic(&self) -> bool {
        self.is_problem()
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

// ── Slots ───────────────────────────────────────────────────────────

/// Device category mentioned by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceType {
    Desktop,
    Notebook,
    Smartphone,
    Tablet,
    Printer,
    Router,
    Tv,
    Other,
}

impl DeviceType {
    /// Lenient parse of labels the LLM tends to produce.
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "desktop" | "pc" | "computer" | "computadora" => Some(Self::Desktop),
            "notebook" | "laptop" => Some(Self::Notebook),
            "smartphone" | "phone" | "mobile" | "celular" => Some(Self::Smartphone),
            "tablet" => Some(Self::Tablet),
            "printer" | "impresora" => Some(Self::Printer),
            "router" | "modem" => Some(Self::Router),
            "tv" | "smart_tv" | "stick_tv" | "tv_stick" => Some(Self::Tv),
            "other" => Some(Self::Other),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Desktop => "desktop",
            Self::Notebook => "notebook",
            Self::Smartphone => "smartphone",
            Self::Tablet => "tablet",
            Self::Printer => "printer",
            Self::Router => "router",
            Self::Tv => "tv",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    #[default]
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "low" | "baja" => Some(Self::Low),
            "medium" | "normal" | "media" => Some(Self::Medium),
            "high" | "urgent" | "critical" | "alta" => Some(Self::High),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

// ── Classification result ───────────────────────────────────────────

/// Why the classifier fell back to local heuristics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackReason {
    CollaboratorUnavailable,
    CollaboratorError,
    MalformedResponse,
}

/// Which classification path produced an analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "path", rename_all = "snake_case")]
pub enum ClassificationSource {
    /// Short reply to an open active intent; the LLM was skipped.
    Auxiliary { data: String },
    /// The LLM classified the utterance.
    Classified,
    /// Regex heuristics after the LLM was unavailable or failed.
    Fallback { reason: FallbackReason },
}

impl ClassificationSource {
    /// Short label for logging.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Auxiliary { .. } => "auxiliary",
            Self::Classified => "classified",
            Self::Fallback { .. } => "fallback",
        }
    }
}

/// Result of classifying one utterance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentAnalysis {
    pub intent: IntentKind,
    /// Always within [0, 1].
    pub confidence: f32,
    pub reasoning: String,
    pub requires_diagnostic: bool,
    pub device_type: Option<DeviceType>,
    pub operating_system: Option<String>,
    pub device_brand: Option<String>,
    pub topic: Option<String>,
    pub urgency: Urgency,
    pub clarification_needed: bool,
    pub source: ClassificationSource,
}

impl IntentAnalysis {
    /// The analysis returned when nothing matched.
    pub fn unclear(reasoning: impl Into<String>, source: ClassificationSource) -> Self {
        Self {
            intent: IntentKind::Unclear,
            confidence: 0.3,
            reasoning: reasoning.into(),
            requires_diagnostic: false,
            device_type: None,
            operating_system: None,
            device_brand: None,
            topic: None,
            urgency: Urgency::Low,
            clarification_needed: true,
            source,
        }
    }

    pub fn is_auxiliary_response(&self) -> bool {
        matches!(self.source, ClassificationSource::Auxiliary { .. })
    }

    /// The trimmed short reply, for auxiliary responses.
    pub fn auxiliary_data(&self) -> Option<&str> {
        match &self.source {
            ClassificationSource::Auxiliary { data } => Some(data),
            _ => None,
        }
    }
}

// ── Active intent ───────────────────────────────────────────────────

/// The single open dialogue goal of a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActiveIntent {
    pub kind: IntentKind,
    pub original_message: String,
    pub confidence: f32,
    pub timestamp: DateTime<Utc>,
    pub resolved: bool,
    pub requires_diagnostic: bool,
    pub device_type: Option<DeviceType>,
    pub urgency: Urgency,
    pub topic: Option<String>,
}

impl ActiveIntent {
    pub fn from_analysis(analysis: &IntentAnalysis, utterance: &str) -> Self {
        Self {
            kind: analysis.intent,
            original_message: utterance.trim().to_string(),
            confidence: analysis.confidence,
            timestamp: Utc::now(),
            resolved: false,
            requires_diagnostic: analysis.requires_diagnostic,
            device_type: analysis.device_type,
            urgency: analysis.urgency,
            topic: analysis.topic.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_roundtrip_through_from_label() {
        for kind in ALL_INTENTS {
            assert_eq!(IntentKind::from_label(kind.label()), Some(kind));
            let json = serde_json::to_string(&kind).unwrap();
            assert_eq!(json, format!("\"{}\"", kind.label()));
        }
        assert_eq!(IntentKind::from_label(" Installation_Help "), Some(IntentKind::InstallationHelp));
        assert_eq!(IntentKind::from_label("greeting"), None);
    }

    #[test]
    fn principal_set_excludes_auxiliary_kinds() {
        assert!(IntentKind::InstallationHelp.is_principal());
        assert!(IntentKind::InformationRequest.is_principal());
        assert!(!IntentKind::EscalationRequest.is_principal());
        assert!(!IntentKind::Feedback.is_principal());
        assert!(!IntentKind::CloseChat.is_principal());
        assert!(!IntentKind::Unclear.is_principal());
    }

    #[test]
    fn only_problems_require_diagnostic_by_default() {
        assert!(IntentKind::TechnicalProblem.default_requires_diagnostic());
        assert!(IntentKind::ConnectionProblem.default_requires_diagnostic());
        assert!(!IntentKind::InstallationHelp.default_requires_diagnostic());
        assert!(!IntentKind::ConfigurationHelp.default_requires_diagnostic());
    }

    #[test]
    fn device_and_urgency_parse_leniently() {
        assert_eq!(DeviceType::from_label("Laptop"), Some(DeviceType::Notebook));
        assert_eq!(DeviceType::from_label("stick_tv"), Some(DeviceType::Tv));
        assert_eq!(DeviceType::from_label("toaster"), None);
        assert_eq!(Urgency::from_label("CRITICAL"), Some(Urgency::High));
        assert!(Urgency::High > Urgency::Medium);
    }

    #[test]
    fn unclear_analysis_needs_clarification() {
        let analysis = IntentAnalysis::unclear(
            "nothing matched",
            ClassificationSource::Fallback {
                reason: FallbackReason::CollaboratorUnavailable,
            },
        );
        assert_eq!(analysis.intent, IntentKind::Unclear);
        assert!((analysis.confidence - 0.3).abs() < f32::EPSILON);
        assert!(analysis.clarification_needed);
        assert!(!analysis.is_auxiliary_response());
        assert!(analysis.auxiliary_data().is_none());
    }

    #[test]
    fn source_serializes_with_path_tag() {
        let source = ClassificationSource::Auxiliary {
            data: "windows".into(),
        };
        let json = serde_json::to_value(&source).unwrap();
        assert_eq!(json["path"], "auxiliary");
        assert_eq!(json["data"], "windows");
    }
}
