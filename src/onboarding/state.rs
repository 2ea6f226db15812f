//! Dialogue stages and the static adjacency table.

use serde::{Deserialize, Serialize};

/// Coarse position of a conversation.
///
/// Onboarding runs AskLanguage → AskName → AskNeed; afterwards the
/// conversation either walks the declared diagnostic/escalation tail or
/// carries a free-form contextual label such as `DIAGNOSING_PROBLEM`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Stage {
    AskLanguage,
    AskName,
    AskNeed,
    AskDevice,
    AskOs,
    AskProblem,
    BasicTests,
    AdvancedTests,
    Escalate,
    CreateTicket,
    TicketSent,
    Ended,
    /// Label emitted by the orchestrator once onboarding is over.
    Contextual(String),
}

/// Declared stages, in flow order.
pub const DECLARED_STAGES: [Stage; 12] = [
    Stage::AskLanguage,
    Stage::AskName,
    Stage::AskNeed,
    Stage::AskDevice,
    Stage::AskOs,
    Stage::AskProblem,
    Stage::BasicTests,
    Stage::AdvancedTests,
    Stage::Escalate,
    Stage::CreateTicket,
    Stage::TicketSent,
    Stage::Ended,
];

impl Stage {
    /// Stages reachable from `self` according to the static table.
    ///
    /// Contextual labels are handled by [`Stage::can_transition_to`].
    pub fn allowed_next(&self) -> &'static [Stage] {
        use Stage::*;
        match self {
            AskLanguage => &[AskName],
            AskName => &[AskNeed],
            AskNeed => &[AskDevice, AskOs, AskProblem],
            AskDevice => &[AskOs, AskProblem],
            AskOs => &[AskDevice, AskProblem],
            AskProblem => &[BasicTests, Escalate],
            BasicTests => &[AdvancedTests, Escalate, Ended],
            AdvancedTests => &[Escalate, Ended],
            Escalate => &[CreateTicket, Ended],
            CreateTicket => &[TicketSent],
            TicketSent => &[Ended],
            Ended => &[],
            Contextual(_) => &[
                AskDevice,
                AskOs,
                AskProblem,
                BasicTests,
                AdvancedTests,
                Escalate,
                Ended,
            ],
        }
    }

    /// Check if a transition from `self` to `target` is valid.
    ///
    /// Contextual labels may be entered from any post-onboarding stage that
    /// is not terminal, and from one another.
    pub fn can_transition_to(&self, target: &Stage) -> bool {
        if let Stage::Contextual(_) = target {
            return self.is_post_onboarding() && !self.is_terminal();
        }
        self.allowed_next().contains(target)
    }

    /// Whether this stage captures onboarding data (language or name) and
    /// therefore never owns a dialogue goal.
    pub fn is_onboarding_capture(&self) -> bool {
        matches!(self, Self::AskLanguage | Self::AskName)
    }

    /// Whether onboarding is over (AskNeed onward).
    pub fn is_post_onboarding(&self) -> bool {
        !self.is_onboarding_capture()
    }

    /// Whether this stage is terminal (conversation is done).
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Ended)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::AskLanguage => "ASK_LANGUAGE",
            Self::AskName => "ASK_NAME",
            Self::AskNeed => "ASK_NEED",
            Self::AskDevice => "ASK_DEVICE",
            Self::AskOs => "ASK_OS",
            Self::AskProblem => "ASK_PROBLEM",
            Self::BasicTests => "BASIC_TESTS",
            Self::AdvancedTests => "ADVANCED_TESTS",
            Self::Escalate => "ESCALATE",
            Self::CreateTicket => "CREATE_TICKET",
            Self::TicketSent => "TICKET_SENT",
            Self::Ended => "ENDED",
            Self::Contextual(label) => label,
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Self::AskLanguage
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<&str> for Stage {
    fn from(raw: &str) -> Self {
        DECLARED_STAGES
            .iter()
            .find(|s| s.as_str() == raw)
            .cloned()
            .unwrap_or_else(|| Self::Contextual(raw.to_string()))
    }
}

impl From<String> for Stage {
    fn from(raw: String) -> Self {
        Stage::from(raw.as_str())
    }
}

impl From<Stage> for String {
    fn from(stage: Stage) -> Self {
        stage.as_str().to_string()
    }
}
