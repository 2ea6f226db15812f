//! Configuration types.

use std::collections::HashMap;
use std::time::Duration;

use crate::error::ConfigError;
use crate::onboarding::Stage;

/// What the orchestrator does with a low-confidence classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LowConfidenceAction {
    /// Reply with a generic clarification prompt and no options.
    Clarify,
    /// Return `TurnOutcome::NotHandled` so an external onboarding validator answers.
    DeclineTurn,
    /// Synthesize a reply anyway (avoids clarification loops).
    ProceedToSynthesis,
}

/// Per-stage policy for unclear or low-confidence classifications.
#[derive(Debug, Clone)]
pub struct ClarificationPolicy {
    /// Classifications below this confidence count as unclear.
    pub threshold: f32,
    /// Stages whose handling differs from `Clarify`.
    pub stage_overrides: HashMap<Stage, LowConfidenceAction>,
}

impl ClarificationPolicy {
    /// Action to take for a low-confidence classification in `stage`.
    pub fn action_for(&self, stage: &Stage) -> LowConfidenceAction {
        self.stage_overrides
            .get(stage)
            .copied()
            .unwrap_or(LowConfidenceAction::Clarify)
    }

    /// Whether a classification with this confidence needs clarification.
    pub fn is_low(&self, confidence: f32) -> bool {
        confidence < self.threshold
    }
}

impl Default for ClarificationPolicy {
    fn default() -> Self {
        let mut stage_overrides = HashMap::new();
        stage_overrides.insert(Stage::AskLanguage, LowConfidenceAction::DeclineTurn);
        stage_overrides.insert(Stage::AskName, LowConfidenceAction::DeclineTurn);
        stage_overrides.insert(Stage::AskNeed, LowConfidenceAction::ProceedToSynthesis);
        Self {
            threshold: 0.6,
            stage_overrides,
        }
    }
}

/// Dialogue core configuration.
#[derive(Debug, Clone)]
pub struct DialogueConfig {
    /// Block stage transitions that are not in the adjacency table.
    /// When false, invalid transitions are audited and logged but allowed.
    pub strict_transitions: bool,
    /// Bound applied to every collaborator call.
    pub llm_timeout: Duration,
    /// Number of transcript entries embedded in synthesis prompts.
    pub transcript_window: usize,
    /// Low-confidence handling.
    pub clarification: ClarificationPolicy,
    pub classification_temperature: f32,
    pub classification_max_tokens: u32,
    pub synthesis_temperature: f32,
    pub synthesis_max_tokens: u32,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            strict_transitions: false,
            llm_timeout: Duration::from_secs(30),
            transcript_window: 6,
            clarification: ClarificationPolicy::default(),
            classification_temperature: 0.1,
            classification_max_tokens: 400,
            synthesis_temperature: 0.7,
            synthesis_max_tokens: 600,
        }
    }
}

impl DialogueConfig {
    /// Build a config from `HELPDESK_*` environment variables, falling back
    /// to defaults for anything unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Ok(raw) = std::env::var("HELPDESK_STRICT_TRANSITIONS") {
            config.strict_transitions = parse_bool("HELPDESK_STRICT_TRANSITIONS", &raw)?;
        }

        if let Ok(raw) = std::env::var("HELPDESK_LLM_TIMEOUT_SECS") {
            let secs: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "HELPDESK_LLM_TIMEOUT_SECS".to_string(),
                message: format!("expected seconds, got '{raw}'"),
            })?;
            config.llm_timeout = Duration::from_secs(secs);
        }

        if let Ok(raw) = std::env::var("HELPDESK_TRANSCRIPT_WINDOW") {
            config.transcript_window =
                raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                    key: "HELPDESK_TRANSCRIPT_WINDOW".to_string(),
                    message: format!("expected a count, got '{raw}'"),
                })?;
        }

        if let Ok(raw) = std::env::var("HELPDESK_CLARIFY_THRESHOLD") {
            let threshold: f32 = raw.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "HELPDESK_CLARIFY_THRESHOLD".to_string(),
                message: format!("expected a number, got '{raw}'"),
            })?;
            if !(0.0..=1.0).contains(&threshold) {
                return Err(ConfigError::InvalidValue {
                    key: "HELPDESK_CLARIFY_THRESHOLD".to_string(),
                    message: format!("{threshold} is outside [0, 1]"),
                });
            }
            config.clarification.threshold = threshold;
        }

        Ok(config)
    }
}

fn parse_bool(key: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::InvalidValue {
            key: key.to_string(),
            message: format!("expected a boolean, got '{other}'"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy_special_cases_onboarding_stages() {
        let policy = ClarificationPolicy::default();
        assert_eq!(policy.action_for(&Stage::AskLanguage), LowConfidenceAction::DeclineTurn);
        assert_eq!(policy.action_for(&Stage::AskName), LowConfidenceAction::DeclineTurn);
        assert_eq!(
            policy.action_for(&Stage::AskNeed),
            LowConfidenceAction::ProceedToSynthesis
        );
        assert_eq!(policy.action_for(&Stage::AskProblem), LowConfidenceAction::Clarify);
        assert_eq!(
            policy.action_for(&Stage::Contextual("DIAGNOSING_PROBLEM".into())),
            LowConfidenceAction::Clarify
        );
    }

    #[test]
    fn threshold_is_exclusive() {
        let policy = ClarificationPolicy::default();
        assert!(policy.is_low(0.59));
        assert!(!policy.is_low(0.6));
    }

    #[test]
    fn defaults_are_soft_with_thirty_second_timeout() {
        let config = DialogueConfig::default();
        assert!(!config.strict_transitions);
        assert_eq!(config.llm_timeout, Duration::from_secs(30));
    }

    #[test]
    fn parse_bool_accepts_common_spellings() {
        assert!(parse_bool("K", "TRUE").unwrap());
        assert!(!parse_bool("K", "off").unwrap());
        assert!(parse_bool("K", "maybe").is_err());
    }
}
