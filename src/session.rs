//! Session record mutated by the dialogue core.
//!
//! The host owns creation, persistence and destruction. The core only
//! mutates the record it is handed, once per turn.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::locale::Language;
use crate::onboarding::Stage;
use crate::pipeline::types::{ActiveIntent, DeviceType, IntentKind};

/// Who said a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Bot,
}

/// One line of the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Audit record for a stage change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageTransition {
    pub from: Stage,
    pub to: Stage,
    pub timestamp: DateTime<Utc>,
    /// Whether the transition was in the adjacency table (or forced).
    pub validated: bool,
    pub forced: bool,
}

/// What the user said they came for during onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NeedType {
    /// Something is broken.
    Problem,
    /// The user wants to get something done (install, configure, learn).
    Task,
}

/// Attempt counters used as action prerequisites.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AttemptCounters {
    pub basic_tests: u32,
    pub advanced_tests: u32,
    pub clarifications: u32,
}

/// Conversation state for one user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: Uuid,
    pub stage: Stage,
    pub locale: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub need_type: Option<NeedType>,
    pub transcript: Vec<TranscriptEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<DeviceType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operating_system: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device_brand: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub problem: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_intent: Option<ActiveIntent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_detected_intent: Option<IntentKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_intent_confidence: Option<f32>,
    pub stage_transitions: Vec<StageTransition>,
    pub attempts: AttemptCounters,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// Create a fresh session at the first onboarding stage.
    pub fn new(locale: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            stage: Stage::default(),
            locale: locale.into(),
            user_name: None,
            need_type: None,
            transcript: Vec::new(),
            device: None,
            operating_system: None,
            device_brand: None,
            problem: None,
            active_intent: None,
            last_detected_intent: None,
            last_intent_confidence: None,
            stage_transitions: Vec::new(),
            attempts: AttemptCounters::default(),
            created_at: Utc::now(),
        }
    }

    pub fn language(&self) -> Language {
        Language::from_locale(&self.locale)
    }

    /// The open dialogue goal, if any.
    pub fn unresolved_intent(&self) -> Option<&ActiveIntent> {
        self.active_intent.as_ref().filter(|a| !a.resolved)
    }

    pub fn has_attempted_basic_tests(&self) -> bool {
        self.attempts.basic_tests > 0
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Speaker::User, text.into());
    }

    pub fn push_bot(&mut self, text: impl Into<String>) {
        self.push(Speaker::Bot, text.into());
    }

    fn push(&mut self, speaker: Speaker, text: String) {
        self.transcript.push(TranscriptEntry {
            speaker,
            text,
            timestamp: Utc::now(),
        });
    }

    /// The last `n` transcript entries, oldest first.
    pub fn recent_transcript(&self, n: usize) -> &[TranscriptEntry] {
        let start = self.transcript.len().saturating_sub(n);
        &self.transcript[start..]
    }
}
