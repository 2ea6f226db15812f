//! Active-intent tracker: at most one open dialogue goal per session.

use tracing::{debug, info};

use crate::pipeline::types::{ActiveIntent, IntentAnalysis};
use crate::session::Session;

/// What the tracker did with an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackerUpdate {
    /// Auxiliary reply or onboarding capture stage; nothing considered.
    Skipped,
    /// The analysis did not change the goal.
    Unchanged,
    /// A goal was opened where none was open.
    Opened,
    /// The open goal was resolved and replaced by a different one.
    Replaced,
}

impl TrackerUpdate {
    /// Whether a new goal was set this turn.
    pub fn opened_goal(&self) -> bool {
        matches!(self, Self::Opened | Self::Replaced)
    }
}

/// Update `session.active_intent` from a classification.
///
/// The open goal is replaced only by a *different* principal intent, never
/// by an auxiliary reply, and never while language or name is captured.
pub fn update_active_intent(
    session: &mut Session,
    analysis: &IntentAnalysis,
    utterance: &str,
) -> TrackerUpdate {
    if analysis.is_auxiliary_response() || session.stage.is_onboarding_capture() {
        debug!(stage = %session.stage, "Tracker skipped");
        return TrackerUpdate::Skipped;
    }

    if !analysis.intent.is_principal() {
        return TrackerUpdate::Unchanged;
    }

    match session.active_intent.as_mut() {
        Some(current) if !current.resolved && current.kind == analysis.intent => {
            TrackerUpdate::Unchanged
        }
        Some(current) => {
            let was_open = !current.resolved;
            if was_open {
                current.resolved = true;
                info!(
                    previous = %current.kind,
                    next = %analysis.intent,
                    "Active intent replaced"
                );
            }
            session.active_intent = Some(ActiveIntent::from_analysis(analysis, utterance));
            if was_open {
                TrackerUpdate::Replaced
            } else {
                TrackerUpdate::Opened
            }
        }
        None => {
            info!(intent = %analysis.intent, "Active intent opened");
            session.active_intent = Some(ActiveIntent::from_analysis(analysis, utterance));
            TrackerUpdate::Opened
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::onboarding::Stage;
    use crate::pipeline::types::{ClassificationSource, IntentKind, Urgency};

    fn analysis(intent: IntentKind) -> IntentAnalysis {
        IntentAnalysis {
            intent,
            confidence: 0.85,
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

    fn session_at(stage: Stage) -> Session {
        let mut session = Session::new("es-AR");
        session.stage = stage;
        session
    }

    #[test]
    fn opens_goal_for_principal_intent() {
        let mut session = session_at(Stage::AskNeed);
        let update = update_active_intent(
            &mut session,
            &analysis(IntentKind::InstallationHelp),
            "quiero instalar anydesk",
        );
        assert_eq!(update, TrackerUpdate::Opened);
        let active = session.unresolved_intent().unwrap();
        assert_eq!(active.kind, IntentKind::InstallationHelp);
        assert_eq!(active.original_message, "quiero instalar anydesk");
    }

    #[test]
    fn same_intent_keeps_goal() {
        let mut session = session_at(Stage::AskNeed);
        update_active_intent(&mut session, &analysis(IntentKind::TechnicalProblem), "no prende");
        let update = update_active_intent(
            &mut session,
            &analysis(IntentKind::TechnicalProblem),
            "tampoco carga",
        );
        assert_eq!(update, TrackerUpdate::Unchanged);
        assert_eq!(
            session.unresolved_intent().unwrap().original_message,
            "no prende"
        );
    }

    #[test]
    fn different_principal_intent_replaces_goal() {
        let mut session = session_at(Stage::Contextual("DIAGNOSING_PROBLEM".into()));
        update_active_intent(&mut session, &analysis(IntentKind::TechnicalProblem), "no prende");
        let update = update_active_intent(
            &mut session,
            &analysis(IntentKind::InstallationHelp),
            "ahora quiero instalar zoom",
        );
        assert_eq!(update, TrackerUpdate::Replaced);
        assert!(update.opened_goal());
        assert_eq!(
            session.unresolved_intent().unwrap().kind,
            IntentKind::InstallationHelp
        );
    }

    #[test]
    fn auxiliary_and_non_principal_never_replace() {
        let mut session = session_at(Stage::AskNeed);
        update_active_intent(&mut session, &analysis(IntentKind::InstallationHelp), "instalar");

        let mut aux = analysis(IntentKind::TechnicalProblem);
        aux.source = ClassificationSource::Auxiliary {
            data: "windows".into(),
        };
        assert_eq!(
            update_active_intent(&mut session, &aux, "windows"),
            TrackerUpdate::Skipped
        );

        for kind in [
            IntentKind::Feedback,
            IntentKind::EscalationRequest,
            IntentKind::CloseChat,
            IntentKind::Unclear,
        ] {
            assert_eq!(
                update_active_intent(&mut session, &analysis(kind), "x"),
                TrackerUpdate::Unchanged
            );
        }
        assert_eq!(
            session.unresolved_intent().unwrap().kind,
            IntentKind::InstallationHelp
        );
    }

    #[test]
    fn onboarding_capture_stages_never_own_a_goal() {
        for stage in [Stage::AskLanguage, Stage::AskName] {
            let mut session = session_at(stage);
            let update = update_active_intent(
                &mut session,
                &analysis(IntentKind::TechnicalProblem),
                "Juan",
            );
            assert_eq!(update, TrackerUpdate::Skipped);
            assert!(session.active_intent.is_none());
        }
    }

    #[test]
    fn goal_after_resolution_is_opened_not_replaced() {
        let mut session = session_at(Stage::AskNeed);
        update_active_intent(&mut session, &analysis(IntentKind::HowToQuestion), "cómo hago");
        if let Some(active) = session.active_intent.as_mut() {
            active.resolved = true;
        }
        let update =
            update_active_intent(&mut session, &analysis(IntentKind::HowToQuestion), "cómo hago otra");
        assert_eq!(update, TrackerUpdate::Opened);
        assert!(session.unresolved_intent().is_some());
    }
}
