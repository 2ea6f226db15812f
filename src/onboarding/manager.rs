//! StageMachine: applies stage changes to a session and keeps the audit log.

use chrono::Utc;
use tracing::{info, warn};

use crate::error::DialogueError;
use crate::session::{Session, StageTransition};

use super::state::Stage;

/// Applies stage transitions against the static adjacency table.
///
/// In soft mode (the default) an undeclared transition is logged and
/// recorded with `validated = false` but still applied. In strict mode it is
/// recorded and then refused with [`DialogueError::InvalidTransition`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StageMachine {
    strict: bool,
}

impl StageMachine {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }

    /// Whether `from → to` is in the adjacency table.
    pub fn is_valid_transition(&self, from: &Stage, to: &Stage) -> bool {
        from.can_transition_to(to)
    }

    /// Move `session` to `new_stage`.
    ///
    /// Returns the recorded transition, or `None` when the session is already
    /// at `new_stage` (nothing is recorded). `force` skips validation.
    pub fn change_stage(
        &self,
        session: &mut Session,
        new_stage: Stage,
        force: bool,
    ) -> Result<Option<StageTransition>, DialogueError> {
        if session.stage == new_stage {
            return Ok(None);
        }

        let from = session.stage.clone();
        let valid = force || self.is_valid_transition(&from, &new_stage);
        let transition = StageTransition {
            from: from.clone(),
            to: new_stage.clone(),
            timestamp: Utc::now(),
            validated: valid,
            forced: force,
        };
        session.stage_transitions.push(transition.clone());

        if !valid {
            if self.strict {
                warn!(from = %from, to = %new_stage, "Invalid stage transition blocked");
                return Err(DialogueError::InvalidTransition {
                    from: from.to_string(),
                    to: new_stage.to_string(),
                });
            }
            warn!(from = %from, to = %new_stage, "Invalid stage transition allowed");
        } else {
            info!(from = %from, to = %new_stage, forced = force, "Stage changed");
        }

        session.stage = new_stage;
        Ok(Some(transition))
    }
}
