//! Turn lifecycle types and the events a session reports to observers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Where the in-flight turn currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    Idle,
    /// Waiting on the model; `theme` is set for theme directives
    AwaitingModel { theme: bool },
    AwaitingSearch,
    ApplyingMutations,
}

impl TurnPhase {
    pub fn is_idle(&self) -> bool {
        matches!(self, TurnPhase::Idle)
    }
}

/// How a turn ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnOutcome {
    Answered,
    ThemeApplied,
    Failed,
    Rejected,
}

/// Session event for real-time status updates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A turn was accepted and its placeholder appended
    TurnStarted { turn_id: Uuid, theme: bool },
    /// The turn moved to a new phase
    PhaseChanged { turn_id: Uuid, phase: TurnPhase },
    /// The message at `index` changed in place
    MessageUpdated { index: usize },
    /// Search augmentation was skipped because the provider failed
    SearchDegraded { turn_id: Uuid, reason: String },
    /// Theme descriptors were applied to the live document
    ThemeApplied { turn_id: Uuid, applied: usize },
    /// The host must reload the document to its declared baseline
    ReloadRequested,
    /// The turn finished and the session is idle again
    TurnFinished { turn_id: Uuid, outcome: TurnOutcome },
}

impl SessionEvent {
    pub fn turn_id(&self) -> Option<Uuid> {
        match self {
            SessionEvent::TurnStarted { turn_id, .. }
            | SessionEvent::PhaseChanged { turn_id, .. }
            | SessionEvent::SearchDegraded { turn_id, .. }
            | SessionEvent::ThemeApplied { turn_id, .. }
            | SessionEvent::TurnFinished { turn_id, .. } => Some(*turn_id),
            SessionEvent::MessageUpdated { .. } | SessionEvent::ReloadRequested => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_turn_id_extraction() {
        let id = Uuid::new_v4();
        let event = SessionEvent::PhaseChanged {
            turn_id: id,
            phase: TurnPhase::AwaitingSearch,
        };
        assert_eq!(event.turn_id(), Some(id));
        assert_eq!(SessionEvent::ReloadRequested.turn_id(), None);
    }

    #[test]
    fn test_idle_phase() {
        assert!(TurnPhase::Idle.is_idle());
        assert!(!TurnPhase::AwaitingModel { theme: true }.is_idle());
    }
}
