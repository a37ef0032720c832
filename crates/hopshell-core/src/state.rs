//! Run phase state machine

use std::fmt;

use serde::Serialize;

/// Phases of a single run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Pending,
    Preflight,
    Upload,
    Dispatch,
    Cleanup,
    Succeeded,
    Failed,
}

impl RunPhase {
    /// Whether the run is over
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, RunPhase::Succeeded | RunPhase::Failed)
    }

    /// Allowed transitions; any live phase may end the run
    #[must_use]
    pub fn can_transition_to(self, next: RunPhase) -> bool {
        use RunPhase::{Cleanup, Dispatch, Failed, Pending, Preflight, Succeeded, Upload};

        match (self, next) {
            (from, _) if from.is_terminal() => false,
            (_, Succeeded | Failed) => true,
            (Pending, Preflight)
            | (Preflight, Upload | Dispatch)
            | (Upload, Dispatch)
            | (Dispatch, Cleanup) => true,
            _ => false,
        }
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Pending => "pending",
            RunPhase::Preflight => "preflight",
            RunPhase::Upload => "upload",
            RunPhase::Dispatch => "dispatch",
            RunPhase::Cleanup => "cleanup",
            RunPhase::Succeeded => "succeeded",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_path() {
        assert!(RunPhase::Pending.can_transition_to(RunPhase::Preflight));
        assert!(RunPhase::Preflight.can_transition_to(RunPhase::Dispatch));
        assert!(RunPhase::Dispatch.can_transition_to(RunPhase::Succeeded));
    }

    #[test]
    fn test_script_path() {
        assert!(RunPhase::Preflight.can_transition_to(RunPhase::Upload));
        assert!(RunPhase::Upload.can_transition_to(RunPhase::Dispatch));
        assert!(RunPhase::Dispatch.can_transition_to(RunPhase::Cleanup));
        assert!(RunPhase::Cleanup.can_transition_to(RunPhase::Failed));
    }

    #[test]
    fn test_no_skipping_preflight() {
        assert!(!RunPhase::Pending.can_transition_to(RunPhase::Dispatch));
        assert!(!RunPhase::Pending.can_transition_to(RunPhase::Upload));
        assert!(!RunPhase::Cleanup.can_transition_to(RunPhase::Dispatch));
    }

    #[test]
    fn test_terminal_is_final() {
        assert!(!RunPhase::Failed.can_transition_to(RunPhase::Succeeded));
        assert!(!RunPhase::Succeeded.can_transition_to(RunPhase::Failed));
        assert!(RunPhase::Failed.is_terminal());
    }
}
