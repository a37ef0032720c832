//! Core error types for hopshell-core

use std::time::Duration;

use hopshell_exec::ExecError;
use thiserror::Error;

use crate::state::RunPhase;

/// Errors that can occur while running or recording an operation
#[derive(Error, Debug, Clone)]
pub enum CoreError {
    /// Preflight probe through the chain failed
    #[error("connectivity check failed: {0}")]
    Connectivity(String),

    /// Script copy to the target failed
    #[error("script upload failed: {0}")]
    Upload(String),

    /// A bounded invocation exceeded its limit
    #[error("{phase} timed out after {timeout:?}")]
    Timeout {
        /// Phase that was running
        phase: RunPhase,
        /// Limit that was exceeded
        timeout: Duration,
    },

    /// Transport could not run the invocation at all
    #[error("transport error: {0}")]
    Transport(#[from] ExecError),

    /// Local script does not exist
    #[error("script file not found: {0}")]
    ScriptNotFound(String),

    /// Record could not be written
    #[error("failed to persist record: {0}")]
    Persist(String),

    /// Run was cancelled by the operator
    #[error("interrupted during {0}")]
    Interrupted(RunPhase),

    /// Invalid state transition attempted
    #[error("invalid phase transition from {from} to {to}")]
    InvalidTransition {
        /// Current phase
        from: RunPhase,
        /// Attempted target phase
        to: RunPhase,
    },
}

impl CoreError {
    /// Map a transport failure during `phase`, keeping timeouts distinct
    #[must_use]
    pub fn from_exec(phase: RunPhase, err: ExecError) -> Self {
        match err {
            ExecError::Timeout { timeout } => CoreError::Timeout { phase, timeout },
            other => CoreError::Transport(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_exec_keeps_timeouts_distinct() {
        let timeout = CoreError::from_exec(
            RunPhase::Dispatch,
            ExecError::Timeout {
                timeout: Duration::from_secs(300),
            },
        );
        assert_eq!(timeout.to_string(), "dispatch timed out after 300s");

        let spawn = CoreError::from_exec(
            RunPhase::Dispatch,
            ExecError::SpawnError("ssh: not found".to_string()),
        );
        let CoreError::Transport(inner) = spawn else {
            panic!("spawn failures stay transport errors");
        };
        assert!(matches!(inner, ExecError::SpawnError(_)));
    }
}
