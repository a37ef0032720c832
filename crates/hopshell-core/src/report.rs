//! Progress notifications emitted while a run advances

use hopshell_exec::CommandResult;

use crate::state::RunPhase;

/// Something the operator may want to see
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    /// Entered a new phase
    Phase(RunPhase),
    /// Preflight probe succeeded
    Connected,
    /// Script copied to the target
    Uploaded { remote_path: &'a str },
    /// Dispatched command/script returned
    Output(&'a CommandResult),
    /// Uploaded script left on the target
    ScriptKept { remote_path: &'a str },
    /// Cleanup invocation returned (its outcome is ignored)
    CleanedUp,
    /// A stage failed; the run is over
    Error(&'a str),
}

/// Receives run events, e.g. to print progress
pub trait Reporter: Send + Sync {
    fn on_event(&self, event: RunEvent<'_>);
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl Reporter for NoopReporter {
    fn on_event(&self, _event: RunEvent<'_>) {}
}
