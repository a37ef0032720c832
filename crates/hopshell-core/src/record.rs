//! Execution records
//!
//! A record is assembled through [`ExecutionRecordBuilder`] while the run
//! progresses and frozen into an [`ExecutionRecord`] exactly once.

use std::time::Instant;

use chrono::{DateTime, Local};
use hopshell_exec::{Chain, CommandResult};
use hopshell_route::{Resolution, TargetHost};
use serde::Serialize;

use crate::error::CoreError;
use crate::payload::ExecutionPayload;
use crate::state::RunPhase;

/// How the chain was chosen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    /// Chain resolved from the route table
    RoutedExec,
    /// Chain given explicitly by the operator
    JumpExec,
}

/// Payload as stored in the record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PayloadRecord {
    Command { command: String },
    Script { script: String, keep: bool },
}

impl From<&ExecutionPayload> for PayloadRecord {
    fn from(payload: &ExecutionPayload) -> Self {
        match payload {
            ExecutionPayload::Command(text) => PayloadRecord::Command {
                command: text.clone(),
            },
            ExecutionPayload::Script {
                local_path,
                keep_after_run,
            } => PayloadRecord::Script {
                script: local_path.display().to_string(),
                keep: *keep_after_run,
            },
        }
    }
}

/// Finalized, immutable outcome of one run
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionRecord {
    operation: Operation,
    timestamp: DateTime<Local>,
    executed_by: String,
    target: String,
    target_ip: String,
    resolution: Resolution,
    chain: Chain,
    payload: PayloadRecord,
    output: String,
    exit_code: Option<i32>,
    success: bool,
    phase: RunPhase,
    remote_script_path: Option<String>,
    errors: Vec<String>,
    duration_ms: u64,
}

impl ExecutionRecord {
    #[must_use]
    pub fn operation(&self) -> Operation {
        self.operation
    }

    /// Wall-clock start of the run
    #[must_use]
    pub fn timestamp(&self) -> DateTime<Local> {
        self.timestamp
    }

    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Routing key the run was namespaced under
    #[must_use]
    pub fn target_ip(&self) -> &str {
        &self.target_ip
    }

    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    #[must_use]
    pub fn payload(&self) -> &PayloadRecord {
        &self.payload
    }

    /// stdout followed by stderr of the dispatched command/script
    #[must_use]
    pub fn output(&self) -> &str {
        &self.output
    }

    /// Remote exit status; absent when dispatch never completed
    #[must_use]
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    /// True iff the remote exit code is 0 and no stage recorded an error
    #[must_use]
    pub fn success(&self) -> bool {
        self.success
    }

    /// Terminal phase: `Succeeded` or `Failed`
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Set only for script runs whose upload succeeded
    #[must_use]
    pub fn remote_script_path(&self) -> Option<&str> {
        self.remote_script_path.as_deref()
    }

    #[must_use]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    #[must_use]
    pub fn executed_by(&self) -> &str {
        &self.executed_by
    }

    #[must_use]
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }
}

/// Accumulates a record across the run phases
#[derive(Debug)]
pub struct ExecutionRecordBuilder {
    operation: Operation,
    timestamp: DateTime<Local>,
    started: Instant,
    executed_by: String,
    target: String,
    target_ip: String,
    resolution: Resolution,
    chain: Chain,
    payload: PayloadRecord,
    output: String,
    exit_code: Option<i32>,
    phase: RunPhase,
    remote_script_path: Option<String>,
    errors: Vec<String>,
}

impl ExecutionRecordBuilder {
    /// Start a record for a run
    #[must_use]
    pub fn new(
        operation: Operation,
        target: &TargetHost,
        chain: &Chain,
        payload: &ExecutionPayload,
    ) -> Self {
        Self {
            operation,
            timestamp: Local::now(),
            started: Instant::now(),
            executed_by: executed_by(),
            target: target.raw().to_string(),
            target_ip: target.resolved_ip().to_string(),
            resolution: target.resolution(),
            chain: chain.clone(),
            payload: payload.into(),
            output: String::new(),
            exit_code: None,
            phase: RunPhase::Pending,
            remote_script_path: None,
            errors: Vec::new(),
        }
    }

    /// Override who ran it (defaults to `$USER@hostname`)
    #[must_use]
    pub fn with_executed_by(mut self, who: impl Into<String>) -> Self {
        self.executed_by = who.into();
        self
    }

    /// Phase the run is currently in
    #[must_use]
    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    /// Move to the next phase
    ///
    /// # Errors
    /// Returns `CoreError::InvalidTransition` if `next` is not reachable from
    /// the current phase
    pub fn advance(&mut self, next: RunPhase) -> Result<(), CoreError> {
        if !self.phase.can_transition_to(next) {
            return Err(CoreError::InvalidTransition {
                from: self.phase,
                to: next,
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Record the dispatched command's outcome
    pub fn set_outcome(&mut self, result: &CommandResult) {
        self.output = result.combined_output();
        self.exit_code = Some(result.status);
    }

    /// Record where the script was uploaded
    pub fn set_remote_script_path(&mut self, path: impl Into<String>) {
        self.remote_script_path = Some(path.into());
    }

    /// Append an error; any error makes the run unsuccessful
    pub fn push_error(&mut self, err: &CoreError) {
        self.errors.push(err.to_string());
    }

    /// Whether the run would currently count as a success
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0) && self.errors.is_empty()
    }

    /// Freeze the record
    #[must_use]
    pub fn finish(self) -> ExecutionRecord {
        let success = self.is_success();
        let phase = if success {
            RunPhase::Succeeded
        } else {
            RunPhase::Failed
        };
        let duration_ms = u64::try_from(self.started.elapsed().as_millis()).unwrap_or(u64::MAX);

        ExecutionRecord {
            operation: self.operation,
            timestamp: self.timestamp,
            executed_by: self.executed_by,
            target: self.target,
            target_ip: self.target_ip,
            resolution: self.resolution,
            chain: self.chain,
            payload: self.payload,
            output: self.output,
            exit_code: self.exit_code,
            success,
            phase,
            remote_script_path: self.remote_script_path,
            errors: self.errors,
            duration_ms,
        }
    }
}

fn executed_by() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("LOGNAME"))
        .unwrap_or_else(|_| "unknown".to_string());
    format!("{user}@{}", local_hostname())
}

fn local_hostname() -> String {
    std::fs::read_to_string("/proc/sys/kernel/hostname")
        .or_else(|_| std::fs::read_to_string("/etc/hostname"))
        .map(|h| h.trim().to_string())
        .ok()
        .filter(|h| !h.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| "localhost".to_string())
}
