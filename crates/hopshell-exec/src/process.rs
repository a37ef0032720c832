//! Transport backed by local OpenSSH client processes (`tokio::process`)

use std::process::Stdio;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use crate::command::TransportCommand;
use crate::error::ExecError;
use crate::result::CommandResult;
use crate::traits::Transport;

/// Spawns `ssh`/`scp` as child processes.
///
/// Children are killed when their future is dropped, so a timeout or an
/// interrupted run never leaves a dangling client behind.
#[derive(Debug, Clone)]
pub struct ProcessTransport;

impl ProcessTransport {
    /// Create a new process transport
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    #[instrument(skip(self), fields(program = %cmd.program), level = "debug")]
    async fn execute(&self, cmd: &TransportCommand) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        debug!(command = %cmd, "spawning transport process");

        let child = Command::new(&cmd.program)
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| ExecError::SpawnError(format!("{}: {e}", cmd.program)))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let duration = start.elapsed();

        let status = output.status.code().unwrap_or(-1);
        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        debug!(
            program = %cmd.program,
            status = status,
            duration = ?duration,
            "transport process completed"
        );

        Ok(CommandResult {
            status,
            stdout,
            stderr,
            duration,
        })
    }
}

impl Default for ProcessTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ProcessTransport {
    async fn run(&self, cmd: &TransportCommand) -> Result<CommandResult, ExecError> {
        self.execute(cmd).await
    }

    async fn run_with_timeout(
        &self,
        cmd: &TransportCommand,
        timeout_duration: Duration,
    ) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        debug!(command = %cmd, timeout = ?timeout_duration, "executing with timeout");

        match timeout(timeout_duration, self.execute(cmd)).await {
            Ok(result) => result,
            Err(_) => {
                error!(
                    command = %cmd,
                    timeout = ?timeout_duration,
                    elapsed = ?start.elapsed(),
                    "command timed out"
                );
                Err(ExecError::Timeout {
                    timeout: timeout_duration,
                })
            }
        }
    }

    fn transport_type(&self) -> &'static str {
        "process"
    }
}
