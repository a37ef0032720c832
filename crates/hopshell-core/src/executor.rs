//! `ChainExecutor`: runs one payload on one target through one chain
//!
//! Phases: preflight, then either dispatch (command) or upload, dispatch and
//! cleanup (script). Preflight and upload failures end the run; a non-zero
//! remote exit is an ordinary outcome recorded in the result.

use std::path::Path;
use std::sync::Arc;

use hopshell_exec::shell::quote_arg;
use hopshell_exec::{Chain, CommandResult, HostSpec, SshCommandBuilder, Transport};
use hopshell_route::TargetHost;
use tracing::{debug, error, info, instrument, warn};

use crate::config::ExecutorConfig;
use crate::error::CoreError;
use crate::payload::ExecutionPayload;
use crate::record::{ExecutionRecord, ExecutionRecordBuilder, Operation};
use crate::report::{NoopReporter, Reporter, RunEvent};
use crate::state::RunPhase;

/// Remote command used as the preflight probe
const PREFLIGHT_COMMAND: &str = "echo ok";

/// Remote temp path for an uploaded script.
///
/// Embeds the script's base name and `instance_id` (the local pid) so that
/// concurrent runs against the same host never share a file.
#[must_use]
pub fn remote_script_path(remote_tmp_dir: &str, local_path: &Path, instance_id: u32) -> String {
    let name = local_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string());
    format!("{}/{name}.{instance_id}", remote_tmp_dir.trim_end_matches('/'))
}

/// Drives a run through its phases over a [`Transport`]
pub struct ChainExecutor {
    transport: Arc<dyn Transport>,
    config: ExecutorConfig,
    reporter: Arc<dyn Reporter>,
}

impl ChainExecutor {
    /// Create an executor
    pub fn new(transport: Arc<dyn Transport>, config: ExecutorConfig) -> Self {
        Self {
            transport,
            config,
            reporter: Arc::new(NoopReporter),
        }
    }

    /// Send progress events to `reporter`
    #[must_use]
    pub fn with_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.reporter = reporter;
        self
    }

    /// Executor settings
    #[must_use]
    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Run to completion and return the finalized record
    pub async fn execute(
        &self,
        operation: Operation,
        chain: &Chain,
        target: &TargetHost,
        payload: &ExecutionPayload,
    ) -> ExecutionRecord {
        let mut record = ExecutionRecordBuilder::new(operation, target, chain, payload);
        self.run(chain, target, payload, &mut record).await;
        record.finish()
    }

    /// Run, accumulating into `record`.
    ///
    /// If this future is dropped midway (operator interrupt), `record` still
    /// holds everything gathered so far and its current phase.
    #[instrument(skip_all, fields(target = %target.raw(), chain = %chain))]
    pub async fn run(
        &self,
        chain: &Chain,
        target: &TargetHost,
        payload: &ExecutionPayload,
        record: &mut ExecutionRecordBuilder,
    ) {
        let ssh = SshCommandBuilder::new(chain.clone())
            .with_identity_opt(self.config.identity.clone())
            .with_connect_timeout(self.config.timeouts.connect);

        info!(target_ip = %target.resolved_ip(), "starting run");

        if let Err(e) = self.drive(&ssh, target.raw(), payload, record).await {
            error!(phase = %record.phase(), error = %e, "run failed");
            record.push_error(&e);
            self.reporter.on_event(RunEvent::Error(&e.to_string()));
        }
    }

    fn advance(
        &self,
        record: &mut ExecutionRecordBuilder,
        next: RunPhase,
    ) -> Result<(), CoreError> {
        let from = record.phase();
        record.advance(next)?;
        debug!(from = %from, to = %next, "phase transition");
        self.reporter.on_event(RunEvent::Phase(next));
        Ok(())
    }

    async fn drive(
        &self,
        ssh: &SshCommandBuilder,
        target: &HostSpec,
        payload: &ExecutionPayload,
        record: &mut ExecutionRecordBuilder,
    ) -> Result<(), CoreError> {
        self.advance(record, RunPhase::Preflight)?;
        self.preflight(ssh, target).await?;
        self.reporter.on_event(RunEvent::Connected);

        match payload {
            ExecutionPayload::Command(text) => {
                self.advance(record, RunPhase::Dispatch)?;
                let result = self.dispatch(ssh, target, text).await?;
                self.record_outcome(record, &result);
                Ok(())
            }
            ExecutionPayload::Script {
                local_path,
                keep_after_run,
            } => {
                self.run_script(ssh, target, local_path, *keep_after_run, record)
                    .await
            }
        }
    }

    async fn preflight(&self, ssh: &SshCommandBuilder, target: &HostSpec) -> Result<(), CoreError> {
        let cmd = ssh.ssh(target, PREFLIGHT_COMMAND);
        let timeout = self.config.timeouts.preflight;

        match self.transport.run_with_timeout(&cmd, timeout).await {
            Ok(result) if result.success() => {
                debug!("preflight passed");
                Ok(())
            }
            Ok(result) => Err(CoreError::Connectivity(failure_detail(&result))),
            Err(e) => Err(CoreError::Connectivity(e.to_string())),
        }
    }

    async fn dispatch(
        &self,
        ssh: &SshCommandBuilder,
        target: &HostSpec,
        remote_command: &str,
    ) -> Result<CommandResult, CoreError> {
        let cmd = ssh.ssh(target, remote_command);
        let result = self
            .transport
            .run_with_timeout(&cmd, self.config.timeouts.execution)
            .await
            .map_err(|e| CoreError::from_exec(RunPhase::Dispatch, e))?;

        if result.success() {
            info!(duration = ?result.duration, "remote command succeeded");
        } else {
            warn!(status = result.status, "remote command exited non-zero");
        }
        Ok(result)
    }

    fn record_outcome(&self, record: &mut ExecutionRecordBuilder, result: &CommandResult) {
        record.set_outcome(result);
        self.reporter.on_event(RunEvent::Output(result));
    }

    async fn run_script(
        &self,
        ssh: &SshCommandBuilder,
        target: &HostSpec,
        local_path: &Path,
        keep_after_run: bool,
        record: &mut ExecutionRecordBuilder,
    ) -> Result<(), CoreError> {
        self.advance(record, RunPhase::Upload)?;
        let remote_path = remote_script_path(
            &self.config.remote_tmp_dir,
            local_path,
            self.config.instance_id,
        );
        self.upload(ssh, target, local_path, &remote_path).await?;
        record.set_remote_script_path(&remote_path);
        self.reporter.on_event(RunEvent::Uploaded {
            remote_path: &remote_path,
        });

        let quoted = quote_arg(&remote_path);
        self.housekeeping(ssh, target, &format!("chmod +x {quoted}"))
            .await
            .unwrap_or_else(|detail| warn!(path = %remote_path, detail = %detail, "chmod failed"));

        self.advance(record, RunPhase::Dispatch)?;
        let outcome = self.dispatch(ssh, target, &quoted).await;
        if let Ok(result) = &outcome {
            self.record_outcome(record, result);
        }

        // cleanup runs whatever the script's outcome was
        self.advance(record, RunPhase::Cleanup)?;
        if keep_after_run {
            info!(path = %remote_path, "keeping script on target");
            self.reporter.on_event(RunEvent::ScriptKept {
                remote_path: &remote_path,
            });
        } else {
            if let Err(detail) = self
                .housekeeping(ssh, target, &format!("rm -f {quoted}"))
                .await
            {
                debug!(path = %remote_path, detail = %detail, "cleanup failed, ignoring");
            }
            self.reporter.on_event(RunEvent::CleanedUp);
        }

        outcome.map(|_| ())
    }

    #[instrument(skip(self, ssh, target), level = "debug")]
    async fn upload(
        &self,
        ssh: &SshCommandBuilder,
        target: &HostSpec,
        local_path: &Path,
        remote_path: &str,
    ) -> Result<(), CoreError> {
        let cmd = ssh.scp(local_path, target, remote_path);

        match self
            .transport
            .run_with_timeout(&cmd, self.config.timeouts.execution)
            .await
        {
            Ok(result) if result.success() => {
                info!(remote_path = %remote_path, "script uploaded");
                Ok(())
            }
            Ok(result) => Err(CoreError::Upload(failure_detail(&result))),
            Err(e) => Err(CoreError::Upload(e.to_string())),
        }
    }

    /// Short best-effort command (chmod, cleanup); returns a failure detail
    async fn housekeeping(
        &self,
        ssh: &SshCommandBuilder,
        target: &HostSpec,
        remote_command: &str,
    ) -> Result<(), String> {
        let cmd = ssh.ssh(target, remote_command);
        match self
            .transport
            .run_with_timeout(&cmd, self.config.timeouts.preflight)
            .await
        {
            Ok(result) if result.success() => Ok(()),
            Ok(result) => Err(failure_detail(&result)),
            Err(e) => Err(e.to_string()),
        }
    }
}

/// Last stderr line, or the exit status when stderr is empty
fn failure_detail(result: &CommandResult) -> String {
    result
        .stderr
        .lines()
        .rev()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .map_or_else(|| format!("exit status {}", result.status), str::to_string)
}

impl std::fmt::Debug for ChainExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainExecutor")
            .field("transport", &self.transport.transport_type())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
