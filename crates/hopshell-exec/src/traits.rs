//! Transport trait

use std::time::Duration;

use async_trait::async_trait;

use crate::command::TransportCommand;
use crate::error::ExecError;
use crate::result::CommandResult;

/// Runs assembled `ssh`/`scp` invocations.
///
/// A non-zero exit status is a successful `Ok` return; `Err` is reserved for
/// failures to run the invocation at all, including timeouts.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn run(&self, cmd: &TransportCommand) -> Result<CommandResult, ExecError>;
    async fn run_with_timeout(
        &self,
        cmd: &TransportCommand,
        timeout: Duration,
    ) -> Result<CommandResult, ExecError>;
    fn transport_type(&self) -> &'static str;
}
