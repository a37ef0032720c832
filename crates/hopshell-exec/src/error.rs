//! Error types for hopshell-exec

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur while building or running a transport invocation
#[derive(Error, Debug, Clone)]
pub enum ExecError {
    /// Command timed out
    #[error("command timed out after {timeout:?}")]
    Timeout {
        /// Timeout duration that was exceeded
        timeout: Duration,
    },

    /// Process spawn error
    #[error("failed to spawn process: {0}")]
    SpawnError(String),

    /// I/O error during execution
    #[error("I/O error: {0}")]
    IoError(String),

    /// Host specification could not be parsed
    #[error("invalid host spec '{spec}': {reason}")]
    InvalidHostSpec {
        /// The offending input
        spec: String,
        /// Why it was rejected
        reason: String,
    },

    /// Relay chain could not be parsed
    #[error("invalid relay chain: {0}")]
    InvalidChain(String),
}
