//! Result types for command execution

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Result of a transport invocation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success, -1 when killed by a signal)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// stdout followed by stderr, in that order
    #[must_use]
    pub fn combined_output(&self) -> String {
        let mut out = String::with_capacity(self.stdout.len() + self.stderr.len());
        out.push_str(&self.stdout);
        out.push_str(&self.stderr);
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(status: i32, stdout: &str, stderr: &str) -> CommandResult {
        CommandResult {
            status,
            stdout: stdout.to_string(),
            stderr: stderr.to_string(),
            duration: Duration::from_millis(5),
        }
    }

    #[test]
    fn test_combined_output_orders_streams() {
        let r = result(0, "out\n", "err\n");
        assert_eq!(r.combined_output(), "out\nerr\n");
    }

    #[test]
    fn test_success_only_on_zero() {
        assert!(result(0, "", "").success());
        assert!(!result(2, "", "").success());
        assert!(!result(-1, "", "").success());
    }
}
