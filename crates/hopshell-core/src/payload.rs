//! What to run on the target

use std::path::{Path, PathBuf};

use crate::error::CoreError;

/// Exactly one payload per run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionPayload {
    /// Remote command line, passed to the remote shell as-is
    Command(String),
    /// Local script to upload, run, and (unless kept) delete
    Script {
        /// Script on the local machine
        local_path: PathBuf,
        /// Leave the uploaded copy on the target
        keep_after_run: bool,
    },
}

impl ExecutionPayload {
    /// Command payload
    pub fn command(text: impl Into<String>) -> Self {
        ExecutionPayload::Command(text.into())
    }

    /// Script payload
    pub fn script(local_path: impl Into<PathBuf>, keep_after_run: bool) -> Self {
        ExecutionPayload::Script {
            local_path: local_path.into(),
            keep_after_run,
        }
    }

    /// Check local preconditions before touching the network
    ///
    /// # Errors
    /// Returns `CoreError::ScriptNotFound` when the script is not a file
    pub fn validate(&self) -> Result<(), CoreError> {
        match self {
            ExecutionPayload::Command(_) => Ok(()),
            ExecutionPayload::Script { local_path, .. } if local_path.is_file() => Ok(()),
            ExecutionPayload::Script { local_path, .. } => {
                Err(CoreError::ScriptNotFound(local_path.display().to_string()))
            }
        }
    }

    /// Base name used for remote temp files and record names
    #[must_use]
    pub fn script_name(&self) -> Option<String> {
        match self {
            ExecutionPayload::Command(_) => None,
            ExecutionPayload::Script { local_path, .. } => Some(file_name(local_path)),
        }
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "script".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_name() {
        let payload = ExecutionPayload::script("./scripts/disk check.sh", false);
        assert_eq!(payload.script_name().as_deref(), Some("disk check.sh"));
        assert_eq!(ExecutionPayload::command("uptime").script_name(), None);
    }

    #[test]
    fn test_validate_missing_script() {
        let payload = ExecutionPayload::script("/nonexistent/audit.sh", false);
        let result = payload.validate();
        assert!(matches!(result, Err(CoreError::ScriptNotFound(_))));
        assert!(ExecutionPayload::command("uptime").validate().is_ok());
    }
}
