//! Persists execution records as JSON
//!
//! Layout: `<output_dir>/<target_ip>/<name>-<YYYYmmdd-HHMMSS>.json`, where
//! `name` is the command's leading token (`/` replaced by `_`) or
//! `script-<stem>` for script runs.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::error::CoreError;
use crate::record::{ExecutionRecord, PayloadRecord};

/// Timestamp format embedded in record file names
pub const FILE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Writes one file per run, never overwriting an earlier one
#[derive(Debug, Clone)]
pub struct ExecutionRecorder {
    output_dir: PathBuf,
}

impl ExecutionRecorder {
    /// Recorder rooted at `output_dir`
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
        }
    }

    /// Root directory
    #[must_use]
    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Directory holding every record for `target_ip`
    #[must_use]
    pub fn target_dir(&self, target_ip: &str) -> PathBuf {
        self.output_dir.join(sanitize(target_ip))
    }

    /// Write `record` and return its path.
    ///
    /// A failure here does not change the record's outcome.
    ///
    /// # Errors
    /// Returns `CoreError::Persist` if the directory or file cannot be written
    #[instrument(skip_all, fields(target_ip = %record.target_ip()))]
    pub fn persist(&self, record: &ExecutionRecord) -> Result<PathBuf, CoreError> {
        let dir = self.target_dir(record.target_ip());
        std::fs::create_dir_all(&dir)
            .map_err(|e| CoreError::Persist(format!("{}: {e}", dir.display())))?;

        let json = serde_json::to_string_pretty(record)
            .map_err(|e| CoreError::Persist(e.to_string()))?;

        let stem = format!(
            "{}-{}",
            record_name(record.payload()),
            record.timestamp().format(FILE_TIMESTAMP_FORMAT)
        );

        // same name and second: add a counter rather than overwrite
        for attempt in 0u32.. {
            let file_name = match attempt {
                0 => format!("{stem}.json"),
                n => format!("{stem}-{n}.json"),
            };
            let path = dir.join(file_name);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    file.write_all(json.as_bytes())
                        .and_then(|()| file.write_all(b"\n"))
                        .map_err(|e| CoreError::Persist(format!("{}: {e}", path.display())))?;
                    info!(path = %path.display(), "record written");
                    return Ok(path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    debug!(path = %path.display(), "record name taken");
                }
                Err(e) => {
                    return Err(CoreError::Persist(format!("{}: {e}", path.display())));
                }
            }
        }

        Err(CoreError::Persist("no free record name".to_string()))
    }
}

/// Distinguishing part of the file name
#[must_use]
pub fn record_name(payload: &PayloadRecord) -> String {
    match payload {
        PayloadRecord::Command { command } => {
            let lead = command.split_whitespace().next().unwrap_or("command");
            sanitize(lead)
        }
        PayloadRecord::Script { script, .. } => {
            let stem = Path::new(script)
                .file_stem()
                .map_or_else(|| "script".to_string(), |s| s.to_string_lossy().into_owned());
            format!("script-{}", sanitize(&stem))
        }
    }
}

fn sanitize(component: &str) -> String {
    let cleaned = component.replace(['/', '\\'], "_");
    match cleaned.as_str() {
        "" | "." | ".." => "_".to_string(),
        _ => cleaned,
    }
}
