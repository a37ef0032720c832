//! Executor configuration

use std::path::PathBuf;
use std::time::Duration;

/// Time bounds for every remote invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeouts {
    /// ssh `ConnectTimeout`
    pub connect: Duration,
    /// Preflight probe; also bounds chmod and cleanup
    pub preflight: Duration,
    /// Command/script execution and script upload
    pub execution: Duration,
    /// First-hop reachability probe in list mode
    pub probe: Duration,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            connect: Duration::from_secs(10),
            preflight: Duration::from_secs(10),
            execution: Duration::from_secs(300),
            probe: Duration::from_secs(10),
        }
    }
}

/// Settings shared by every run of a `ChainExecutor`
#[derive(Debug, Clone)]
pub struct ExecutorConfig {
    /// Invocation time bounds
    pub timeouts: Timeouts,
    /// Identity file passed to ssh/scp
    pub identity: Option<PathBuf>,
    /// Remote directory for uploaded scripts
    pub remote_tmp_dir: String,
    /// Embedded in remote script names; the local process id by default
    pub instance_id: u32,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            timeouts: Timeouts::default(),
            identity: None,
            remote_tmp_dir: "/tmp".to_string(),
            instance_id: std::process::id(),
        }
    }
}

impl ExecutorConfig {
    /// Set identity file
    #[must_use]
    pub fn with_identity(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity = Some(path.into());
        self
    }

    /// Set timeouts
    #[must_use]
    pub fn with_timeouts(mut self, timeouts: Timeouts) -> Self {
        self.timeouts = timeouts;
        self
    }

    /// Set remote temp directory
    #[must_use]
    pub fn with_remote_tmp_dir(mut self, dir: impl Into<String>) -> Self {
        self.remote_tmp_dir = dir.into();
        self
    }

    /// Override the instance id embedded in remote script names
    #[must_use]
    pub fn with_instance_id(mut self, id: u32) -> Self {
        self.instance_id = id;
        self
    }
}
