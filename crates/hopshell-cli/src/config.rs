//! Tool settings loaded from `hopshell.toml`

use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::WrapErr;
use hopshell_core::Timeouts;
use serde::{Deserialize, Serialize};

/// Top-level configuration for the hopshell binary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Where execution records are written
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    /// Identity file used when no `--identity` flag is given
    #[serde(default)]
    pub identity_file: Option<PathBuf>,
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Remote directory for uploaded scripts
    #[serde(default = "default_remote_tmp_dir")]
    pub remote_tmp_dir: String,
    /// Invocation bounds
    #[serde(default)]
    pub timeouts: TimeoutConfig,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            identity_file: None,
            log_level: default_log_level(),
            remote_tmp_dir: default_remote_tmp_dir(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

/// `[timeouts]` table, in seconds
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TimeoutConfig {
    #[serde(default = "default_connect_secs")]
    pub connect_secs: u64,
    #[serde(default = "default_preflight_secs")]
    pub preflight_secs: u64,
    #[serde(default = "default_execution_secs")]
    pub execution_secs: u64,
    #[serde(default = "default_probe_secs")]
    pub probe_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: default_connect_secs(),
            preflight_secs: default_preflight_secs(),
            execution_secs: default_execution_secs(),
            probe_secs: default_probe_secs(),
        }
    }
}

impl From<TimeoutConfig> for Timeouts {
    fn from(cfg: TimeoutConfig) -> Self {
        Timeouts {
            connect: Duration::from_secs(cfg.connect_secs),
            preflight: Duration::from_secs(cfg.preflight_secs),
            execution: Duration::from_secs(cfg.execution_secs),
            probe: Duration::from_secs(cfg.probe_secs),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./audit")
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_remote_tmp_dir() -> String {
    "/tmp".to_string()
}

fn default_connect_secs() -> u64 {
    10
}

fn default_preflight_secs() -> u64 {
    10
}

fn default_execution_secs() -> u64 {
    300
}

fn default_probe_secs() -> u64 {
    10
}

impl ToolConfig {
    /// Load configuration from file
    ///
    /// # Errors
    /// Returns error if file cannot be read or parsed
    pub fn load(path: &Path) -> eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        let config: ToolConfig = toml::from_str(&content)
            .wrap_err_with(|| format!("invalid config {}", path.display()))?;
        Ok(config)
    }

    /// Load `explicit` if given, else search the default paths
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_from(explicit: Option<&Path>) -> eyre::Result<Self> {
        match explicit {
            Some(path) => Self::load(path),
            None => Self::load_default(),
        }
    }

    /// Load from default paths or use defaults
    ///
    /// # Errors
    /// Returns error if a config file exists but cannot be read or parsed
    pub fn load_default() -> eyre::Result<Self> {
        if let Ok(path) = std::env::var("HOPSHELL_CONFIG") {
            return Self::load(Path::new(&path));
        }

        let paths = [
            Some(PathBuf::from("hopshell.toml")),
            Some(PathBuf::from("/etc/hopshell/hopshell.toml")),
            dirs::config_dir().map(|p| p.join("hopshell/hopshell.toml")),
        ];

        for path in paths.into_iter().flatten() {
            if path.exists() {
                return Self::load(&path);
            }
        }

        Ok(ToolConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn test_defaults() {
        let config: ToolConfig = toml::from_str("").unwrap();
        assert_eq!(config.output_dir, PathBuf::from("./audit"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.remote_tmp_dir, "/tmp");
        assert!(config.identity_file.is_none());
        assert_eq!(Timeouts::from(config.timeouts), Timeouts::default());
    }

    #[test]
    fn test_partial_timeouts_keep_defaults() {
        let config: ToolConfig = toml::from_str(
            r#"
            output_dir = "/var/lib/hopshell"
            identity_file = "/home/ops/.ssh/id_ed25519"

            [timeouts]
            execution_secs = 900
            "#,
        )
        .unwrap();

        let timeouts = Timeouts::from(config.timeouts);
        assert_eq!(timeouts.execution, Duration::from_secs(900));
        assert_eq!(timeouts.connect, Duration::from_secs(10));
        assert_eq!(config.output_dir, PathBuf::from("/var/lib/hopshell"));
        assert_eq!(
            config.identity_file,
            Some(PathBuf::from("/home/ops/.ssh/id_ed25519"))
        );
    }

    #[test]
    fn test_load_from_explicit_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "log_level = \"debug\"").unwrap();

        let config = ToolConfig::load_from(Some(file.path())).unwrap();
        assert_eq!(config.log_level, "debug");
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "timeouts = 3").unwrap();

        assert!(ToolConfig::load(file.path()).is_err());
    }
}
