//! SSH identity resolution

use std::env;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Where the `-i` identity file comes from
#[derive(Debug, Clone)]
pub enum IdentitySource {
    /// Explicit path to key file
    Path(PathBuf),
    /// Base64-encoded key from environment
    Env(String),
}

impl IdentitySource {
    /// Resolve identity source to a key file on disk
    ///
    /// For `Env`, decodes base64 and writes to a 0600 temp file
    ///
    /// # Errors
    /// Returns `KeyError` if the file is missing or too permissive, or the
    /// env var is unset or not valid base64
    pub fn resolve(&self) -> Result<ResolvedIdentity, KeyError> {
        match self {
            IdentitySource::Path(path) => {
                if !path.exists() {
                    return Err(KeyError::NotFound(path.display().to_string()));
                }
                validate_key_permissions(path)?;
                Ok(ResolvedIdentity::Path(path.clone()))
            }
            IdentitySource::Env(var_name) => {
                let base64_key =
                    env::var(var_name).map_err(|_| KeyError::EnvNotSet(var_name.clone()))?;
                let key_data = base64_decode(&base64_key).map_err(|_| KeyError::InvalidBase64)?;

                let temp_path = write_temp_key(&key_data)?;
                Ok(ResolvedIdentity::Temp(temp_path))
            }
        }
    }
}

/// Resolved identity file
#[derive(Debug)]
pub enum ResolvedIdentity {
    /// Caller-owned key file
    Path(PathBuf),
    /// Temporary file (deleted on drop)
    Temp(PathBuf),
}

impl ResolvedIdentity {
    /// Path handed to ssh/scp
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            ResolvedIdentity::Path(p) | ResolvedIdentity::Temp(p) => p,
        }
    }
}

/// Key resolution errors
#[derive(Debug, thiserror::Error)]
pub enum KeyError {
    #[error("environment variable {0} not set")]
    EnvNotSet(String),

    #[error("invalid base64 encoding")]
    InvalidBase64,

    #[error("key file permissions too open: {0} (should be 600)")]
    BadPermissions(String),

    #[error("key file not found: {0}")]
    NotFound(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn base64_decode(input: &str) -> Result<Vec<u8>, base64::DecodeError> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD.decode(input.trim())
}

fn validate_key_permissions(path: &Path) -> Result<(), KeyError> {
    use std::os::unix::fs::PermissionsExt;

    let mode = std::fs::metadata(path)?.permissions().mode();

    // group/other bits must be clear, ssh refuses such keys anyway
    if mode & 0o77 != 0 {
        return Err(KeyError::BadPermissions(path.display().to_string()));
    }

    Ok(())
}

fn write_temp_key(key_data: &[u8]) -> Result<PathBuf, KeyError> {
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;

    // random name, O_EXCL, 0600 from the start: never reuses an existing file
    let mut file = tempfile::Builder::new()
        .prefix(&format!("hopshell_ssh_key_{}_", std::process::id()))
        .permissions(std::fs::Permissions::from_mode(0o600))
        .tempfile()?;
    file.write_all(key_data)?;
    file.flush()?;

    let (_file, temp_path) = file.keep().map_err(|e| KeyError::Io(e.error))?;

    debug!(path = %temp_path.display(), "wrote temporary SSH key");

    Ok(temp_path)
}

impl Drop for ResolvedIdentity {
    fn drop(&mut self) {
        if let ResolvedIdentity::Temp(path) = self {
            if let Err(e) = std::fs::remove_file(path.as_path()) {
                warn!(path = %path.display(), error = %e, "failed to remove temp key");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::os::unix::fs::PermissionsExt;

    use super::*;

    #[test]
    fn test_missing_key_file() {
        let source = IdentitySource::Path(PathBuf::from("/nonexistent/id_ed25519"));
        assert!(matches!(source.resolve(), Err(KeyError::NotFound(_))));
    }

    #[test]
    fn test_key_permissions() {
        let dir = tempfile::tempdir().unwrap();
        let key = dir.path().join("id_test");
        std::fs::write(&key, b"key").unwrap();

        std::fs::set_permissions(&key, std::fs::Permissions::from_mode(0o644)).unwrap();
        let open = IdentitySource::Path(key.clone()).resolve();
        assert!(matches!(open, Err(KeyError::BadPermissions(_))));

        std::fs::set_permissions(&key, std::fs::Permissions::from_mode(0o600)).unwrap();
        let resolved = IdentitySource::Path(key.clone()).resolve().unwrap();
        assert_eq!(resolved.path(), key.as_path());
    }

    #[test]
    fn test_env_key_never_reuses_existing_file() {
        use std::io::Write;

        let var = "HOPSHELL_TEST_KEY_B64_EXCLUSIVE";
        // base64 of "secret-key"
        unsafe { env::set_var(var, "c2VjcmV0LWtleQ==") };

        // a leftover at the old predictable path, world readable
        let planted = env::temp_dir().join(format!("hopshell_ssh_key_{}", std::process::id()));
        let mut stale = std::fs::File::create(&planted).unwrap();
        stale.write_all(b"planted").unwrap();
        std::fs::set_permissions(&planted, std::fs::Permissions::from_mode(0o644)).unwrap();

        let resolved = IdentitySource::Env(var.to_string()).resolve().unwrap();
        let path = resolved.path().to_path_buf();

        assert_ne!(path, planted);
        let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
        assert_eq!(mode, 0o600);
        assert_eq!(std::fs::read(&path).unwrap(), b"secret-key");
        assert_eq!(std::fs::read(&planted).unwrap(), b"planted");

        drop(resolved);
        assert!(!path.exists());

        std::fs::remove_file(&planted).unwrap();
        unsafe { env::remove_var(var) };
    }

    #[test]
    fn test_env_var_not_set() {
        let source = IdentitySource::Env("HOPSHELL_TEST_KEY_DEFINITELY_UNSET".to_string());
        assert!(matches!(source.resolve(), Err(KeyError::EnvNotSet(_))));
    }
}
