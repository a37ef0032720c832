//! `user@host[:port]` host specifications

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ExecError;

/// One SSH hop: `user@host`, `user@host:port`, or a bare host / ssh alias.
///
/// IPv6 literals may be given bare (`user@fe80::1`, no port) or bracketed
/// (`user@[fe80::1]:2222`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HostSpec {
    raw: String,
    user: Option<String>,
    host: String,
    port: Option<u16>,
}

impl HostSpec {
    /// Parse a host specification
    ///
    /// # Errors
    /// Returns `ExecError::InvalidHostSpec` for empty hosts, empty users or
    /// non-numeric ports.
    pub fn parse(spec: &str) -> Result<Self, ExecError> {
        let invalid = |reason: &str| ExecError::InvalidHostSpec {
            spec: spec.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = spec.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty"));
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(invalid("contains whitespace"));
        }

        let (user, addr) = match trimmed.rsplit_once('@') {
            Some(("", _)) => return Err(invalid("empty user")),
            Some((user, addr)) => (Some(user.to_string()), addr),
            None => (None, trimmed),
        };

        let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| invalid("unterminated '['"))?;
            match tail {
                "" => (host, None),
                _ => {
                    let port = tail.strip_prefix(':').ok_or_else(|| invalid("junk after ']'"))?;
                    (host, Some(port))
                }
            }
        } else if addr.matches(':').count() == 1 {
            let (host, port) = addr.split_once(':').unwrap_or((addr, ""));
            (host, Some(port))
        } else {
            // zero colons, or a bare IPv6 literal
            (addr, None)
        };

        if host.is_empty() {
            return Err(invalid("empty host"));
        }

        let port = port
            .map(|p| p.parse::<u16>().map_err(|_| invalid("port is not a number")))
            .transpose()?;

        Ok(Self {
            raw: trimmed.to_string(),
            user,
            host: host.to_string(),
            port,
        })
    }

    /// The spec exactly as given
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Login user, if present
    #[must_use]
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    /// Host name or address with user and port stripped
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Explicit port, if present
    #[must_use]
    pub fn port(&self) -> Option<u16> {
        self.port
    }

    /// `user@host` form accepted as an ssh destination
    #[must_use]
    pub fn destination(&self) -> String {
        match &self.user {
            Some(user) => format!("{user}@{}", self.host),
            None => self.host.clone(),
        }
    }

    /// `user@host:path` form accepted by scp; IPv6 hosts are bracketed
    #[must_use]
    pub fn scp_destination(&self, remote_path: &str) -> String {
        let host = if self.host.contains(':') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        };
        match &self.user {
            Some(user) => format!("{user}@{host}:{remote_path}"),
            None => format!("{host}:{remote_path}"),
        }
    }
}

impl fmt::Display for HostSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for HostSpec {
    type Err = ExecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for HostSpec {
    type Error = ExecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<HostSpec> for String {
    fn from(spec: HostSpec) -> Self {
        spec.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_user_host() {
        let spec = HostSpec::parse("admin@10.1.2.3").unwrap();
        assert_eq!(spec.user(), Some("admin"));
        assert_eq!(spec.host(), "10.1.2.3");
        assert_eq!(spec.port(), None);
        assert_eq!(spec.destination(), "admin@10.1.2.3");
    }

    #[test]
    fn test_parse_with_port() {
        let spec = HostSpec::parse("ops@db01.internal:2222").unwrap();
        assert_eq!(spec.host(), "db01.internal");
        assert_eq!(spec.port(), Some(2222));
        assert_eq!(spec.as_str(), "ops@db01.internal:2222");
    }

    #[test]
    fn test_parse_alias_without_user() {
        let spec = HostSpec::parse("jumpA").unwrap();
        assert_eq!(spec.user(), None);
        assert_eq!(spec.destination(), "jumpA");
    }

    #[test]
    fn test_parse_ipv6() {
        let bare = HostSpec::parse("root@fe80::1").unwrap();
        assert_eq!(bare.host(), "fe80::1");
        assert_eq!(bare.port(), None);

        let bracketed = HostSpec::parse("root@[fe80::1]:2200").unwrap();
        assert_eq!(bracketed.host(), "fe80::1");
        assert_eq!(bracketed.port(), Some(2200));
        assert_eq!(bracketed.scp_destination("/tmp/x"), "root@[fe80::1]:/tmp/x");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(HostSpec::parse("").is_err());
        assert!(HostSpec::parse("@host").is_err());
        assert!(HostSpec::parse("user@").is_err());
        assert!(HostSpec::parse("user@host:ssh").is_err());
        assert!(HostSpec::parse("user@host name").is_err());
    }

    #[test]
    fn test_parse_rejects_non_numeric_port() {
        let err = HostSpec::parse("user@host:abc").unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid host spec 'user@host:abc': port is not a number"
        );
    }
}
