//! `ssh` / `scp` argument assembly

use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::chain::Chain;
use crate::host::HostSpec;
use crate::shell::quote_arg;

/// Host key policy forced on every invocation
pub const HOST_KEY_POLICY: &str = "StrictHostKeyChecking=accept-new";

/// Default `ConnectTimeout`
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// A fully assembled external command: program plus argv
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportCommand {
    /// Program to spawn (`ssh` or `scp`)
    pub program: String,
    /// Arguments, not shell-joined
    pub args: Vec<String>,
}

impl TransportCommand {
    /// Value following `-J`, or embedded in `-o ProxyJump=`
    #[must_use]
    pub fn relay_directive(&self) -> Option<&str> {
        let mut iter = self.args.iter();
        while let Some(arg) = iter.next() {
            if arg == "-J" {
                return iter.next().map(String::as_str);
            }
            if let Some(value) = arg.strip_prefix("ProxyJump=") {
                return Some(value);
            }
        }
        None
    }

    /// Last argument; for ssh this is the remote command
    #[must_use]
    pub fn remote_command(&self) -> Option<&str> {
        self.args.last().map(String::as_str)
    }
}

impl fmt::Display for TransportCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {}", quote_arg(arg))?;
        }
        Ok(())
    }
}

/// Builds `ssh` and `scp` invocations that traverse a relay chain
#[derive(Debug, Clone)]
pub struct SshCommandBuilder {
    chain: Chain,
    identity: Option<PathBuf>,
    connect_timeout: Duration,
}

impl SshCommandBuilder {
    /// Create builder for a chain
    #[must_use]
    pub fn new(chain: Chain) -> Self {
        Self {
            chain,
            identity: None,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
        }
    }

    /// Set identity file passed with `-i`
    #[must_use]
    pub fn with_identity(mut self, path: impl Into<PathBuf>) -> Self {
        self.identity = Some(path.into());
        self
    }

    /// Set optional identity file
    #[must_use]
    pub fn with_identity_opt(mut self, path: Option<PathBuf>) -> Self {
        self.identity = path;
        self
    }

    /// Set `ConnectTimeout`
    #[must_use]
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Chain this builder routes through
    #[must_use]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    fn common_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(identity) = &self.identity {
            args.push("-i".to_string());
            args.push(identity.display().to_string());
        }

        args.extend([
            "-o".to_string(),
            HOST_KEY_POLICY.to_string(),
            "-o".to_string(),
            format!("ConnectTimeout={}", self.connect_timeout.as_secs().max(1)),
        ]);

        args
    }

    /// `ssh ... target remote_command`
    #[must_use]
    pub fn ssh(&self, target: &HostSpec, remote_command: &str) -> TransportCommand {
        let mut args = self.common_args();

        if let Some(directive) = self.chain.relay_directive() {
            args.push("-J".to_string());
            args.push(directive);
        }

        if let Some(port) = target.port() {
            args.push("-p".to_string());
            args.push(port.to_string());
        }

        args.push(target.destination());
        args.push(remote_command.to_string());

        TransportCommand {
            program: "ssh".to_string(),
            args,
        }
    }

    /// `scp ... local target:remote_path`
    #[must_use]
    pub fn scp(&self, local: &Path, target: &HostSpec, remote_path: &str) -> TransportCommand {
        let mut args = self.common_args();

        if let Some(directive) = self.chain.relay_directive() {
            args.push("-o".to_string());
            args.push(format!("ProxyJump={directive}"));
        }

        if let Some(port) = target.port() {
            args.push("-P".to_string());
            args.push(port.to_string());
        }

        args.push(local.display().to_string());
        args.push(target.scp_destination(remote_path));

        TransportCommand {
            program: "scp".to_string(),
            args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> HostSpec {
        HostSpec::parse("admin@10.1.2.3").unwrap()
    }

    #[test]
    fn test_direct_has_no_relay_directive() {
        let builder = SshCommandBuilder::new(Chain::Direct);
        let cmd = builder.ssh(&target(), "uptime");

        assert_eq!(cmd.program, "ssh");
        assert!(!cmd.args.iter().any(|a| a == "-J"));
        assert_eq!(cmd.relay_directive(), None);
        assert_eq!(
            cmd.args,
            [
                "-o",
                "StrictHostKeyChecking=accept-new",
                "-o",
                "ConnectTimeout=10",
                "admin@10.1.2.3",
                "uptime"
            ]
        );
    }

    #[test]
    fn test_relay_directive_is_joined_chain() {
        let chain = Chain::parse("ops@bastion1,ops@bastion2:2222").unwrap();
        let builder = SshCommandBuilder::new(chain);
        let relay = Some("ops@bastion1,ops@bastion2:2222");

        let ssh = builder.ssh(&target(), "uptime");
        assert_eq!(ssh.relay_directive(), relay);

        let scp = builder.scp(Path::new("./check.sh"), &target(), "/tmp/check.sh.1");
        assert_eq!(scp.program, "scp");
        assert_eq!(scp.relay_directive(), relay);
        assert_eq!(scp.args.last().unwrap(), "admin@10.1.2.3:/tmp/check.sh.1");
    }

    #[test]
    fn test_identity_and_port() {
        let builder = SshCommandBuilder::new(Chain::Direct).with_identity("/keys/id_ed25519");
        let target = HostSpec::parse("root@db01:2200").unwrap();

        let ssh = builder.ssh(&target, "true");
        assert_eq!(&ssh.args[..2], ["-i", "/keys/id_ed25519"]);
        assert!(ssh.args.windows(2).any(|w| w == ["-p", "2200"]));
        assert_eq!(ssh.args[ssh.args.len() - 2], "root@db01");

        let scp = builder.scp(Path::new("a.sh"), &target, "/tmp/a.sh.7");
        assert!(scp.args.windows(2).any(|w| w == ["-P", "2200"]));
    }

    #[test]
    fn test_connect_timeout_override() {
        let builder =
            SshCommandBuilder::new(Chain::Direct).with_connect_timeout(Duration::from_secs(5));
        let cmd = builder.ssh(&target(), "echo ok");
        assert!(cmd.args.contains(&"ConnectTimeout=5".to_string()));
    }

    #[test]
    fn test_display_quotes_remote_command() {
        let cmd = SshCommandBuilder::new(Chain::Direct).ssh(&target(), "echo 'ok'");
        assert!(cmd.to_string().ends_with(r"admin@10.1.2.3 'echo '\''ok'\'''"));
    }
}
