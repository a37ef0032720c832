//! hopshell-exec: Remote execution transport
//!
//! Builds OpenSSH `ssh`/`scp` invocations for multi-hop relay chains and runs
//! them through a pluggable [`Transport`].

pub mod chain;
pub mod command;
pub mod error;
pub mod host;
pub mod keys;
pub mod process;
pub mod result;
pub mod shell;
pub mod traits;

pub use chain::Chain;
pub use command::{SshCommandBuilder, TransportCommand};
pub use error::ExecError;
pub use host::HostSpec;
pub use keys::{IdentitySource, KeyError, ResolvedIdentity};
pub use process::ProcessTransport;
pub use result::CommandResult;
pub use traits::Transport;
