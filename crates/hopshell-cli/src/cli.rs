//! Command-line surface

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use hopshell_core::ExecutionPayload;
use hopshell_exec::IdentitySource;

#[derive(Debug, Parser)]
#[command(name = "hopshell", version)]
#[command(
    about = "Run commands and scripts on hosts behind SSH jump chains",
    long_about = None
)]
pub struct Cli {
    /// Route table (JSON)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub routes: Option<PathBuf>,

    /// Tool configuration (TOML); searched in default locations if omitted
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Debug logging (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines on stderr
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List configured routes and probe each first hop
    List(ListArgs),
    /// Execute a command or script on a target
    Exec(ExecArgs),
    /// Show which route a target would take, without connecting
    Route(RouteArgs),
}

#[derive(Debug, Args)]
pub struct ListArgs {
    #[command(flatten)]
    pub identity: IdentityArgs,
}

#[derive(Debug, Args)]
pub struct RouteArgs {
    /// Target host (user@host[:port])
    pub target: String,
}

#[derive(Debug, Args)]
pub struct ExecArgs {
    /// Target host (user@host[:port])
    #[arg(short, long)]
    pub target: String,

    #[command(flatten)]
    pub payload: PayloadArgs,

    /// Explicit jump chain (comma-separated, or "direct"); skips route lookup
    #[arg(short, long, value_name = "CHAIN")]
    pub jump: Option<String>,

    #[command(flatten)]
    pub identity: IdentityArgs,

    /// Leave the uploaded script on the target
    #[arg(short = 'u', long = "keep")]
    pub keep: bool,

    /// Do not write an execution record
    #[arg(short, long)]
    pub no_save: bool,

    /// Record directory (overrides config)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,
}

#[derive(Debug, Args)]
#[group(required = true, multiple = false)]
pub struct PayloadArgs {
    /// Command to execute
    #[arg(short, long)]
    pub command: Option<String>,

    /// Local script to upload and execute
    #[arg(short, long, value_name = "FILE")]
    pub script: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct IdentityArgs {
    /// SSH private key file
    #[arg(short = 'k', long = "identity", value_name = "FILE")]
    pub identity: Option<PathBuf>,

    /// Environment variable holding a base64-encoded private key
    #[arg(long, value_name = "VAR", conflicts_with = "identity")]
    pub identity_env: Option<String>,
}

impl IdentityArgs {
    /// Flag-given source, else the configured file
    pub fn source(&self, configured: Option<&PathBuf>) -> Option<IdentitySource> {
        if let Some(var) = &self.identity_env {
            return Some(IdentitySource::Env(var.clone()));
        }
        self.identity
            .as_ref()
            .or(configured)
            .map(|path| IdentitySource::Path(path.clone()))
    }
}

impl ExecArgs {
    /// Payload described by the flags
    pub fn payload(&self) -> ExecutionPayload {
        match (&self.payload.command, &self.payload.script) {
            (Some(command), _) => ExecutionPayload::command(command.clone()),
            (None, Some(script)) => ExecutionPayload::script(script, self.keep),
            // clap's group guarantees one of the two
            (None, None) => ExecutionPayload::command(String::new()),
        }
    }
}
