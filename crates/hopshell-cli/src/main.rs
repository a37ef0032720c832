//! hopshell CLI
//!
//! Picks an SSH jump chain for a target from a route table, runs a command or
//! uploaded script through it, and writes a JSON record of the run.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::error::ErrorKind;
use color_eyre::Result;
use eyre::{WrapErr, eyre};
use hopshell_core::{
    ChainExecutor, CoreError, ExecutionRecord, ExecutionRecordBuilder, ExecutionRecorder,
    ExecutorConfig, Operation, RouteProber, Timeouts,
};
use hopshell_exec::{Chain, HostSpec, ProcessTransport, ResolvedIdentity};
use hopshell_route::{AddressResolver, RouteResolver, RouteTable};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

mod cli;
mod config;
mod console;

use cli::{Cli, Command, ExecArgs, IdentityArgs, ListArgs, RouteArgs};
use config::ToolConfig;
use console::ConsoleReporter;

#[tokio::main]
async fn main() -> Result<ExitCode> {
    color_eyre::install()?;

    let cli = match parse_cli(std::env::args_os()) {
        Ok(cli) => cli,
        Err(code) => return Ok(code),
    };

    let config = ToolConfig::load_from(cli.config.as_deref())?;
    init_tracing(&cli, &config);

    match &cli.command {
        Command::List(args) => list(&cli, &config, args).await,
        Command::Exec(args) => exec(&cli, &config, args).await,
        Command::Route(args) => explain(&cli, args).await,
    }
}

/// Parse arguments; help and version exit 0, usage errors exit 1
fn parse_cli<I, T>(args: I) -> std::result::Result<Cli, ExitCode>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    Cli::try_parse_from(args).map_err(|e| {
        // nowhere left to report a failed write of the usage text
        let _ = e.print();
        match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
            _ => ExitCode::FAILURE,
        }
    })
}

/// 0 only for a successful run
fn exit_code(record: &ExecutionRecord) -> ExitCode {
    if record.success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

fn init_tracing(cli: &Cli, config: &ToolConfig) {
    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if cli.log_json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn routes_path(cli: &Cli) -> Result<&Path> {
    cli.routes
        .as_deref()
        .ok_or_else(|| eyre!("--routes <FILE> is required"))
}

fn load_routes(path: &Path) -> Result<RouteTable> {
    Ok(RouteTable::load(path)?)
}

fn resolve_identity(
    args: &IdentityArgs,
    config: &ToolConfig,
) -> Result<Option<ResolvedIdentity>> {
    args.source(config.identity_file.as_ref())
        .map(|source| source.resolve().wrap_err("unusable SSH identity"))
        .transpose()
}

async fn list(cli: &Cli, config: &ToolConfig, args: &ListArgs) -> Result<ExitCode> {
    let path = routes_path(cli)?;
    let table = load_routes(path)?;
    let identity = resolve_identity(&args.identity, config)?;
    let timeouts = Timeouts::from(config.timeouts);

    let prober = RouteProber::new(Arc::new(ProcessTransport::new()), timeouts.probe)
        .with_identity(identity.as_ref().map(|id| id.path().to_path_buf()));

    console::list_header(path);
    for (index, route) in table.routes().iter().enumerate() {
        console::list_route(index + 1, route);
        if !route.via.is_direct() {
            console::probe_started();
            console::probe_finished(&prober.probe(route).await);
        }
        println!();
    }
    console::list_footer(table.len());

    Ok(ExitCode::SUCCESS)
}

async fn explain(cli: &Cli, args: &RouteArgs) -> Result<ExitCode> {
    let table = load_routes(routes_path(cli)?)?;
    let spec = HostSpec::parse(&args.target)?;
    let target = AddressResolver::new().resolve(&spec).await;
    let matched = RouteResolver::new().resolve_match(target.resolved_ip(), &table)?;

    console::explain(&target, &matched);
    Ok(ExitCode::SUCCESS)
}

async fn exec(cli: &Cli, config: &ToolConfig, args: &ExecArgs) -> Result<ExitCode> {
    let payload = args.payload();
    let spec = HostSpec::parse(&args.target)?;

    // everything that can fail without touching the network comes first
    let (operation, table) = match &args.jump {
        Some(_) => (Operation::JumpExec, None),
        None => (Operation::RoutedExec, Some(load_routes(routes_path(cli)?)?)),
    };
    payload.validate()?;
    let identity = resolve_identity(&args.identity, config)?;

    let target = AddressResolver::new().resolve(&spec).await;
    let chain = match (&args.jump, &table) {
        (Some(jump), _) => Chain::parse(jump)?,
        (None, Some(table)) => RouteResolver::new().resolve(target.resolved_ip(), table)?,
        (None, None) => return Err(eyre!("no route table loaded")),
    };
    info!(
        target = %target.raw(),
        ip = %target.resolved_ip(),
        chain = %chain,
        ?operation,
        "chain selected"
    );

    let mut executor_config = ExecutorConfig::default()
        .with_timeouts(config.timeouts.into())
        .with_remote_tmp_dir(config.remote_tmp_dir.clone());
    if let Some(identity) = &identity {
        executor_config = executor_config.with_identity(identity.path());
    }

    let executor = ChainExecutor::new(Arc::new(ProcessTransport::new()), executor_config)
        .with_reporter(Arc::new(ConsoleReporter::new(&target, &payload)));

    let title = match operation {
        Operation::RoutedExec => "SSH Router - Auto Route Selection",
        Operation::JumpExec => "SSH Jump Exec",
    };
    console::exec_banner(title, &target, &chain, &payload);

    let mut builder = ExecutionRecordBuilder::new(operation, &target, &chain, &payload);
    let interrupted = {
        let run = executor.run(&chain, &target, &payload, &mut builder);
        tokio::pin!(run);
        tokio::select! {
            () = &mut run => false,
            signal = tokio::signal::ctrl_c() => match signal {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "cannot listen for Ctrl-C, running to completion");
                    run.await;
                    false
                }
            },
        }
    };
    if interrupted {
        // the run future is gone, its children were killed on drop
        let phase = builder.phase();
        warn!(phase = %phase, "interrupted by operator");
        let err = CoreError::Interrupted(phase);
        println!("\n✗ {err}");
        builder.push_error(&err);
    }
    let record = builder.finish();

    let output_dir = args
        .output
        .clone()
        .unwrap_or_else(|| config.output_dir.clone());
    let saved_dir = if args.no_save {
        None
    } else {
        persist(&output_dir, &record)
    };
    console::exec_complete(saved_dir.as_deref());

    Ok(exit_code(&record))
}

/// Write the record; a failure is reported but leaves the outcome unchanged
fn persist(output_dir: &Path, record: &ExecutionRecord) -> Option<PathBuf> {
    let recorder = ExecutionRecorder::new(output_dir);
    match recorder.persist(record) {
        Ok(path) => {
            console::record_written(&path);
            Some(recorder.target_dir(record.target_ip()))
        }
        Err(e) => {
            error!(error = %e, "could not save execution record");
            eprintln!("Error saving output: {e}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use hopshell_core::{ExecutionPayload, RunPhase};
    use hopshell_exec::CommandResult;

    use super::*;

    async fn record_with_exit(status: Option<i32>) -> ExecutionRecord {
        let target = AddressResolver::new()
            .resolve(&HostSpec::parse("admin@10.1.2.3").unwrap())
            .await;
        let payload = ExecutionPayload::command("uptime");
        let mut builder =
            ExecutionRecordBuilder::new(Operation::RoutedExec, &target, &Chain::Direct, &payload);
        match status {
            Some(status) => builder.set_outcome(&CommandResult {
                status,
                stdout: String::new(),
                stderr: String::new(),
                duration: Duration::from_millis(1),
            }),
            None => builder.push_error(&CoreError::Interrupted(RunPhase::Preflight)),
        }
        builder.finish()
    }

    #[tokio::test]
    async fn test_exit_code_follows_run_outcome() {
        let ok = record_with_exit(Some(0)).await;
        let failed = record_with_exit(Some(2)).await;
        let interrupted = record_with_exit(None).await;

        assert_eq!(exit_code(&ok), ExitCode::SUCCESS);
        assert_eq!(exit_code(&failed), ExitCode::FAILURE);
        assert_eq!(exit_code(&interrupted), ExitCode::FAILURE);
    }

    #[test]
    fn test_usage_errors_exit_one() {
        let missing_payload = parse_cli(["hopshell", "exec", "-t", "admin@10.1.2.3"]);
        assert_eq!(missing_payload.err(), Some(ExitCode::FAILURE));

        let unknown = parse_cli(["hopshell", "frobnicate"]);
        assert_eq!(unknown.err(), Some(ExitCode::FAILURE));
    }

    #[test]
    fn test_help_exits_zero() {
        let help = parse_cli(["hopshell", "--help"]);
        assert_eq!(help.err(), Some(ExitCode::SUCCESS));

        let version = parse_cli(["hopshell", "--version"]);
        assert_eq!(version.err(), Some(ExitCode::SUCCESS));
    }

    #[test]
    fn test_valid_arguments_parse() {
        let cli = parse_cli(["hopshell", "-r", "routes.json", "list"]).ok();
        assert!(matches!(cli.map(|c| c.command), Some(Command::List(_))));
    }
}
