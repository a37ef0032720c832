//! Operator-facing progress output on stdout

use std::io::Write;
use std::path::Path;

use hopshell_core::{ExecutionPayload, ProbeStatus, Reporter, RunEvent, RunPhase};
use hopshell_exec::Chain;
use hopshell_route::{NetworkSelector, Route, RouteMatch, TargetHost};

const RULE: &str = "========================================";
const SEPARATOR: &str = "-----------------------------------";

fn banner(title: &str) {
    println!("{RULE}");
    println!("  {title}");
    println!("{RULE}");
}

fn chain_label(chain: &Chain) -> String {
    if chain.is_direct() {
        "DIRECT (no jump host)".to_string()
    } else {
        chain.to_string()
    }
}

/// Prints run progress as the executor reports it
pub struct ConsoleReporter {
    target: String,
    kind: &'static str,
}

impl ConsoleReporter {
    pub fn new(target: &TargetHost, payload: &ExecutionPayload) -> Self {
        let kind = match payload {
            ExecutionPayload::Command(_) => "Command",
            ExecutionPayload::Script { .. } => "Script",
        };
        Self {
            target: target.raw().to_string(),
            kind,
        }
    }
}

impl Reporter for ConsoleReporter {
    fn on_event(&self, event: RunEvent<'_>) {
        match event {
            RunEvent::Phase(RunPhase::Preflight) => println!("Testing connectivity..."),
            RunEvent::Phase(RunPhase::Upload) => println!("Uploading script to {}...", self.target),
            RunEvent::Phase(RunPhase::Dispatch) => {
                println!(
                    "Executing {} on {}...",
                    self.kind.to_lowercase(),
                    self.target
                );
                println!("{SEPARATOR}");
            }
            RunEvent::Phase(_) => {}
            RunEvent::Connected => println!("✓ Connection successful\n"),
            RunEvent::Uploaded { remote_path } => println!("✓ Script uploaded to {remote_path}"),
            RunEvent::Output(result) => {
                let output = result.combined_output();
                if !output.is_empty() {
                    print!("{output}");
                    if !output.ends_with('\n') {
                        println!();
                    }
                }
                println!("{SEPARATOR}");
                if result.success() {
                    println!("✓ {} executed successfully", self.kind);
                } else {
                    println!("✗ {} failed (exit code: {})", self.kind, result.status);
                }
            }
            RunEvent::ScriptKept { remote_path } => println!("Script kept at {remote_path}"),
            RunEvent::CleanedUp => println!("✓ Cleanup complete"),
            RunEvent::Error(message) => println!("✗ {message}"),
        }
    }
}

/// Header printed before an exec run
pub fn exec_banner(title: &str, target: &TargetHost, chain: &Chain, payload: &ExecutionPayload) {
    banner(title);
    println!("Target Host: {}", target.raw());
    println!("Target IP: {}", target.resolved_ip());
    println!("Route: {}", chain_label(chain));
    match payload {
        ExecutionPayload::Command(command) => println!("Command: {command}"),
        ExecutionPayload::Script { local_path, .. } => {
            println!("Script: {}", local_path.display());
        }
    }
    println!();
}

pub fn record_written(path: &Path) {
    println!("\n✓ Output: {}", path.display());
}

/// Footer printed after an exec run
pub fn exec_complete(output_dir: Option<&Path>) {
    println!();
    banner("Execution Complete");
    if let Some(dir) = output_dir {
        println!("Output directory: {}", dir.display());
    }
}

pub fn list_header(routes_file: &Path) {
    banner("SSH Routes Configuration");
    println!("Routes File: {}\n", routes_file.display());
}

/// One list-mode entry, without its probe line
pub fn list_route(number: usize, route: &Route) {
    match &route.selector {
        NetworkSelector::Default => println!("Route {number}: DEFAULT ROUTE"),
        selector => println!("Route {number}: {selector}"),
    }
    if let Some(description) = route.description.as_deref().filter(|d| !d.is_empty()) {
        println!("  Description: {description}");
    }
    println!("  Jump Chain: {}", chain_label(&route.via));
}

/// Shown while a probe is in flight
pub fn probe_started() {
    print!("  Testing... ");
    // progress only; a failed flush just delays the text
    let _ = std::io::stdout().flush();
}

pub fn probe_finished(status: &ProbeStatus) {
    match status {
        ProbeStatus::Direct => {}
        ProbeStatus::Reachable => println!("✓ Reachable"),
        ProbeStatus::Unreachable(_) => println!("✗ Unreachable"),
    }
}

pub fn list_footer(total: usize) {
    println!("{RULE}");
    println!("Total routes configured: {total}");
    println!("{RULE}");
}

/// Output of `hopshell route <target>`
pub fn explain(target: &TargetHost, matched: &RouteMatch<'_>) {
    banner("Route Resolution");
    println!("Target Host: {}", target.raw());
    println!(
        "Target IP: {} ({:?})",
        target.resolved_ip(),
        target.resolution()
    );
    match matched {
        RouteMatch::Cidr { index, route } => {
            println!("Matched: Route {}: {}", index + 1, route.selector);
        }
        RouteMatch::Default { index, .. } => {
            println!("Matched: Route {}: DEFAULT ROUTE", index + 1);
        }
    }
    println!("Route: {}", chain_label(matched.chain()));
}
