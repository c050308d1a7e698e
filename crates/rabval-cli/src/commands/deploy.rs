//! Deploy command
//!
//! Usage: rabval deploy <BASE_URL> <DEFINITIONS> [--ignore-file <FILE>] [--dry-run]
//!        [--no-deletions] [--recreate-changed] [--json]

use super::CommandResult;
use clap::Args;
use rabval_core::config::RabvalConfig;
use rabval_core::ignore::IgnoreList;
use rabval_engine::{
    deploy, load_ignore_list, read_definitions, DeployOptions, HttpManagementClient,
    OperationStatus,
};
use std::path::PathBuf;
use std::process::ExitCode;

/// Exit code after Ctrl-C, as shells report SIGINT
const EXIT_INTERRUPTED: u8 = 130;

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Management API root, credentials included: http(s)://user:pass@host:15672
    pub base_url: String,

    /// Definitions to deploy
    pub definitions: PathBuf,

    /// JSON list of ignore rules
    #[arg(long)]
    pub ignore_file: Option<PathBuf>,

    /// Plan and print every operation without changing the broker
    #[arg(long)]
    pub dry_run: bool,

    /// Never delete resources missing from DEFINITIONS
    #[arg(long)]
    pub no_deletions: bool,

    /// Delete and re-create changed resources. This drops whatever is
    /// attached to them, consumer channels included
    #[arg(long)]
    pub recreate_changed: bool,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute deploy command
///
/// Exit code 1 when any operation failed. Ctrl-C stops issuing operations;
/// the ones already applied stay.
pub async fn execute(args: DeployArgs, config: &RabvalConfig) -> CommandResult {
    let desired = read_definitions(&args.definitions)?;
    let ignore = match &args.ignore_file {
        Some(path) => load_ignore_list(path)?,
        None => IgnoreList::default(),
    };
    let client = HttpManagementClient::new(&args.base_url)?;
    let options = DeployOptions {
        dry_run: args.dry_run,
        no_deletions: args.no_deletions,
        recreate_changed: args.recreate_changed,
        ignore,
    };

    let report = tokio::select! {
        result = deploy(&client, &desired, &options, config) => result?,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("Interrupted: operations already sent to {} are not rolled back", client.host());
            return Ok(ExitCode::from(EXIT_INTERRUPTED));
        }
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        for outcome in &report.outcomes {
            let status = match &outcome.status {
                OperationStatus::Applied => "ok",
                OperationStatus::DryRun => "dry-run",
                OperationStatus::Failed(_) => "FAILED",
            };
            println!("{:<8} {}", status, outcome.operation);
        }
        if report.outcomes.is_empty() {
            println!("Nothing to deploy");
        }
    }

    for skipped in &report.skipped_changes {
        eprintln!(
            "Changed but not deployed (see --recreate-changed): {} {}",
            skipped.category, skipped.identity
        );
    }

    let failures = report.failures();
    if failures.is_empty() {
        return Ok(ExitCode::SUCCESS);
    }
    eprintln!("Failures:");
    for (idx, failure) in failures.iter().enumerate() {
        eprintln!("{}. {}", idx + 1, failure);
    }
    Ok(ExitCode::FAILURE)
}
