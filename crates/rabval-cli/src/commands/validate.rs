//! Validate command
//!
//! Usage: rabval validate <DEFINITIONS> [USAGE] [--fail-fast]

use super::CommandResult;
use clap::Args;
use rabval_core::config::RabvalConfig;
use rabval_core::failure::CheckMode;
use rabval_core::validate::validate;
use rabval_engine::{load_usage, read_definitions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Definitions export to check
    pub definitions: PathBuf,

    /// JSON array of used resources: {vhost, queue} or {vhost, exchange}
    pub usage: Option<PathBuf>,

    /// Stop after the first check that fails
    #[arg(long)]
    pub fail_fast: bool,
}

/// Execute validate command
///
/// Prints `OK` on success; otherwise the numbered failure list goes to
/// stderr and the exit code is 1. Warnings are only logged.
pub fn execute(args: ValidateArgs, config: &RabvalConfig) -> CommandResult {
    let defs = read_definitions(&args.definitions)?;
    let usage = args.usage.as_deref().map(load_usage).transpose()?;
    let mode = if args.fail_fast {
        CheckMode::FailFast
    } else {
        CheckMode::CollectAll
    };

    let report = validate(&defs, usage.as_deref(), config, mode);
    if report.is_ok() {
        println!("OK");
        return Ok(ExitCode::SUCCESS);
    }

    eprintln!("Failures:");
    eprintln!("{}", report.failures);
    Ok(ExitCode::FAILURE)
}
