//! Apply command
//!
//! Usage: rabval apply <DIFF> <DEFINITIONS> [--revert] [--write]

use super::CommandResult;
use clap::Args;
use rabval_core::apply::{apply_diff, ApplyOptions};
use rabval_core::diff::DefinitionsDiff;
use rabval_engine::{read_definitions, write_definitions};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Debug, Args)]
pub struct ApplyArgs {
    /// Diff as printed by `rabval diff --json`
    pub diff: PathBuf,

    /// Definitions file to apply the diff to
    pub definitions: PathBuf,

    /// Apply the diff backwards, e.g. to bring a file in line with the broker
    /// it was diffed against
    #[arg(long)]
    pub revert: bool,

    /// Overwrite DEFINITIONS instead of printing to stdout
    #[arg(long)]
    pub write: bool,
}

/// Execute apply command
pub fn execute(args: ApplyArgs) -> CommandResult {
    let diff = DefinitionsDiff::from_slice(&std::fs::read(&args.diff)?)?;
    let base = read_definitions(&args.definitions)?;

    let result = apply_diff(
        &diff,
        base,
        ApplyOptions {
            revert: args.revert,
        },
    )?;

    if args.write {
        write_definitions(&args.definitions, &result)?;
        eprintln!("Wrote {}", args.definitions.display());
    } else {
        println!("{}", serde_json::to_string_pretty(&result)?);
    }
    Ok(ExitCode::SUCCESS)
}
