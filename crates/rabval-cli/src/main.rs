//! rabval CLI
//!
//! Command-line interface for checking, diffing, applying and deploying
//! RabbitMQ definitions exports

use clap::{Parser, Subcommand};
use rabval_core::config::RabvalConfig;
use rabval_core::logging_facility::{self, Profile};
use std::process::ExitCode;

mod commands;

#[derive(Debug, Parser)]
#[command(name = "rabval", version)]
#[command(about = "Validate, diff and deploy RabbitMQ definitions", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check a definitions file, optionally against observed usage
    Validate(commands::validate::ValidateArgs),
    /// Diff two definitions files or live brokers
    Diff(commands::diff::DiffArgs),
    /// Make a live broker match a definitions file
    Deploy(commands::deploy::DeployArgs),
    /// Apply a diff to a definitions file
    Apply(commands::apply::ApplyArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging_facility::init(Profile::from_format(
        std::env::var("RABVAL_LOG_FORMAT").ok().as_deref(),
    ));

    let result = match RabvalConfig::from_env() {
        Ok(config) => match cli.command {
            Commands::Validate(args) => commands::validate::execute(args, &config),
            Commands::Diff(args) => commands::diff::execute(args).await,
            Commands::Deploy(args) => commands::deploy::execute(args, &config).await,
            Commands::Apply(args) => commands::apply::execute(args),
        },
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
