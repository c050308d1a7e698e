pub mod apply;
pub mod deploy;
pub mod diff;
pub mod validate;

/// Outcome of a command: an exit code, or an error printed by `main`
pub type CommandResult = Result<std::process::ExitCode, Box<dyn std::error::Error>>;
