//! CLI module for Groupy.
//!
//! The CLI drives the reconciler against a sidebar fixture: `apply` runs a
//! single pass and prints the result, `watch` keeps the reconciler running
//! while the rule file and the fixture change on disk.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;

use crate::error::GroupyError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), GroupyError> {
    let cli = Cli::parse();
    cli.execute()
}
