//! CLI command definitions using Clap.
//!
//! This module defines all CLI commands and their arguments, organized into
//! domain-specific submodules:
//!
//! - `sidebar` - `apply` and `watch`, which reconcile a sidebar fixture
//! - `rules` - Rule file inspection

use std::io;
use std::path::{Path, PathBuf};

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::error::GroupyError;
use crate::{config, schema};

pub mod rules;
pub mod sidebar;

pub use rules::RulesCommands;
pub use sidebar::{ApplyArgs, WatchArgs};

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Groupy CLI - keyword rules that cluster a chat sidebar into groups.
#[derive(Parser, Debug)]
#[command(name = "groupy")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Group a sidebar fixture once and print the result.
    Apply(ApplyArgs),

    /// Keep a sidebar fixture grouped while its rules and rooms change.
    ///
    /// Rule file edits and fixture edits are picked up automatically. JSON
    /// messages read from stdin (one per line) are forwarded to the
    /// reconciler, e.g. `{"type": "RULES_ORDER_UPDATED"}`.
    Watch(WatchArgs),

    /// Rule file commands.
    #[command(subcommand)]
    Rules(RulesCommands),

    /// Output a JSON Schema.
    ///
    /// Outputs the configuration schema to stdout, or the rule file schema
    /// with `--rules`. Can be redirected to a file for use with editors that
    /// support JSON Schema validation.
    Schema {
        /// Print the rule file schema instead of the configuration schema.
        #[arg(long)]
        rules: bool,
    },

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    /// Can be used with eval or redirected to a file.
    ///
    /// Usage:
    ///   eval "$(groupy completions --shell zsh)"
    ///   groupy completions --shell bash > ~/.local/share/bash-completion/completions/groupy
    ///   groupy completions --shell fish > ~/.config/fish/completions/groupy.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<PathBuf> { self.config.as_ref().map(PathBuf::from) }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), GroupyError> {
        if let Some(path) = self.config_path() {
            if !path.exists() {
                return Err(GroupyError::ConfigError(format!(
                    "Configuration file not found: {}",
                    path.display()
                )));
            }
            config::set_custom_config_path(path);
        }

        match &self.command {
            Commands::Apply(args) => sidebar::apply(args),
            Commands::Watch(args) => sidebar::watch(args),
            Commands::Rules(cmd) => rules::execute(cmd),

            Commands::Schema { rules } => {
                let output = if *rules {
                    schema::generate_rules_schema_json()
                } else {
                    schema::generate_schema_json()
                };
                println!("{output}");
                Ok(())
            }

            Commands::Completions { shell } => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "groupy", &mut io::stdout());
    }
}

/// Resolves the rule file from `--rules` or the configuration.
pub(crate) fn resolve_rules_path(arg: Option<&Path>) -> Result<PathBuf, GroupyError> {
    arg.map(Path::to_path_buf)
        .or_else(|| config::get_config().resolved_rules_path())
        .ok_or_else(|| {
            GroupyError::InvalidArguments(
                "No rule file: pass --rules or set rulesPath in the configuration".to_string(),
            )
        })
}
