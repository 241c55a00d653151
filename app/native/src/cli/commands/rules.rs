//! Rule CLI commands.
//!
//! Commands for inspecting and creating the rule file.

use std::fs;
use std::path::PathBuf;

use clap::Subcommand;
use colored::Colorize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::resolve_rules_path;
use crate::cli::output;
use crate::error::GroupyError;
use crate::rules::{Keywords, Rule, check_rules, ensure_rules_file, load_rules};

/// Rule file commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum RulesCommands {
    /// List the rules in priority order.
    ///
    /// Later rules win when several match the same room.
    List {
        /// Rule file. Defaults to the configured `rulesPath`.
        #[arg(long, value_name = "PATH")]
        rules: Option<PathBuf>,

        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Report entries that would be dropped or never match.
    Check {
        /// Rule file. Defaults to the configured `rulesPath`.
        #[arg(long, value_name = "PATH")]
        rules: Option<PathBuf>,
    },

    /// Create an empty rule file if none exists.
    Init {
        /// Rule file. Defaults to the configured `rulesPath`.
        #[arg(long, value_name = "PATH")]
        rules: Option<PathBuf>,
    },
}

/// Execute rule subcommands.
///
/// # Errors
///
/// Returns an error if the rule file cannot be resolved or read, or if
/// `check` finds problems.
pub fn execute(cmd: &RulesCommands) -> Result<(), GroupyError> {
    match cmd {
        RulesCommands::List { rules, json } => {
            let path = resolve_rules_path(rules.as_deref())?;
            let rules = load_rules(&path);
            if *json { output::print_json(&rules) } else { print_rules_table(&rules) }
        }
        RulesCommands::Check { rules } => check(&resolve_rules_path(rules.as_deref())?),
        RulesCommands::Init { rules } => {
            let path = resolve_rules_path(rules.as_deref())?;
            if ensure_rules_file(&path)? {
                println!("Rule file created at: {}", path.display());
            } else {
                println!("Rule file already exists at: {}", path.display());
            }
            Ok(())
        }
    }
}

#[allow(clippy::unnecessary_wraps)] // Consistent return type with other CLI functions
fn print_rules_table(rules: &[Rule]) -> Result<(), GroupyError> {
    #[derive(Tabled)]
    struct RuleRow {
        #[tabled(rename = "#")]
        position: usize,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Group")]
        group: String,
        #[tabled(rename = "Keywords")]
        keywords: String,
        #[tabled(rename = "Colors")]
        colors: String,
        #[tabled(rename = "Valid")]
        valid: String,
    }

    if rules.is_empty() {
        println!("{}", "No rules defined.".dimmed());
        return Ok(());
    }

    let rows: Vec<RuleRow> = rules
        .iter()
        .enumerate()
        .map(|(i, rule)| RuleRow {
            position: i + 1,
            id: rule.id,
            group: rule.group_name.clone(),
            keywords: match &rule.keywords {
                Keywords::List(list) => output::truncate(&list.join(", "), 40),
                Keywords::Malformed(_) => "(malformed)".red().to_string(),
            },
            colors: format!("{} / {}", rule.background_color(), rule.text_color()),
            valid: output::format_bool(!rule.is_malformed()),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(0..2)).with(Alignment::right()))
        .with(Modify::new(Columns::last()).with(Alignment::center()))
        .to_string();

    println!("{}", format!("Rules ({})", rules.len()).bold());
    println!("{table}");
    Ok(())
}

fn check(path: &std::path::Path) -> Result<(), GroupyError> {
    let text = fs::read_to_string(path)
        .map_err(|err| GroupyError::RuleError(format!("{}: {err}", path.display())))?;
    let issues = check_rules(&text);

    if issues.is_empty() {
        println!("{} {}", "✓".green(), path.display());
        return Ok(());
    }

    for issue in &issues {
        match issue.index {
            Some(index) => println!("{} entry {index}: {}", "✗".red(), issue.message),
            None => println!("{} {}", "✗".red(), issue.message),
        }
    }
    Err(GroupyError::RuleError(format!("{} problem(s) in {}", issues.len(), path.display())))
}
