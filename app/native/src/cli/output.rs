//! CLI output formatting utilities.
//!
//! This module provides utilities for formatting CLI output including:
//! - The grouped sidebar as a tree
//! - Pass summaries
//! - Small cell formatters for tables

use std::fmt::Write;

use colored::Colorize;
use serde::Serialize;

use crate::error::GroupyError;
use crate::reconcile::{PassOutcome, PassSummary};
use crate::sidebar::{EntryView, RoomView};

/// Prints a value as pretty JSON.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn print_json<T: Serialize>(value: &T) -> Result<(), GroupyError> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Renders the top level of the room list as a tree.
///
/// ```text
/// ▾ Team A  3 unread @
///   ├─ Alpha 1  2
///   └─ Alpha 2  1 @
/// • Beta
/// ```
#[must_use]
pub fn render_entries(entries: &[EntryView]) -> String {
    let mut out = String::new();

    for entry in entries {
        match entry {
            EntryView::Group { name, unread_total, mention, open, rooms } => {
                let marker = if *open { "▾" } else { "▸" };
                let _ = writeln!(
                    out,
                    "{marker} {}  {}{}",
                    name.bold(),
                    format!("{unread_total} unread").dimmed(),
                    mention_marker(*mention),
                );
                for (i, room) in rooms.iter().enumerate() {
                    let branch = if i + 1 == rooms.len() { "└─" } else { "├─" };
                    let _ = writeln!(out, "  {} {}", branch.dimmed(), format_room(room));
                }
            }
            EntryView::Room(room) => {
                let _ = writeln!(out, "{} {}", "•".dimmed(), format_room(room));
            }
        }
    }
    out
}

fn format_room(room: &RoomView) -> String {
    let name = room.name.as_deref().map_or_else(|| "(unnamed)".italic().to_string(), String::from);
    if room.unread == 0 && !room.mention {
        return name;
    }
    format!("{name}  {}{}", room.unread.to_string().yellow(), mention_marker(room.mention))
}

fn mention_marker(mention: bool) -> String {
    if mention { format!(" {}", "@".red().bold()) } else { String::new() }
}

/// One-line description of a pass.
#[must_use]
pub fn format_summary(summary: &PassSummary) -> String {
    let prefix = format!("pass #{} ({})", summary.generation, summary.trigger);
    match &summary.outcome {
        PassOutcome::Grouped(report) => format!(
            "{}: {} groups, {} ungrouped",
            prefix.green(),
            report.groups.len(),
            report.ungrouped
        ),
        PassOutcome::ListMissing => format!("{}: room list not found", prefix.yellow()),
        PassOutcome::Failed(err) => format!("{}: {err}", prefix.red()),
    }
}

/// Truncates a string to a maximum number of characters, adding ellipsis if needed.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else if max_chars <= 1 {
        "…".to_string()
    } else {
        let truncate_at = s.char_indices().nth(max_chars - 1).map_or(s.len(), |(idx, _)| idx);
        format!("{}…", &s[..truncate_at])
    }
}

/// Formats a boolean as a colored string.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value { "✓".green().to_string() } else { "✗".red().to_string() }
}
