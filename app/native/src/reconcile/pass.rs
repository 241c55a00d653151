//! A single reconciliation pass.
//!
//! A pass flattens the list, regroups every room against the current rules
//! and renders the containers again. It is idempotent: running it twice on
//! an unchanged list with unchanged rules yields the same tree.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use super::OpenState;
use super::materialize::{Palette, materialize};
use super::snapshot;
use crate::config::{DomContract, GroupyConfig};
use crate::dom::{Document, DomError};
use crate::grouping::group_rooms;
use crate::rules::Rule;

/// Pass failures that are not "the list is missing".
#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A tree edit was rejected.
    #[error("tree edit failed: {0}")]
    Dom(#[from] DomError),

    /// The pass panicked.
    #[error("pass panicked: {0}")]
    Panicked(String),
}

/// Inputs of a pass that come from configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerSettings {
    /// Host markup contract.
    pub contract: DomContract,
    /// Header colors for rules without their own.
    pub palette: Palette,
    /// Quiet period after the last list mutation.
    pub debounce: Duration,
    /// Delay between attempts while the list is missing.
    pub poll_interval: Duration,
}

impl ReconcilerSettings {
    /// Builds settings from the loaded configuration.
    #[must_use]
    pub fn from_config(config: &GroupyConfig) -> Self {
        Self {
            contract: config.dom.clone(),
            palette: Palette {
                background: config.default_background_color.clone(),
                text: config.default_text_color.clone(),
            },
            debounce: config.debounce(),
            poll_interval: config.poll_interval(),
        }
    }
}

impl Default for ReconcilerSettings {
    fn default() -> Self { Self::from_config(&GroupyConfig::default()) }
}

/// State carried from one pass to the next.
#[derive(Debug, Clone, Default)]
pub struct PassState {
    /// Open flags written by header clicks.
    pub open_state: OpenState,
    rendered: Vec<String>,
}

impl PassState {
    /// Creates state with every group closed.
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Names of the groups rendered by the last successful pass.
    #[must_use]
    pub fn rendered(&self) -> &[String] { &self.rendered }
}

/// One rendered group, as reported after a pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupSummary {
    /// Group name.
    pub name: String,
    /// Number of member rooms.
    pub rooms: usize,
    /// Sum of the members' unread counts.
    pub unread_total: u32,
    /// Whether any member has a mention badge.
    pub has_mention: bool,
    /// Rendered open.
    pub open: bool,
}

/// What a successful pass did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassReport {
    /// Groups in rule order.
    pub groups: Vec<GroupSummary>,
    /// Rooms left in the flat list.
    pub ungrouped: usize,
    /// Containers from the previous pass that were unwrapped.
    pub unwrapped: usize,
}

/// Result of a pass as published to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "detail", rename_all = "camelCase")]
pub enum PassOutcome {
    /// The room list was not in the document.
    ListMissing,
    /// Rooms were regrouped.
    Grouped(PassReport),
    /// The pass failed; the tree may be partially grouped.
    Failed(String),
}

impl PassOutcome {
    /// The report, if the pass grouped the list.
    #[must_use]
    pub const fn report(&self) -> Option<&PassReport> {
        match self {
            Self::Grouped(report) => Some(report),
            _ => None,
        }
    }
}

impl From<Result<Option<PassReport>, ReconcileError>> for PassOutcome {
    fn from(result: Result<Option<PassReport>, ReconcileError>) -> Self {
        match result {
            Ok(Some(report)) => Self::Grouped(report),
            Ok(None) => Self::ListMissing,
            Err(err) => Self::Failed(err.to_string()),
        }
    }
}

/// Regroups the room list.
///
/// Returns `Ok(None)` when the list is not in the document. Callers that
/// observe the list must keep their watcher disarmed while this runs.
///
/// # Errors
///
/// Returns an error if a tree edit fails midway.
pub fn run_pass(
    doc: &mut Document,
    rules: &[Rule],
    settings: &ReconcilerSettings,
    state: &mut PassState,
) -> Result<Option<PassReport>, ReconcileError> {
    let contract = &settings.contract;
    let Some(list) = doc.element_by_id(&contract.list_id) else {
        tracing::debug!(list_id = %contract.list_id, "room list not found");
        return Ok(None);
    };

    let snapshot = snapshot::take(doc, list, contract, &state.open_state, &state.rendered)?;
    let assignment = group_rooms(rules, &snapshot.infos);
    let rendered = materialize(
        doc,
        list,
        rules,
        &assignment,
        &snapshot,
        &state.open_state,
        &settings.palette,
    )?;

    let groups: Vec<GroupSummary> = assignment
        .groups()
        .iter()
        .zip(&rendered)
        .map(|(group, container)| GroupSummary {
            name: group.name.clone(),
            rooms: group.members.len(),
            unread_total: group.unread_total,
            has_mention: group.has_mention,
            open: container.open,
        })
        .collect();

    state.rendered = rendered.into_iter().map(|group| group.name).collect();

    let report = PassReport {
        ungrouped: assignment.ungrouped().len(),
        unwrapped: snapshot.unwrapped,
        groups,
    };
    tracing::debug!(
        groups = report.groups.len(),
        ungrouped = report.ungrouped,
        unwrapped = report.unwrapped,
        slots = doc.slot_count(),
        live = doc.live_count(),
        "pass complete"
    );
    Ok(Some(report))
}
