//! Sidebar CLI commands.
//!
//! `apply` groups a sidebar fixture once. `watch` runs the reconciler on a
//! fixture and keeps it grouped as the rule file, the fixture, or stdin
//! messages change things.

use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::Args;
use serde::Serialize;

use super::resolve_rules_path;
use crate::cli::output;
use crate::config::{self, DomContract};
use crate::dom::{Document, DomError, SharedDocument};
use crate::error::GroupyError;
use crate::reconcile::{
    PassReport, PassState, PassSummary, Reconciler, ReconcilerHandle, ReconcilerSettings,
    run_pass,
};
use crate::rules::{RuleStore, ensure_rules_file, load_rules, watch_file, watch_rules_file};
use crate::sidebar::{EntryView, SidebarFixture, build_room, describe};

/// Arguments of `groupy apply`.
#[derive(Args, Debug)]
pub struct ApplyArgs {
    /// Sidebar fixture (JSON/JSONC) describing the room list.
    #[arg(long, value_name = "PATH")]
    pub sidebar: PathBuf,

    /// Rule file. Defaults to the configured `rulesPath`.
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Output the pass report and the grouped list as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Arguments of `groupy watch`.
#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Sidebar fixture (JSON/JSONC) describing the room list.
    #[arg(long, value_name = "PATH")]
    pub sidebar: PathBuf,

    /// Rule file. Created empty if missing. Defaults to the configured `rulesPath`.
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,
}

#[derive(Serialize)]
struct ApplyOutput {
    report: PassReport,
    entries: Vec<EntryView>,
}

/// Runs one pass over the fixture and prints the grouped list.
///
/// # Errors
///
/// Returns an error if the fixture or rule file cannot be read, the fixture
/// has no room list, or the pass fails.
pub fn apply(args: &ApplyArgs) -> Result<(), GroupyError> {
    let settings = ReconcilerSettings::from_config(config::get_config());
    let rules = load_rules(&resolve_rules_path(args.rules.as_deref())?);
    let mut doc = build_fixture(&args.sidebar, &settings.contract)?;

    let report = run_pass(&mut doc, &rules, &settings, &mut PassState::new())?.ok_or_else(|| {
        GroupyError::SidebarError(format!("no element with id '{}'", settings.contract.list_id))
    })?;
    let entries = describe(&doc, &settings.contract).unwrap_or_default();

    if args.json {
        output::print_json(&ApplyOutput { report, entries })
    } else {
        print!("{}", output::render_entries(&entries));
        Ok(())
    }
}

/// Runs the reconciler until Ctrl-C.
///
/// # Errors
///
/// Returns an error if setup fails: runtime, fixture, rule file, or watchers.
pub fn watch(args: &WatchArgs) -> Result<(), GroupyError> {
    let runtime = tokio::runtime::Builder::new_multi_thread().enable_all().build()?;
    runtime.block_on(run_watch(args))
}

async fn run_watch(args: &WatchArgs) -> Result<(), GroupyError> {
    let settings = ReconcilerSettings::from_config(config::get_config());
    let contract = settings.contract.clone();

    let rules_path = resolve_rules_path(args.rules.as_deref())?;
    ensure_rules_file(&rules_path)?;
    let store = RuleStore::from_file(&rules_path);
    let _rules_watcher = watch_rules_file(store.clone(), &rules_path)?;

    let document = build_fixture(&args.sidebar, &contract)?.into_shared();
    let handle = Reconciler::spawn(Arc::clone(&document), Arc::new(store), settings);

    let sidebar_doc = Arc::clone(&document);
    let sidebar_path = args.sidebar.clone();
    let sidebar_contract = contract.clone();
    let _sidebar_watcher = watch_file(&args.sidebar, move || {
        reload_sidebar(&sidebar_doc, &sidebar_path, &sidebar_contract);
    })?;

    forward_stdin(handle.clone());
    tracing::info!(
        sidebar = %args.sidebar.display(),
        rules = %rules_path.display(),
        "watching; press Ctrl-C to stop"
    );

    let mut passes = handle.subscribe_passes();
    if let Some(summary) = passes.get() {
        print_pass(&document, &contract, &summary);
    }
    loop {
        tokio::select! {
            summary = passes.next() => match summary {
                Some(Some(summary)) => print_pass(&document, &contract, &summary),
                Some(None) => {}
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if handle.shutdown().is_err() {
        tracing::debug!("reconciler already stopped");
    }
    Ok(())
}

fn build_fixture(path: &Path, contract: &DomContract) -> Result<Document, GroupyError> {
    SidebarFixture::load(path)
        .map_err(|err| GroupyError::SidebarError(format!("{}: {err}", path.display())))?
        .build(contract)
        .map_err(|err| GroupyError::SidebarError(format!("{}: {err}", path.display())))
}

fn print_pass(document: &SharedDocument, contract: &DomContract, summary: &PassSummary) {
    println!("{}", output::format_summary(summary));
    if let Some(entries) = describe(&document.lock(), contract) {
        print!("{}", output::render_entries(&entries));
    }
}

/// Replaces the rooms of the list with the fixture's, like a host re-render.
fn reload_sidebar(document: &SharedDocument, path: &Path, contract: &DomContract) {
    let fixture = match SidebarFixture::load(path) {
        Ok(fixture) => fixture,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unreadable sidebar");
            return;
        }
    };

    let mut doc = document.lock();
    let Some(list) = doc.element_by_id(&contract.list_id) else {
        tracing::warn!(list_id = %contract.list_id, "sidebar has no room list");
        return;
    };

    let replace = |doc: &mut Document| -> Result<(), DomError> {
        for child in doc.children(list).to_vec() {
            doc.remove(child)?;
        }
        for room in &fixture.rooms {
            let item = build_room(doc, room, contract)?;
            doc.append_child(list, item)?;
        }
        Ok(())
    };
    match replace(&mut *doc) {
        Ok(()) => tracing::debug!(rooms = fixture.rooms.len(), "sidebar reloaded"),
        Err(err) => tracing::warn!(error = %err, "failed to reload sidebar"),
    }
}

/// Forwards stdin lines to the reconciler as runtime messages.
fn forward_stdin(handle: ReconcilerHandle) {
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match handle.dispatch_message(&line) {
                Ok(true) => tracing::debug!("runtime message forwarded"),
                Ok(false) => tracing::info!(message = %line, "ignored runtime message"),
                Err(_) => break,
            }
        }
    });
}
