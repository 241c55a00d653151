//! Groupy - keyword rules that cluster a chat sidebar into collapsible groups.
//!
//! The sidebar is a flat list of rooms. Groupy reads an ordered list of
//! keyword rules, assigns each room to the last rule whose keywords appear in
//! its name, and rewrites the list so every non-empty group becomes one
//! collapsible container, followed by the rooms no rule claimed.
//!
//! - [`rules`] holds the rule model and the observable rule store.
//! - [`grouping`] is the pure assignment engine.
//! - [`dom`] is the in-memory document the sidebar lives in.
//! - [`reconcile`] owns the regrouping pass and the actor that schedules it.
//! - [`watcher`] observes the list and debounces its mutations.

pub mod cli;
pub mod config;
pub mod constants;
pub mod dom;
pub mod error;
pub mod grouping;
pub mod reconcile;
pub mod rules;
pub mod schema;
pub mod sidebar;
pub mod watcher;
