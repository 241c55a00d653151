//! Name-keyed open/closed state of rendered groups.
//!
//! Containers are destroyed and recreated on every pass, so their `open`
//! class cannot carry state across passes. Header click handlers write the
//! new state here instead, and the next snapshot reads it back by group name.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::Mutex;

/// Shared table of group name to open flag.
#[derive(Debug, Clone, Default)]
pub struct OpenState {
    groups: Arc<Mutex<HashMap<String, bool>>>,
}

impl OpenState {
    /// Creates an empty table (every group closed).
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Returns `true` if the named group is open.
    #[must_use]
    pub fn is_open(&self, name: &str) -> bool {
        self.groups.lock().get(name).copied().unwrap_or(false)
    }

    /// Records the open flag of a group.
    pub fn set(&self, name: &str, open: bool) {
        tracing::debug!(group = %name, open, "group toggled");
        self.groups.lock().insert(name.to_string(), open);
    }

    /// Returns the open groups among `rendered`, forgetting every other entry.
    ///
    /// Only groups that were on screen keep their state, so a group that
    /// disappears and later comes back starts closed again.
    pub fn snapshot(&self, rendered: &[String]) -> HashSet<String> {
        let mut groups = self.groups.lock();
        groups.retain(|name, open| *open && rendered.contains(name));
        groups.keys().cloned().collect()
    }
}
