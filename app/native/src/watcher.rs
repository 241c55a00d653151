//! Room list mutation watcher.
//!
//! The watcher observes the room list subtree and reports every child-list
//! change. The reconciler rewrites that very subtree, so it must never hear
//! its own edits: [`MutationWatcher::suspend`] disarms the watcher and hands
//! back a [`WatchGuard`] that re-arms it when dropped. Because re-arming lives
//! in `Drop`, it happens on every exit path of a pass, including early `?`
//! returns and panics.
//!
//! Mutation bursts are collapsed by [`Debounce`], a trailing-edge timer that
//! restarts on every signal.

use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::dom::{Document, MutationCallback, ObserverId};

// ============================================================================
// MutationWatcher
// ============================================================================

/// Observes the room list and forwards mutations to a callback.
pub struct MutationWatcher {
    list_id: String,
    callback: MutationCallback,
    observer: Option<ObserverId>,
}

impl std::fmt::Debug for MutationWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MutationWatcher")
            .field("list_id", &self.list_id)
            .field("armed", &self.is_armed())
            .finish_non_exhaustive()
    }
}

impl MutationWatcher {
    /// Creates a disarmed watcher for the list with the given `id` attribute.
    pub fn new(list_id: &str, on_mutation: impl Fn() + Send + Sync + 'static) -> Self {
        Self {
            list_id: list_id.to_string(),
            callback: Arc::new(move |_| on_mutation()),
            observer: None,
        }
    }

    /// Returns `true` while observing.
    #[must_use]
    pub const fn is_armed(&self) -> bool { self.observer.is_some() }

    /// Starts observing the room list subtree.
    ///
    /// Returns `false` if the list is not present; the watcher stays disarmed.
    pub fn arm(&mut self, doc: &mut Document) -> bool {
        self.disarm(doc);

        let Some(list) = doc.element_by_id(&self.list_id) else {
            tracing::trace!(list_id = %self.list_id, "room list missing, watcher stays disarmed");
            return false;
        };

        self.observer = Some(doc.observe(list, Arc::clone(&self.callback)));
        tracing::trace!(list = %list, "watcher armed");
        true
    }

    /// Stops observing. Returns `true` if the watcher was armed.
    pub fn disarm(&mut self, doc: &mut Document) -> bool {
        self.observer.take().is_some_and(|id| doc.disconnect(id))
    }

    /// Disarms the watcher for the lifetime of the returned guard.
    pub fn suspend<'a>(&'a mut self, doc: &'a mut Document) -> WatchGuard<'a> {
        self.disarm(doc);
        WatchGuard { watcher: self, doc }
    }
}

/// Exclusive document access with the watcher disarmed.
///
/// Dereferences to the [`Document`]. Dropping the guard re-arms the watcher.
pub struct WatchGuard<'a> {
    watcher: &'a mut MutationWatcher,
    doc: &'a mut Document,
}

impl Deref for WatchGuard<'_> {
    type Target = Document;

    fn deref(&self) -> &Document { &*self.doc }
}

impl DerefMut for WatchGuard<'_> {
    fn deref_mut(&mut self) -> &mut Document { &mut *self.doc }
}

impl Drop for WatchGuard<'_> {
    fn drop(&mut self) { self.watcher.arm(&mut *self.doc); }
}

// ============================================================================
// Debounce
// ============================================================================

/// Trailing-edge debounce timer.
#[derive(Debug, Clone)]
pub struct Debounce {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debounce {
    /// Creates an idle timer.
    #[must_use]
    pub const fn new(delay: Duration) -> Self { Self { delay, deadline: None } }

    /// Records a signal, restarting the quiet period.
    pub fn signal(&mut self, now: Instant) { self.deadline = Some(now + self.delay); }

    /// Moment the pending burst settles, if one is pending.
    #[must_use]
    pub const fn deadline(&self) -> Option<Instant> { self.deadline }

    /// Returns `true` while a burst is pending.
    #[must_use]
    pub const fn is_pending(&self) -> bool { self.deadline.is_some() }

    /// Clears the pending burst if its deadline has passed. Returns `true` if it fired.
    pub fn fire_if_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if deadline <= now => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}
