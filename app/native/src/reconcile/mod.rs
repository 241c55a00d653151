//! Reconciler actor.
//!
//! The reconciler owns the mutation watcher and the state carried between
//! passes, and processes requests sequentially. It never runs two passes at
//! once: requests that arrive while a pass runs are drained afterwards and
//! coalesced into at most one re-run.
//!
//! # Scheduling
//!
//! - [`Trigger::Mutation`] restarts the debounce timer.
//! - Every other trigger runs a pass at once, unless a debounce is pending, in
//!   which case it is folded into the pass that runs when the burst settles.
//! - A pass that finds no room list schedules a retry after the poll interval.
//!
//! # Panic Recovery
//!
//! A pass that panics is caught and logged like a failed pass. The watcher
//! guard lives outside the unwind boundary, so the watcher is re-armed either
//! way and the actor keeps serving requests.

mod handle;
mod materialize;
mod messages;
mod open_state;
mod pass;
pub mod snapshot;

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use eyeball::SharedObservable;
pub use handle::{ActorError, PassSummary, ReconcilerHandle};
pub use materialize::{Palette, RenderedGroup, materialize};
pub use messages::{Request, RuntimeMessage, Trigger};
pub use open_state::OpenState;
pub use pass::{
    GroupSummary, PassOutcome, PassReport, PassState, ReconcileError, ReconcilerSettings,
    run_pass,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::dom::SharedDocument;
use crate::rules::RuleSource;
use crate::watcher::{Debounce, MutationWatcher};

/// The reconciler actor.
pub struct Reconciler {
    document: SharedDocument,
    source: Arc<dyn RuleSource>,
    settings: ReconcilerSettings,
    state: PassState,
    watcher: MutationWatcher,
    debounce: Debounce,
    retry_at: Option<Instant>,
    generation: u64,
    passes: SharedObservable<Option<PassSummary>>,
    receiver: mpsc::UnboundedReceiver<Request>,
}

impl Reconciler {
    /// Spawns the actor and returns a handle for communication.
    ///
    /// A startup pass is queued right away. Rule changes published by
    /// `source` request a pass automatically. Must be called from within a
    /// Tokio runtime.
    #[must_use]
    pub fn spawn(
        document: SharedDocument,
        source: Arc<dyn RuleSource>,
        settings: ReconcilerSettings,
    ) -> ReconcilerHandle {
        Self::spawn_with_state(document, source, settings, PassState::new())
    }

    /// Like [`Self::spawn`], sharing an existing open/closed table.
    #[must_use]
    pub fn spawn_with_state(
        document: SharedDocument,
        source: Arc<dyn RuleSource>,
        settings: ReconcilerSettings,
        state: PassState,
    ) -> ReconcilerHandle {
        tracing::debug!(list_id = %settings.contract.list_id, "spawning reconciler");
        let (sender, receiver) = mpsc::unbounded_channel();
        let passes = SharedObservable::new(None);

        let on_mutation = sender.downgrade();
        let watcher = MutationWatcher::new(&settings.contract.list_id, move || {
            if let Some(sender) = on_mutation.upgrade() {
                let _ = sender.send(Request::Trigger(Trigger::Mutation));
            }
        });

        let subscription = spawn_rule_subscription(source.as_ref(), sender.downgrade());

        let actor = Self {
            document,
            source,
            debounce: Debounce::new(settings.debounce),
            settings,
            state,
            watcher,
            retry_at: None,
            generation: 0,
            passes: passes.clone(),
            receiver,
        };

        let _ = sender.send(Request::Trigger(Trigger::Startup));
        tokio::spawn(async move {
            actor.run().await;
            subscription.abort();
        });

        ReconcilerHandle::new(sender, passes)
    }

    /// Run the actor's request loop until shutdown or until every handle is dropped.
    async fn run(mut self) {
        tracing::trace!("reconciler loop starting");

        loop {
            let wake = self.next_wake();
            tokio::select! {
                request = self.receiver.recv() => {
                    let Some(request) = request else {
                        tracing::debug!("reconciler channel closed, exiting");
                        break;
                    };
                    if !self.handle_request(request) {
                        tracing::debug!("reconciler received shutdown");
                        break;
                    }
                }
                () = tokio::time::sleep_until(wake.unwrap_or_else(Instant::now)), if wake.is_some() => {
                    if !self.on_timer() {
                        break;
                    }
                }
            }
        }

        self.watcher.disarm(&mut self.document.lock());
    }

    /// Earliest pending timer.
    fn next_wake(&self) -> Option<Instant> {
        match (self.debounce.deadline(), self.retry_at) {
            (Some(debounce), Some(retry)) => Some(debounce.min(retry)),
            (debounce, retry) => debounce.or(retry),
        }
    }

    /// Handles one request. Returns `false` on shutdown.
    fn handle_request(&mut self, request: Request) -> bool {
        match request {
            Request::Shutdown => false,
            Request::Trigger(trigger) if trigger.is_debounced() => {
                self.debounce.signal(Instant::now());
                true
            }
            Request::Trigger(trigger) if self.debounce.is_pending() => {
                tracing::trace!(trigger = %trigger, "folded into pending debounce");
                true
            }
            Request::Trigger(trigger) => self.run_and_drain(trigger),
        }
    }

    /// Fires due timers. Returns `false` on shutdown.
    fn on_timer(&mut self) -> bool {
        let now = Instant::now();
        if self.debounce.fire_if_due(now) {
            return self.run_and_drain(Trigger::Mutation);
        }
        if self.retry_at.is_some_and(|retry| retry <= now) {
            self.retry_at = None;
            return self.run_and_drain(Trigger::Retry);
        }
        true
    }

    /// Runs a pass, then coalesces everything queued meanwhile into at most
    /// one re-run. Returns `false` on shutdown.
    fn run_and_drain(&mut self, trigger: Trigger) -> bool {
        let mut next = Some(trigger);

        while let Some(trigger) = next.take() {
            self.execute(trigger);

            while let Ok(request) = self.receiver.try_recv() {
                match request {
                    Request::Shutdown => return false,
                    Request::Trigger(queued) if queued.is_debounced() => {
                        self.debounce.signal(Instant::now());
                    }
                    Request::Trigger(queued) => {
                        next.get_or_insert(queued);
                    }
                }
            }

            if self.debounce.is_pending() && next.take().is_some() {
                tracing::trace!("re-run folded into pending debounce");
            }
        }
        true
    }

    /// Runs one pass with the watcher suspended and publishes the summary.
    fn execute(&mut self, trigger: Trigger) {
        self.generation += 1;
        let generation = self.generation;
        tracing::debug!(generation, trigger = %trigger, "running pass");

        let result = {
            let mut document = self.document.lock();
            let mut guard = self.watcher.suspend(&mut document);
            let source = &self.source;
            let settings = &self.settings;
            let state = &mut self.state;

            catch_unwind(AssertUnwindSafe(|| {
                let rules = source.rules();
                pass::run_pass(&mut guard, &rules, settings, state)
            }))
            .unwrap_or_else(|panic_info| {
                let message = panic_info
                    .downcast_ref::<&str>()
                    .map(|s| (*s).to_string())
                    .or_else(|| panic_info.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "unknown panic".to_string());
                Err(ReconcileError::Panicked(message))
            })
        };

        self.retry_at = match &result {
            Ok(None) => Some(Instant::now() + self.settings.poll_interval),
            _ => None,
        };
        if let Err(err) = &result {
            tracing::error!(generation, trigger = %trigger, error = %err, "pass failed");
        }

        self.passes.set(Some(PassSummary {
            generation,
            trigger,
            outcome: PassOutcome::from(result),
        }));
    }
}

/// Forwards rule list changes to the actor until it stops.
fn spawn_rule_subscription(
    source: &dyn RuleSource,
    sender: mpsc::WeakUnboundedSender<Request>,
) -> JoinHandle<()> {
    let mut rules = source.subscribe();
    tokio::spawn(async move {
        while rules.next().await.is_some() {
            let Some(sender) = sender.upgrade() else { break };
            if sender.send(Request::Trigger(Trigger::RulesChanged)).is_err() {
                break;
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::DomContract;
    use crate::dom::Document;
    use crate::rules::{Rule, RuleStore};
    use crate::sidebar::{RoomFixture, SidebarFixture};

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn spawn_with(doc: Document, rules: Vec<Rule>) -> (ReconcilerHandle, SharedDocument, RuleStore) {
        let document = doc.into_shared();
        let store = RuleStore::new(rules);
        let handle = Reconciler::spawn(
            Arc::clone(&document),
            Arc::new(store.clone()),
            ReconcilerSettings::default(),
        );
        (handle, document, store)
    }

    fn sidebar(names: &[&str]) -> Document {
        SidebarFixture {
            rooms: names.iter().map(|name| RoomFixture::new(name, 0, false)).collect(),
        }
        .build(&DomContract::default())
        .unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_pass_groups_list() {
        let (handle, _, _) = spawn_with(sidebar(&["Alpha", "Beta"]), vec![Rule::new(1, "A", &["Alpha"])]);

        let summary = handle.wait_for_pass_timeout(1, TIMEOUT).await.unwrap();

        assert_eq!(summary.trigger, Trigger::Startup);
        let report = summary.outcome.report().unwrap();
        assert_eq!(report.groups.len(), 1);
        assert_eq!(report.ungrouped, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_own_edits_do_not_retrigger() {
        let (handle, _, _) = spawn_with(sidebar(&["Alpha", "Beta"]), vec![Rule::new(1, "A", &["Alpha"])]);
        handle.wait_for_pass_timeout(1, TIMEOUT).await.unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;

        assert_eq!(handle.last_pass().unwrap().generation, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rule_store_change_requests_pass() {
        let (handle, _, store) = spawn_with(sidebar(&["Alpha", "Beta"]), Vec::new());
        handle.wait_for_pass_timeout(1, TIMEOUT).await.unwrap();

        store.set(vec![Rule::new(1, "B", &["Beta"])]);

        let summary = handle.wait_for_pass_timeout(2, TIMEOUT).await.unwrap();
        assert_eq!(summary.trigger, Trigger::RulesChanged);
        assert_eq!(summary.outcome.report().unwrap().groups[0].name, "B");
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_stops_actor() {
        let (handle, document, _) = spawn_with(sidebar(&["Alpha"]), Vec::new());
        handle.wait_for_pass_timeout(1, TIMEOUT).await.unwrap();

        handle.shutdown().unwrap();
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert!(handle.is_closed());
        assert_eq!(document.lock().observer_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropping_handles_stops_actor() {
        let (handle, document, _) = spawn_with(sidebar(&["Alpha"]), Vec::new());
        handle.wait_for_pass_timeout(1, TIMEOUT).await.unwrap();
        assert_eq!(document.lock().observer_count(), 1);

        drop(handle);
        tokio::time::sleep(Duration::from_millis(10)).await;

        assert_eq!(document.lock().observer_count(), 0);
    }
}
