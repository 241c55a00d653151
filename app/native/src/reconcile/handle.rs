//! Handle for communicating with the reconciler actor.
//!
//! The `ReconcilerHandle` is the single entry point for every listener: list
//! mutations, rule changes, rule editor messages and explicit requests all
//! become a [`Trigger`] sent through [`ReconcilerHandle::request`].

use std::time::Duration;

use eyeball::{SharedObservable, Subscriber};
use serde::Serialize;
use tokio::sync::mpsc;

use super::messages::{Request, RuntimeMessage, Trigger};
use super::pass::PassOutcome;

/// Error types for actor communication.
#[derive(Debug, thiserror::Error)]
pub enum ActorError {
    /// Failed to send message to actor.
    #[error("Failed to send message to reconciler: channel closed")]
    SendFailed,

    /// The pass stream ended.
    #[error("Failed to receive pass from reconciler: actor stopped")]
    ReceiveFailed,

    /// Waiting timed out.
    #[error("Timed out after {0:?}")]
    Timeout(Duration),
}

/// A completed pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PassSummary {
    /// Monotonic pass counter, starting at 1.
    pub generation: u64,
    /// What caused the pass.
    pub trigger: Trigger,
    /// What the pass did.
    pub outcome: PassOutcome,
}

/// Handle for communicating with the reconciler.
///
/// This handle is cheap to clone and can be shared across threads. The actor
/// stops once every handle is dropped.
#[derive(Clone)]
pub struct ReconcilerHandle {
    sender: mpsc::UnboundedSender<Request>,
    passes: SharedObservable<Option<PassSummary>>,
}

impl std::fmt::Debug for ReconcilerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReconcilerHandle")
            .field("closed", &self.sender.is_closed())
            .finish_non_exhaustive()
    }
}

impl ReconcilerHandle {
    pub(crate) const fn new(
        sender: mpsc::UnboundedSender<Request>,
        passes: SharedObservable<Option<PassSummary>>,
    ) -> Self {
        Self { sender, passes }
    }

    // ========================================================================
    // Requests
    // ========================================================================

    /// Requests a pass.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn request(&self, trigger: Trigger) -> Result<(), ActorError> {
        tracing::trace!(trigger = %trigger, "pass requested");
        self.sender.send(Request::Trigger(trigger)).map_err(|_| ActorError::SendFailed)
    }

    /// Signals that the rule list changed.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn rules_changed(&self) -> Result<(), ActorError> { self.request(Trigger::RulesChanged) }

    /// Signals that the rule editor reordered the rules.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn order_updated(&self) -> Result<(), ActorError> { self.request(Trigger::OrderUpdated) }

    /// Requests an immediate pass.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn reconcile_now(&self) -> Result<(), ActorError> { self.request(Trigger::Manual) }

    /// Handles a raw JSON message from the rule editor.
    ///
    /// Returns `true` if the message requested a pass. Unparsable messages and
    /// unknown types are logged and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has stopped.
    pub fn dispatch_message(&self, raw: &str) -> Result<bool, ActorError> {
        let message: RuntimeMessage = match serde_json::from_str(raw) {
            Ok(message) => message,
            Err(err) => {
                tracing::debug!(error = %err, "ignoring unparsable runtime message");
                return Ok(false);
            }
        };

        match message.trigger() {
            Some(trigger) => self.request(trigger).map(|()| true),
            None => {
                tracing::debug!(message = raw, "ignoring unknown runtime message");
                Ok(false)
            }
        }
    }

    /// Stops the actor after the current pass.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::SendFailed`] if the actor has already stopped.
    pub fn shutdown(&self) -> Result<(), ActorError> {
        self.sender.send(Request::Shutdown).map_err(|_| ActorError::SendFailed)
    }

    /// Returns `true` once the actor has stopped.
    #[must_use]
    pub fn is_closed(&self) -> bool { self.sender.is_closed() }

    // ========================================================================
    // Passes
    // ========================================================================

    /// The most recent pass, if any ran.
    #[must_use]
    pub fn last_pass(&self) -> Option<PassSummary> { self.passes.get() }

    /// Subscribes to completed passes.
    #[must_use]
    pub fn subscribe_passes(&self) -> Subscriber<Option<PassSummary>> { self.passes.subscribe() }

    /// Waits until a pass with at least the given generation has completed.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::ReceiveFailed`] if the pass stream ends.
    pub async fn wait_for_pass(&self, generation: u64) -> Result<PassSummary, ActorError> {
        let mut passes = self.passes.subscribe();
        let mut current = passes.get();
        loop {
            if let Some(summary) = current
                && summary.generation >= generation
            {
                return Ok(summary);
            }
            current = passes.next().await.ok_or(ActorError::ReceiveFailed)?;
        }
    }

    /// Waits for a pass with a timeout.
    ///
    /// # Errors
    ///
    /// Returns [`ActorError::Timeout`] if no such pass completes in time, or
    /// any error from [`Self::wait_for_pass`].
    pub async fn wait_for_pass_timeout(
        &self,
        generation: u64,
        timeout: Duration,
    ) -> Result<PassSummary, ActorError> {
        tokio::time::timeout(timeout, self.wait_for_pass(generation))
            .await
            .map_err(|_| ActorError::Timeout(timeout))?
    }
}
