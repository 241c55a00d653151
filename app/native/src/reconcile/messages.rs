//! Requests accepted by the reconciler and messages from the rule editor.

use serde::{Deserialize, Serialize};

/// Why a pass was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Trigger {
    /// First pass after the reconciler starts.
    Startup,
    /// The rule list changed.
    RulesChanged,
    /// The rule editor reordered the rules.
    OrderUpdated,
    /// The room list changed; debounced.
    Mutation,
    /// The room list was missing on the previous pass.
    Retry,
    /// Explicit request from the host.
    Manual,
}

impl Trigger {
    /// Short name for logging.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Startup => "startup",
            Self::RulesChanged => "rules_changed",
            Self::OrderUpdated => "order_updated",
            Self::Mutation => "mutation",
            Self::Retry => "retry",
            Self::Manual => "manual",
        }
    }

    /// Returns `true` if the trigger waits for the list to settle.
    #[must_use]
    pub const fn is_debounced(self) -> bool { matches!(self, Self::Mutation) }
}

impl std::fmt::Display for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result { f.write_str(self.name()) }
}

/// Messages processed by the reconciler actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Request {
    /// Schedule a pass.
    Trigger(Trigger),
    /// Stop the actor.
    Shutdown,
}

/// JSON messages sent by the rule editor, e.g. `{"type": "RULES_ORDER_UPDATED"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RuntimeMessage {
    /// Rules were reordered; regroup with the new order.
    RulesOrderUpdated,
    /// Any other message type.
    #[serde(other)]
    Unknown,
}

impl RuntimeMessage {
    /// The trigger this message maps to, if any.
    #[must_use]
    pub const fn trigger(self) -> Option<Trigger> {
        match self {
            Self::RulesOrderUpdated => Some(Trigger::OrderUpdated),
            Self::Unknown => None,
        }
    }
}
