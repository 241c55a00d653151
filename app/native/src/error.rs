//! Error types for Groupy.
//!
//! Library modules define their own error enums next to the code that raises
//! them (`DomError`, `ReconcileError`, `ConfigError`, `ActorError`). This
//! module provides the unified error the CLI reports to the user.

use serde::Serialize;
use thiserror::Error;

use crate::config::ConfigError;
use crate::reconcile::{ActorError, ReconcileError};

/// Errors that can occur while running a Groupy command.
///
/// Serializes as `{"kind": "...", "message": "..."}` so `--json` output can
/// report failures in the same shape as results.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum GroupyError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),
    /// Rule file error.
    #[error("Rule error: {0}")]
    RuleError(String),
    /// Sidebar fixture error.
    #[error("Sidebar error: {0}")]
    SidebarError(String),
    /// Reconciliation failed.
    #[error("Reconcile error: {0}")]
    ReconcileError(String),
    /// File watcher error.
    #[error("Watch error: {0}")]
    WatchError(String),
    /// IO error.
    #[error("IO error: {0}")]
    IoError(String),
    /// Generic command error.
    #[error("{0}")]
    CommandError(String),
}

impl From<std::io::Error> for GroupyError {
    fn from(err: std::io::Error) -> Self { Self::IoError(err.to_string()) }
}

impl From<serde_json::Error> for GroupyError {
    fn from(err: serde_json::Error) -> Self { Self::CommandError(err.to_string()) }
}

impl From<String> for GroupyError {
    fn from(msg: String) -> Self { Self::CommandError(msg) }
}

impl From<&str> for GroupyError {
    fn from(msg: &str) -> Self { Self::CommandError(msg.to_string()) }
}

impl From<ConfigError> for GroupyError {
    fn from(err: ConfigError) -> Self { Self::ConfigError(err.to_string()) }
}

impl From<ReconcileError> for GroupyError {
    fn from(err: ReconcileError) -> Self { Self::ReconcileError(err.to_string()) }
}

impl From<ActorError> for GroupyError {
    fn from(err: ActorError) -> Self { Self::ReconcileError(err.to_string()) }
}

impl From<notify::Error> for GroupyError {
    fn from(err: notify::Error) -> Self { Self::WatchError(err.to_string()) }
}
