//! Error types for the reactive core.
//!
//! The taxonomy is small on purpose:
//!
//! - `NotConnected`: one or more upstream dependencies could not be resolved
//!   and the node could not silently repair itself.
//! - `NotInitialized`: the node is connected but has never produced a usable
//!   value (e.g. a source with no default that was never set).
//! - `InvalidUsage`: the caller broke an API contract (wrong call arity,
//!   writing to a non-settable signal, declaring a dependent signal without
//!   dependencies).
//!
//! Resolution failures are *data*, not errors: `ResolveError` is produced by
//! the dependency resolver and stored on the node as its "why am I not
//! connected" reason, so callers can probe with a non-raising `connect`.
//! It only surfaces to users as the `reason` of `NotConnected`.

use thiserror::Error;

/// Error returned by the public signal operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalError {
    /// The signal's upstream dependencies are not (or no longer) resolved.
    #[error("signal '{name}' is not connected: {reason}")]
    NotConnected { name: String, reason: String },

    /// The signal has never produced a usable value.
    #[error("signal '{name}' is not initialized")]
    NotInitialized { name: String },

    /// The caller misused the API.
    #[error("invalid usage: {0}")]
    InvalidUsage(String),
}

impl SignalError {
    /// Whether this error means "no value yet" rather than a usage bug.
    ///
    /// Eager recomputes inside a propagation pass swallow not-ready errors;
    /// UI-facing callers typically render them as an empty state.
    pub fn is_not_ready(&self) -> bool {
        matches!(
            self,
            SignalError::NotConnected { .. } | SignalError::NotInitialized { .. }
        )
    }
}

/// A dependency-resolution failure, carried as data on the node.
///
/// Never raised directly; see the module docs.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ResolveError {
    pub message: String,
}

impl ResolveError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
