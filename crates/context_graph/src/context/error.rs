//! Registry errors
//!
//! Every variant is a programmer error: a correct caller never sees one.
//! They are returned rather than panicking so tests and tooling can observe
//! them, and they are logged at the point of detection.

use crate::foundation::collections::ListenerId;
use thiserror::Error;

/// Misuse of a [`ContextRegistry`](super::ContextRegistry)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The id was never registered or has already been unregistered
    #[error("Listener {id:?} is not registered")]
    NotRegistered {
        /// The unknown id
        id: ListenerId,
    },

    /// Adding `master -> slave` would close a dependency cycle
    #[error("Dependency {master:?} -> {slave:?} would create a cycle")]
    CycleDetected {
        /// Listener that would depend on `slave`
        master: ListenerId,
        /// Listener that would be depended upon
        slave: ListenerId,
    },
}

/// Result type for registry operations
pub type ContextResult<T> = Result<T, ContextError>;
