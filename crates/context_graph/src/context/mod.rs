//! Context lifecycle graph
//!
//! Resources bound to a graphics context register a pair of callbacks here
//! and declare which other resources they need. When the host reports that
//! the context became valid or invalid, every resource is brought up or torn
//! down in dependency order.
//!
//! ```text
//! Host ──notify_active / notify_inactive──▶ ContextRegistry
//!                                               │
//!                         activate_chain / deactivate_chain
//!                                               │
//!                              on_activate / on_deactivate ──▶ resources
//! ```

mod deferred;
mod error;
mod listener;
mod propagation;
mod registry;
mod shared;

#[cfg(test)]
mod tests;

pub use deferred::{DeferredQueue, PendingListener};
pub use error::{ContextError, ContextResult};
pub use listener::{ContextListener, ListenerCallbacks};
pub use registry::{ContextRegistry, RegistryStats};
pub use shared::{ListenerGuard, SharedRegistry};

pub use crate::foundation::collections::ListenerId;
