//! Host event adapter
//!
//! Platform layers report context changes through callbacks that do not
//! always fire exactly once per transition (a frontend may send a reset on
//! every video reinit, or a destroy during shutdown after the context is
//! already gone). [`ContextHost`] collapses those into real transitions
//! before they reach the registry.

use crate::context::{ContextResult, SharedRegistry};

/// Context notifications coming from the platform layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HostEvent {
    /// A (new) context is current and usable
    ContextReset,

    /// The context is about to be destroyed or has been lost
    ContextDestroyed,
}

/// Forwards platform context events to a registry, once per transition
#[derive(Debug, Clone)]
pub struct ContextHost {
    registry: SharedRegistry,
    transitions: u64,
}

impl ContextHost {
    /// Create a host around an existing registry
    pub fn new(registry: SharedRegistry) -> Self {
        Self {
            registry,
            transitions: 0,
        }
    }

    /// The registry this host drives
    pub const fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Whether the registry currently considers the context valid
    pub fn is_context_active(&self) -> bool {
        self.registry.borrow().is_active()
    }

    /// Number of transitions forwarded so far
    pub const fn transitions(&self) -> u64 {
        self.transitions
    }

    /// Handle one platform event.
    ///
    /// An event that matches the state already in effect is ignored.
    pub fn handle_event(&mut self, event: HostEvent) -> ContextResult<()> {
        let active = self.is_context_active();

        match (event, active) {
            (HostEvent::ContextReset, false) => {
                self.transitions += 1;
                self.registry.notify_active()
            }
            (HostEvent::ContextDestroyed, true) => {
                self.transitions += 1;
                self.registry.notify_inactive()
            }
            (HostEvent::ContextReset, true) | (HostEvent::ContextDestroyed, false) => {
                log::debug!(
                    "Ignoring {:?}: context is already {}",
                    event,
                    if active { "active" } else { "inactive" }
                );
                Ok(())
            }
        }
    }
}
