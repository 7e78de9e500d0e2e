//! Context Registry - listener table and dependency edges
//!
//! The registry owns one `ListenerState` per registered resource and the
//! directed edges between them. It never owns the resources themselves; it
//! only holds the two callbacks each resource handed in.
//!
//! Edges point from a *master* to the *slave* it needs:
//!
//! ```text
//! vertex_array ──needs──▶ vertex_buffer
//!      │
//!      └─────needs──▶ index_buffer
//! ```
//!
//! Slaves are activated before their masters and deactivated after them.
//! Mutations made while the context is active bring the touched part of the
//! graph up to date immediately instead of waiting for the next
//! [`notify_active`](ContextRegistry::notify_active).

use super::deferred::DeferredQueue;
use super::error::{ContextError, ContextResult};
use super::listener::ListenerCallbacks;
use crate::core::config::RegistryConfig;
use crate::foundation::collections::{insert_unique, remove_id, ListenerId, ListenerMap, ListenerSet};

/// Per-listener bookkeeping
#[derive(Debug)]
pub(crate) struct ListenerState {
    pub(crate) callbacks: ListenerCallbacks,
    /// `on_activate` fired without a matching `on_deactivate`
    pub(crate) signaled: bool,
    /// Listeners this one needs
    pub(crate) dependencies: Vec<ListenerId>,
    /// Listeners that need this one
    pub(crate) dependers: Vec<ListenerId>,
}

impl ListenerState {
    fn new(callbacks: ListenerCallbacks) -> Self {
        Self {
            callbacks,
            signaled: false,
            dependencies: Vec::new(),
            dependers: Vec::new(),
        }
    }
}

/// Lifetime callback counters
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct CallbackCounters {
    pub(crate) activations: u64,
    pub(crate) deactivations: u64,
}

/// Snapshot of registry state for diagnostics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RegistryStats {
    /// Registered listeners
    pub listeners: usize,
    /// Listeners currently signaled
    pub signaled: usize,
    /// Dependency edges
    pub edges: usize,
    /// Whether the context is considered valid
    pub context_active: bool,
    /// Number of inactive -> active transitions so far
    pub context_generation: u64,
    /// `on_activate` calls fired over the registry's lifetime
    pub activations_fired: u64,
    /// `on_deactivate` calls fired over the registry's lifetime
    pub deactivations_fired: u64,
    /// Operations waiting in the deferred queue
    pub deferred_pending: usize,
}

/// Registry of context listeners and the dependencies between them
///
/// Construct one per graphics context and hand it (or a
/// [`SharedRegistry`](super::SharedRegistry)) to every resource constructor.
#[derive(Debug)]
pub struct ContextRegistry {
    pub(crate) listeners: ListenerMap<ListenerState>,
    pub(crate) alive: bool,
    pub(crate) context_generation: u64,
    pub(crate) counters: CallbackCounters,
    deferred: DeferredQueue,
    config: RegistryConfig,
}

impl ContextRegistry {
    /// Create an empty registry with the default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create an empty registry
    pub fn with_config(config: RegistryConfig) -> Self {
        log::debug!(
            "[{}] Creating context registry (capacity {})",
            config.name,
            config.initial_capacity
        );

        Self {
            listeners: ListenerMap::with_capacity_and_key(config.initial_capacity),
            alive: false,
            context_generation: 0,
            counters: CallbackCounters::default(),
            deferred: DeferredQueue::new(),
            config,
        }
    }

    /// Register a listener.
    ///
    /// If the context is active, `on_activate` fires before this returns.
    pub fn register(&mut self, callbacks: ListenerCallbacks) -> ListenerId {
        let id = self.listeners.insert(ListenerState::new(callbacks));
        log::debug!("[{}] Registered listener {}", self.config.name, self.describe(id));

        if self.alive {
            self.activate_chain(id);
        }
        id
    }

    /// Unregister a listener.
    ///
    /// A signaled listener is deactivated first, after everything that
    /// depends on it. Those dependers stay deactivated; see
    /// [`reactivate`](Self::reactivate).
    pub fn unregister(&mut self, id: ListenerId) -> ContextResult<()> {
        self.ensure_registered(id)?;

        if self.listeners.get(id).is_some_and(|state| state.signaled) {
            self.deactivate_chain(id);
        }

        let description = self.describe(id);
        let Some(state) = self.listeners.remove(id) else {
            return Err(self.not_registered(id));
        };

        for &depender in &state.dependers {
            if let Some(other) = self.listeners.get_mut(depender) {
                remove_id(&mut other.dependencies, id);
            }
        }
        for &dependency in &state.dependencies {
            if let Some(other) = self.listeners.get_mut(dependency) {
                remove_id(&mut other.dependers, id);
            }
        }

        log::debug!(
            "[{}] Unregistered listener {} ({} depender(s), {} dependenc(ies) detached)",
            self.config.name,
            description,
            state.dependers.len(),
            state.dependencies.len()
        );
        Ok(())
    }

    /// Declare that `master` needs `slave`.
    ///
    /// Fails without touching the graph if either id is unknown or the edge
    /// would close a cycle. While the context is active, `slave` and then
    /// `master` are brought up before this returns.
    pub fn add_dependency(&mut self, master: ListenerId, slave: ListenerId) -> ContextResult<()> {
        self.ensure_registered(master)?;
        self.ensure_registered(slave)?;
        self.ensure_acyclic(master, slave)?;

        if self.link(master, slave) {
            log::debug!(
                "[{}] {} now depends on {}",
                self.config.name,
                self.describe(master),
                self.describe(slave)
            );
        }

        if self.alive {
            self.activate_chain(slave);
            self.activate_chain(master);
        }
        Ok(())
    }

    /// Retract `master -> slave`. No callbacks fire.
    ///
    /// Returns whether the edge existed.
    pub fn remove_dependency(&mut self, master: ListenerId, slave: ListenerId) -> ContextResult<bool> {
        self.ensure_registered(master)?;
        self.ensure_registered(slave)?;

        let removed = self.unlink(master, slave);
        if removed {
            log::debug!(
                "[{}] {} no longer depends on {}",
                self.config.name,
                self.describe(master),
                self.describe(slave)
            );
        }
        Ok(removed)
    }

    /// Replace every dependency of `master` with `slaves`.
    ///
    /// All slaves are validated before anything changes, so a failure leaves
    /// the graph as it was. Dropped edges fire nothing; new edges behave like
    /// [`add_dependency`](Self::add_dependency).
    pub fn replace_dependencies(&mut self, master: ListenerId, slaves: &[ListenerId]) -> ContextResult<()> {
        self.ensure_registered(master)?;
        for &slave in slaves {
            self.ensure_registered(slave)?;
            self.ensure_acyclic(master, slave)?;
        }

        let old = self
            .listeners
            .get_mut(master)
            .map(|state| std::mem::take(&mut state.dependencies))
            .unwrap_or_default();
        for slave in old {
            if let Some(state) = self.listeners.get_mut(slave) {
                remove_id(&mut state.dependers, master);
            }
        }
        for &slave in slaves {
            self.link(master, slave);
        }

        log::debug!(
            "[{}] {} now depends on {} listener(s)",
            self.config.name,
            self.describe(master),
            slaves.len()
        );

        if self.alive {
            for &slave in slaves {
                self.activate_chain(slave);
            }
            self.activate_chain(master);
        }
        Ok(())
    }

    /// Bring `id` and everything it needs up if the context is active.
    ///
    /// Returns whether `id` is signaled afterwards.
    pub fn reactivate(&mut self, id: ListenerId) -> ContextResult<bool> {
        self.ensure_registered(id)?;
        if self.alive {
            self.activate_chain(id);
        }
        self.is_signaled(id)
    }

    /// Whether `id` refers to a live registration
    pub fn is_registered(&self, id: ListenerId) -> bool {
        self.listeners.contains_key(id)
    }

    /// Whether `id` has been activated and not yet deactivated
    pub fn is_signaled(&self, id: ListenerId) -> ContextResult<bool> {
        self.state(id).map(|state| state.signaled)
    }

    /// Whether the context is currently considered valid
    pub const fn is_active(&self) -> bool {
        self.alive
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Whether no listeners are registered
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }

    /// Ids of every registered listener, in iteration order
    pub fn ids(&self) -> impl Iterator<Item = ListenerId> + '_ {
        self.listeners.keys()
    }

    /// Listeners `id` needs
    pub fn dependencies(&self, id: ListenerId) -> ContextResult<&[ListenerId]> {
        self.state(id).map(|state| state.dependencies.as_slice())
    }

    /// Listeners that need `id`
    pub fn dependers(&self, id: ListenerId) -> ContextResult<&[ListenerId]> {
        self.state(id).map(|state| state.dependers.as_slice())
    }

    /// Label the listener was registered with
    pub fn label(&self, id: ListenerId) -> ContextResult<Option<&str>> {
        self.state(id).map(|state| state.callbacks.label())
    }

    /// Number of inactive -> active transitions so far
    pub const fn context_generation(&self) -> u64 {
        self.context_generation
    }

    /// Handle for queuing mutations from inside callbacks
    pub fn deferred(&self) -> DeferredQueue {
        self.deferred.clone()
    }

    /// Configuration the registry was built with
    pub const fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Current statistics
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            listeners: self.listeners.len(),
            signaled: self.listeners.values().filter(|state| state.signaled).count(),
            edges: self.listeners.values().map(|state| state.dependencies.len()).sum(),
            context_active: self.alive,
            context_generation: self.context_generation,
            activations_fired: self.counters.activations,
            deactivations_fired: self.counters.deactivations,
            deferred_pending: self.deferred.len(),
        }
    }

    pub(crate) fn describe(&self, id: ListenerId) -> String {
        match self.listeners.get(id).and_then(|state| state.callbacks.label()) {
            Some(label) => format!("'{}' {:?}", label, id),
            None => format!("{:?}", id),
        }
    }

    fn state(&self, id: ListenerId) -> ContextResult<&ListenerState> {
        self.listeners.get(id).ok_or_else(|| self.not_registered(id))
    }

    fn ensure_registered(&self, id: ListenerId) -> ContextResult<()> {
        if self.listeners.contains_key(id) {
            Ok(())
        } else {
            Err(self.not_registered(id))
        }
    }

    fn not_registered(&self, id: ListenerId) -> ContextError {
        log::error!("[{}] Listener {:?} is not registered", self.config.name, id);
        ContextError::NotRegistered { id }
    }

    fn ensure_acyclic(&self, master: ListenerId, slave: ListenerId) -> ContextResult<()> {
        if master == slave || self.reaches(slave, master) {
            log::error!(
                "[{}] Rejected dependency {} -> {}: would create a cycle",
                self.config.name,
                self.describe(master),
                self.describe(slave)
            );
            return Err(ContextError::CycleDetected { master, slave });
        }
        Ok(())
    }

    /// Whether `target` can be reached from `from` along dependency edges
    fn reaches(&self, from: ListenerId, target: ListenerId) -> bool {
        let mut visited = ListenerSet::new();
        let mut stack = vec![from];

        while let Some(id) = stack.pop() {
            if id == target {
                return true;
            }
            if visited.insert(id, ()).is_some() {
                continue;
            }
            if let Some(state) = self.listeners.get(id) {
                stack.extend(
                    state
                        .dependencies
                        .iter()
                        .copied()
                        .filter(|dep| !visited.contains_key(*dep)),
                );
            }
        }
        false
    }

    fn link(&mut self, master: ListenerId, slave: ListenerId) -> bool {
        let added = self
            .listeners
            .get_mut(master)
            .is_some_and(|state| insert_unique(&mut state.dependencies, slave));
        if added {
            if let Some(state) = self.listeners.get_mut(slave) {
                insert_unique(&mut state.dependers, master);
            }
        }
        added
    }

    fn unlink(&mut self, master: ListenerId, slave: ListenerId) -> bool {
        let removed = self
            .listeners
            .get_mut(master)
            .is_some_and(|state| remove_id(&mut state.dependencies, slave));
        if let Some(state) = self.listeners.get_mut(slave) {
            remove_id(&mut state.dependers, master);
        }
        removed
    }
}

impl Default for ContextRegistry {
    fn default() -> Self {
        Self::new()
    }
}
