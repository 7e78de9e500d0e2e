//! Shared registry handle and RAII listener guards
//!
//! Resource wrappers usually want to register in their constructor and
//! unregister when they are dropped. [`ListenerGuard`] does that against a
//! [`SharedRegistry`], the single-threaded shared handle that the host
//! application creates once per graphics context.

use std::cell::{Ref, RefCell, RefMut};
use std::rc::{Rc, Weak};

use super::deferred::DeferredQueue;
use super::error::{ContextError, ContextResult};
use super::listener::ListenerCallbacks;
use super::registry::ContextRegistry;
use crate::core::config::RegistryConfig;
use crate::foundation::collections::ListenerId;

/// Single-threaded shared handle to a [`ContextRegistry`]
///
/// Cloning is cheap and every clone refers to the same registry.
#[derive(Debug, Clone)]
pub struct SharedRegistry {
    inner: Rc<RefCell<ContextRegistry>>,
    deferred: DeferredQueue,
}

impl SharedRegistry {
    /// Wrap a fresh registry with the default configuration
    pub fn new() -> Self {
        Self::from_registry(ContextRegistry::new())
    }

    /// Wrap a fresh registry
    pub fn with_config(config: RegistryConfig) -> Self {
        Self::from_registry(ContextRegistry::with_config(config))
    }

    /// Wrap an existing registry
    pub fn from_registry(registry: ContextRegistry) -> Self {
        let deferred = registry.deferred();
        Self {
            inner: Rc::new(RefCell::new(registry)),
            deferred,
        }
    }

    /// Immutable access.
    ///
    /// # Panics
    ///
    /// Panics if the registry is mutably borrowed, which is the case inside
    /// every listener callback.
    pub fn borrow(&self) -> Ref<'_, ContextRegistry> {
        self.inner.borrow()
    }

    /// Mutable access.
    ///
    /// # Panics
    ///
    /// Panics if the registry is already borrowed, which is the case inside
    /// every listener callback. Use [`deferred`](Self::deferred) there.
    pub fn borrow_mut(&self) -> RefMut<'_, ContextRegistry> {
        self.inner.borrow_mut()
    }

    /// Queue for mutations requested from inside callbacks
    pub fn deferred(&self) -> DeferredQueue {
        self.deferred.clone()
    }

    /// Forward to [`ContextRegistry::notify_active`]
    pub fn notify_active(&self) -> ContextResult<()> {
        self.borrow_mut().notify_active()
    }

    /// Forward to [`ContextRegistry::notify_inactive`]
    pub fn notify_inactive(&self) -> ContextResult<()> {
        self.borrow_mut().notify_inactive()
    }

    /// Forward to [`ContextRegistry::flush_deferred`]
    pub fn flush_deferred(&self) -> ContextResult<()> {
        self.borrow_mut().flush_deferred()
    }

    fn downgrade(&self) -> Weak<RefCell<ContextRegistry>> {
        Rc::downgrade(&self.inner)
    }
}

impl Default for SharedRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registration that lives exactly as long as this value
///
/// Dropping the guard unregisters the listener, deactivating it (and its
/// dependers first) if it was signaled. A guard dropped from inside a
/// callback cannot reach the registry, so its unregistration is queued on the
/// deferred queue instead. Guards owned by the callbacks of a dropped guard
/// fall in that case too; the outer drop flushes the queue, so they are gone
/// by the time it returns. A guard outliving its registry does nothing on drop.
#[derive(Debug)]
pub struct ListenerGuard {
    id: ListenerId,
    registry: Weak<RefCell<ContextRegistry>>,
    deferred: DeferredQueue,
}

impl ListenerGuard {
    /// Register `callbacks` and hold the registration.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a listener callback of the same registry.
    pub fn register(registry: &SharedRegistry, callbacks: ListenerCallbacks) -> Self {
        let id = registry.borrow_mut().register(callbacks);
        Self {
            id,
            registry: registry.downgrade(),
            deferred: registry.deferred(),
        }
    }

    /// Identity of the held registration
    pub const fn id(&self) -> ListenerId {
        self.id
    }

    /// Declare that this listener needs `other`
    ///
    /// # Panics
    ///
    /// Panics if called from inside a listener callback of the same registry.
    pub fn depend_on(&self, other: &Self) -> ContextResult<()> {
        self.with_registry(|registry| registry.add_dependency(self.id, other.id))
    }

    /// Retract a dependency on `other`. Returns whether it existed.
    ///
    /// # Panics
    ///
    /// Panics if called from inside a listener callback of the same registry.
    pub fn release_dependency(&self, other: &Self) -> ContextResult<bool> {
        self.with_registry(|registry| registry.remove_dependency(self.id, other.id))
    }

    /// Replace all dependencies of this listener
    ///
    /// # Panics
    ///
    /// Panics if called from inside a listener callback of the same registry.
    pub fn set_dependencies(&self, others: &[&Self]) -> ContextResult<()> {
        let slaves: Vec<ListenerId> = others.iter().map(|guard| guard.id).collect();
        self.with_registry(|registry| registry.replace_dependencies(self.id, &slaves))
    }

    /// Whether the listener is currently signaled.
    ///
    /// `None` while the registry is busy, which is the case inside every
    /// listener callback. `Some(false)` once the registry is gone.
    pub fn is_signaled(&self) -> Option<bool> {
        let Some(registry) = self.registry.upgrade() else {
            return Some(false);
        };
        let signaled = registry
            .try_borrow()
            .ok()
            .map(|registry| registry.is_signaled(self.id).unwrap_or(false));
        signaled
    }

    fn with_registry<R>(
        &self,
        f: impl FnOnce(&mut ContextRegistry) -> ContextResult<R>,
    ) -> ContextResult<R> {
        let Some(registry) = self.registry.upgrade() else {
            log::error!("Registry for listener {:?} has been dropped", self.id);
            return Err(ContextError::NotRegistered { id: self.id });
        };
        let mut registry = registry.borrow_mut();
        f(&mut registry)
    }
}

impl Drop for ListenerGuard {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };

        match registry.try_borrow_mut() {
            Ok(mut registry) => {
                if registry.is_registered(self.id) {
                    if let Err(err) = registry.unregister(self.id) {
                        log::warn!("Failed to unregister dropped listener: {}", err);
                    }
                }
                // Guards released along with our callbacks could only queue themselves
                if let Err(err) = registry.flush_deferred() {
                    log::warn!("Failed to apply deferred operations after drop: {}", err);
                }
            }
            Err(_) => {
                log::debug!(
                    "Registry busy, deferring unregistration of dropped listener {:?}",
                    self.id
                );
                self.deferred.unregister(self.id);
            }
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    fn counting(hits: &Rc<Cell<i32>>) -> ListenerCallbacks {
        let (up, down) = (Rc::clone(hits), Rc::clone(hits));
        ListenerCallbacks::new(move || up.set(up.get() + 1), move || down.set(down.get() - 1))
    }

    #[test]
    fn test_guard_registers_and_unregisters() {
        let registry = SharedRegistry::new();
        let live = Rc::new(Cell::new(0));

        let guard = ListenerGuard::register(&registry, counting(&live));
        let id = guard.id();
        assert!(registry.borrow().is_registered(id));

        registry.notify_active().unwrap();
        assert_eq!(live.get(), 1);
        assert_eq!(guard.is_signaled(), Some(true));

        drop(guard);
        assert_eq!(live.get(), 0);
        assert!(!registry.borrow().is_registered(id));
    }

    #[test]
    fn test_guard_dependencies() {
        let registry = SharedRegistry::new();
        let buffer = ListenerGuard::register(&registry, ListenerCallbacks::noop());
        let other = ListenerGuard::register(&registry, ListenerCallbacks::noop());
        let vao = ListenerGuard::register(&registry, ListenerCallbacks::noop());

        vao.depend_on(&buffer).unwrap();
        assert_eq!(registry.borrow().dependencies(vao.id()).unwrap(), &[buffer.id()]);

        vao.set_dependencies(&[&other, &buffer]).unwrap();
        assert_eq!(
            registry.borrow().dependencies(vao.id()).unwrap(),
            &[other.id(), buffer.id()]
        );

        assert_eq!(vao.release_dependency(&other), Ok(true));
        assert_eq!(
            buffer.depend_on(&vao),
            Err(ContextError::CycleDetected { master: buffer.id(), slave: vao.id() })
        );
    }

    #[test]
    fn test_dropping_a_dependency_tears_down_dependers_first() {
        let registry = SharedRegistry::new();
        let order = Rc::new(RefCell::new(Vec::new()));
        let named = |name: &'static str| {
            let order = Rc::clone(&order);
            ListenerCallbacks::new(|| {}, move || order.borrow_mut().push(name))
        };

        let buffer = ListenerGuard::register(&registry, named("buffer"));
        let vao = ListenerGuard::register(&registry, named("vao"));
        vao.depend_on(&buffer).unwrap();
        registry.notify_active().unwrap();

        drop(buffer);
        assert_eq!(*order.borrow(), vec!["vao", "buffer"]);
        assert_eq!(vao.is_signaled(), Some(false));
        assert!(registry.borrow().dependencies(vao.id()).unwrap().is_empty());
    }

    #[test]
    fn test_guard_dropped_inside_callback_is_deferred() {
        let registry = SharedRegistry::new();
        let slot: Rc<RefCell<Option<ListenerGuard>>> = Rc::new(RefCell::new(None));

        let victim = ListenerGuard::register(&registry, ListenerCallbacks::noop());
        let victim_id = victim.id();
        *slot.borrow_mut() = Some(victim);

        let taken = Rc::clone(&slot);
        let _killer = ListenerGuard::register(
            &registry,
            ListenerCallbacks::new(move || drop(taken.borrow_mut().take()), || {}),
        );

        registry.notify_active().unwrap();
        assert!(slot.borrow().is_none());
        assert!(!registry.borrow().is_registered(victim_id));
        assert!(registry.deferred().is_empty());
    }

    #[test]
    fn test_guard_owned_by_another_listener_goes_with_it() {
        let registry = SharedRegistry::new();
        registry.notify_active().unwrap();

        let child_live = Rc::new(Cell::new(0));
        let child = ListenerGuard::register(&registry, counting(&child_live));
        let child_id = child.id();
        assert_eq!(child_live.get(), 1);

        let parent = ListenerGuard::register(
            &registry,
            ListenerCallbacks::new(move || assert_eq!(child.id(), child_id), || {}),
        );

        drop(parent);
        assert_eq!(child_live.get(), 0);
        assert!(!registry.borrow().is_registered(child_id));
        assert!(registry.deferred().is_empty());
        assert!(registry.borrow().is_empty());
    }

    #[test]
    fn test_is_signaled_is_unknown_inside_callbacks() {
        let registry = SharedRegistry::new();
        let seen = Rc::new(Cell::new(Some(true)));
        let slot: Rc<RefCell<Option<ListenerGuard>>> = Rc::new(RefCell::new(None));

        let (observed, record) = (Rc::clone(&slot), Rc::clone(&seen));
        let watcher = ListenerGuard::register(
            &registry,
            ListenerCallbacks::new(
                move || {
                    if let Some(guard) = observed.borrow().as_ref() {
                        record.set(guard.is_signaled());
                    }
                },
                || {},
            ),
        );
        *slot.borrow_mut() = Some(ListenerGuard::register(&registry, ListenerCallbacks::noop()));

        registry.notify_active().unwrap();
        assert_eq!(seen.get(), None);
        assert_eq!(watcher.is_signaled(), Some(true));
    }

    #[test]
    fn test_guard_outliving_registry() {
        let registry = SharedRegistry::new();
        let guard = ListenerGuard::register(&registry, ListenerCallbacks::noop());
        drop(registry);

        assert_eq!(guard.is_signaled(), Some(false));
        assert_eq!(
            guard.release_dependency(&guard),
            Err(ContextError::NotRegistered { id: guard.id() })
        );
        drop(guard);
    }
}
