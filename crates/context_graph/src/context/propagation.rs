//! Activation and deactivation propagation
//!
//! Both chains are depth-first walks with an explicit stack, so a dependency
//! chain thousands of listeners long costs heap, not call stack.
//!
//! - activation: dependencies first, then the listener itself
//! - deactivation: dependers first, then the listener itself
//!
//! Both are idempotent: a listener already in the target state is skipped,
//! which is what keeps every callback to at most once per transition.

use super::error::ContextResult;
use super::registry::ContextRegistry;
use crate::foundation::collections::ListenerId;

/// Step of a depth-first walk
#[derive(Debug, Clone, Copy)]
enum Visit {
    /// Schedule the listener's neighbours, then come back to it
    Enter(ListenerId),
    /// Neighbours are done; fire the listener's own callback
    Finish(ListenerId),
}

impl ContextRegistry {
    /// The context became valid: activate every registered listener.
    ///
    /// Covers the listeners registered when the call starts. Registrations
    /// queued on the [`DeferredQueue`](super::DeferredQueue) during the pass
    /// are applied afterwards, and since the context is active by then they
    /// come up immediately.
    pub fn notify_active(&mut self) -> ContextResult<()> {
        if self.alive {
            log::debug!("[{}] Context already active", self.config().name);
        } else {
            self.alive = true;
            self.context_generation += 1;
            log::info!(
                "[{}] Context active (generation {}), activating {} listener(s)",
                self.config().name,
                self.context_generation,
                self.listeners.len()
            );
        }

        let snapshot: Vec<ListenerId> = self.listeners.keys().collect();
        for id in snapshot {
            if self.listeners.contains_key(id) {
                self.activate_chain(id);
            }
        }

        self.flush_deferred()
    }

    /// The context became invalid: deactivate every registered listener.
    ///
    /// Registrations queued during the pass are applied afterwards and stay
    /// inactive until the next [`notify_active`](Self::notify_active).
    pub fn notify_inactive(&mut self) -> ContextResult<()> {
        if self.alive {
            log::info!(
                "[{}] Context lost, deactivating {} listener(s)",
                self.config().name,
                self.listeners.len()
            );
        } else {
            log::debug!("[{}] Context already inactive", self.config().name);
        }

        let snapshot: Vec<ListenerId> = self.listeners.keys().collect();
        for id in snapshot {
            if self.listeners.contains_key(id) {
                self.deactivate_chain(id);
            }
        }
        self.alive = false;

        self.flush_deferred()
    }

    /// Activate `root` after everything it transitively needs
    pub(crate) fn activate_chain(&mut self, root: ListenerId) {
        let mut stack = vec![Visit::Enter(root)];

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    let Some(state) = self.listeners.get(id) else {
                        debug_assert!(false, "dangling dependency edge to {:?}", id);
                        continue;
                    };
                    if state.signaled {
                        continue;
                    }

                    stack.push(Visit::Finish(id));
                    // Reversed so the first declared dependency comes up first
                    stack.extend(
                        state
                            .dependencies
                            .iter()
                            .rev()
                            .filter(|&&dep| !self.listeners.get(dep).is_some_and(|s| s.signaled))
                            .map(|&dep| Visit::Enter(dep)),
                    );
                }
                Visit::Finish(id) => self.fire_activate(id),
            }
        }
    }

    /// Deactivate `root` after everything that transitively needs it
    pub(crate) fn deactivate_chain(&mut self, root: ListenerId) {
        let mut stack = vec![Visit::Enter(root)];

        while let Some(visit) = stack.pop() {
            match visit {
                Visit::Enter(id) => {
                    let Some(state) = self.listeners.get(id) else {
                        debug_assert!(false, "dangling depender edge to {:?}", id);
                        continue;
                    };
                    if !state.signaled {
                        continue;
                    }

                    stack.push(Visit::Finish(id));
                    stack.extend(
                        state
                            .dependers
                            .iter()
                            .rev()
                            .filter(|&&dep| self.listeners.get(dep).is_some_and(|s| s.signaled))
                            .map(|&dep| Visit::Enter(dep)),
                    );
                }
                Visit::Finish(id) => self.fire_deactivate(id),
            }
        }
    }

    fn fire_activate(&mut self, id: ListenerId) {
        let trace = self.config().trace_callbacks;
        let description = if trace { Some(self.describe(id)) } else { None };
        let Some(state) = self.listeners.get_mut(id) else {
            return;
        };
        if state.signaled {
            return;
        }

        state.signaled = true;
        if let Some(description) = description {
            log::trace!("on_activate {}", description);
        }
        state.callbacks.activate();
        self.counters.activations += 1;
    }

    fn fire_deactivate(&mut self, id: ListenerId) {
        let trace = self.config().trace_callbacks;
        let description = if trace { Some(self.describe(id)) } else { None };
        let Some(state) = self.listeners.get_mut(id) else {
            return;
        };
        if !state.signaled {
            return;
        }

        if let Some(description) = description {
            log::trace!("on_deactivate {}", description);
        }
        state.callbacks.deactivate();
        state.signaled = false;
        self.counters.deactivations += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ListenerCallbacks;
    use std::cell::RefCell;
    use std::rc::Rc;

    type Log = Rc<RefCell<Vec<String>>>;

    fn recording(log: &Log, name: &'static str) -> ListenerCallbacks {
        let (up, down) = (Rc::clone(log), Rc::clone(log));
        ListenerCallbacks::new(
            move || up.borrow_mut().push(format!("{name}+")),
            move || down.borrow_mut().push(format!("{name}-")),
        )
    }

    #[test]
    fn test_generation_counts_real_transitions() {
        let mut registry = ContextRegistry::new();
        registry.notify_active().unwrap();
        registry.notify_active().unwrap();
        assert_eq!(registry.context_generation(), 1);

        registry.notify_inactive().unwrap();
        registry.notify_inactive().unwrap();
        registry.notify_active().unwrap();
        assert_eq!(registry.context_generation(), 2);
        assert!(registry.is_active());
    }

    #[test]
    fn test_dependencies_come_up_in_declaration_order() {
        let log = Log::default();
        let mut registry = ContextRegistry::new();
        let vao = registry.register(recording(&log, "vao"));
        let vbo = registry.register(recording(&log, "vbo"));
        let ibo = registry.register(recording(&log, "ibo"));
        registry.add_dependency(vao, vbo).unwrap();
        registry.add_dependency(vao, ibo).unwrap();

        registry.activate_chain(vao);
        assert_eq!(*log.borrow(), vec!["vbo+", "ibo+", "vao+"]);
    }

    #[test]
    fn test_shared_dependency_fires_once() {
        let log = Log::default();
        let mut registry = ContextRegistry::new();
        let top = registry.register(recording(&log, "top"));
        let left = registry.register(recording(&log, "left"));
        let right = registry.register(recording(&log, "right"));
        let base = registry.register(recording(&log, "base"));
        registry.add_dependency(top, left).unwrap();
        registry.add_dependency(top, right).unwrap();
        registry.add_dependency(left, base).unwrap();
        registry.add_dependency(right, base).unwrap();

        registry.activate_chain(top);
        assert_eq!(*log.borrow(), vec!["base+", "left+", "right+", "top+"]);

        log.borrow_mut().clear();
        registry.deactivate_chain(base);
        assert_eq!(*log.borrow(), vec!["top-", "left-", "right-", "base-"]);
    }

    #[test]
    fn test_chains_are_idempotent() {
        let log = Log::default();
        let mut registry = ContextRegistry::new();
        let a = registry.register(recording(&log, "a"));

        registry.deactivate_chain(a);
        registry.activate_chain(a);
        registry.activate_chain(a);
        registry.deactivate_chain(a);
        registry.deactivate_chain(a);
        assert_eq!(*log.borrow(), vec!["a+", "a-"]);

        let stats = registry.stats();
        assert_eq!(stats.activations_fired, 1);
        assert_eq!(stats.deactivations_fired, 1);
    }

    #[test]
    fn test_deactivation_sees_dependency_still_live() {
        // The depender's teardown runs while its dependency is still signaled
        let observed = Rc::new(RefCell::new(Vec::new()));
        let buffer_live = Rc::new(RefCell::new(false));

        let mut registry = ContextRegistry::new();
        let (up, down) = (Rc::clone(&buffer_live), Rc::clone(&buffer_live));
        let buffer = registry.register(ListenerCallbacks::new(
            move || *up.borrow_mut() = true,
            move || *down.borrow_mut() = false,
        ));
        let (seen_up, seen_down) = (Rc::clone(&observed), Rc::clone(&observed));
        let (live_up, live_down) = (Rc::clone(&buffer_live), Rc::clone(&buffer_live));
        let vao = registry.register(ListenerCallbacks::new(
            move || seen_up.borrow_mut().push(*live_up.borrow()),
            move || seen_down.borrow_mut().push(*live_down.borrow()),
        ));
        registry.add_dependency(vao, buffer).unwrap();

        registry.notify_active().unwrap();
        registry.notify_inactive().unwrap();
        assert_eq!(*observed.borrow(), vec![true, true]);
        assert!(!*buffer_live.borrow());
    }
}
