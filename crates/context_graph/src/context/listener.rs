//! Listener callbacks
//!
//! The registry only ever needs two things from a resource: a way to
//! recreate its device-side state and a way to release it. Those are stored
//! as a pair of boxed closures so resource wrappers do not have to share a
//! base type.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Capability pair for resources that implement it as a type
///
/// Implementors are adapted into [`ListenerCallbacks`] with
/// [`ListenerCallbacks::from_listener`].
pub trait ContextListener {
    /// Recreate device-side state. The context is valid when this runs.
    fn on_activate(&mut self);

    /// Release device-side state. The context is still valid when this runs.
    fn on_deactivate(&mut self);
}

type Callback = Box<dyn FnMut()>;

/// The `on_activate` / `on_deactivate` pair handed to the registry
pub struct ListenerCallbacks {
    on_activate: Callback,
    on_deactivate: Callback,
    label: Option<String>,
}

impl ListenerCallbacks {
    /// Build a callback pair from two closures
    pub fn new(on_activate: impl FnMut() + 'static, on_deactivate: impl FnMut() + 'static) -> Self {
        Self {
            on_activate: Box::new(on_activate),
            on_deactivate: Box::new(on_deactivate),
            label: None,
        }
    }

    /// Callbacks that do nothing. Useful for pure ordering nodes.
    pub fn noop() -> Self {
        Self::new(|| {}, || {})
    }

    /// Adapt a shared [`ContextListener`] implementor
    pub fn from_listener<T: ContextListener + 'static>(listener: Rc<RefCell<T>>) -> Self {
        let deactivate = Rc::clone(&listener);
        Self::new(
            move || listener.borrow_mut().on_activate(),
            move || deactivate.borrow_mut().on_deactivate(),
        )
    }

    /// Attach a label shown in log output
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Label attached with [`with_label`](Self::with_label)
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn activate(&mut self) {
        (self.on_activate)();
    }

    pub(crate) fn deactivate(&mut self) {
        (self.on_deactivate)();
    }
}

impl fmt::Debug for ListenerCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerCallbacks")
            .field("label", &self.label)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[derive(Default)]
    struct Counter {
        activations: u32,
        deactivations: u32,
    }

    impl ContextListener for Counter {
        fn on_activate(&mut self) {
            self.activations += 1;
        }

        fn on_deactivate(&mut self) {
            self.deactivations += 1;
        }
    }

    #[test]
    fn test_closure_pair_is_invoked() {
        let hits = Rc::new(Cell::new(0));
        let (up, down) = (Rc::clone(&hits), Rc::clone(&hits));
        let mut callbacks = ListenerCallbacks::new(
            move || up.set(up.get() + 1),
            move || down.set(down.get() + 10),
        );

        callbacks.activate();
        callbacks.deactivate();
        assert_eq!(hits.get(), 11);
    }

    #[test]
    fn test_from_listener_forwards_to_trait() {
        let counter = Rc::new(RefCell::new(Counter::default()));
        let mut callbacks = ListenerCallbacks::from_listener(Rc::clone(&counter));

        callbacks.activate();
        callbacks.activate();
        callbacks.deactivate();

        assert_eq!(counter.borrow().activations, 2);
        assert_eq!(counter.borrow().deactivations, 1);
    }

    #[test]
    fn test_label() {
        let callbacks = ListenerCallbacks::noop().with_label("vertex_array");
        assert_eq!(callbacks.label(), Some("vertex_array"));
        assert!(format!("{:?}", callbacks).contains("vertex_array"));
    }
}
