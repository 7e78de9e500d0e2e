//! Scenario tests for the context registry

mod random_graphs;

use std::cell::RefCell;
use std::rc::Rc;

use super::ListenerCallbacks;
use crate::foundation::logging;

/// Ordered record of fired callbacks, shared by every listener in a test
#[derive(Debug, Clone, Default)]
pub(super) struct CallbackLog {
    events: Rc<RefCell<Vec<String>>>,
}

impl CallbackLog {
    /// Fresh log; also routes registry logging through the test harness
    pub(super) fn new() -> Self {
        logging::try_init_for_tests();
        Self::default()
    }

    pub(super) fn listener(&self, name: impl Into<String>) -> ListenerCallbacks {
        let name = name.into();
        let (up, down) = (self.clone(), self.clone());
        let (up_name, down_name) = (name.clone(), name.clone());
        ListenerCallbacks::new(
            move || up.push(format!("{up_name}.on_activate")),
            move || down.push(format!("{down_name}.on_deactivate")),
        )
        .with_label(name)
    }

    pub(super) fn push(&self, event: String) {
        self.events.borrow_mut().push(event);
    }

    pub(super) fn take(&self) -> Vec<String> {
        std::mem::take(&mut *self.events.borrow_mut())
    }

    pub(super) fn position(&self, event: &str) -> Option<usize> {
        self.events.borrow().iter().position(|e| e == event)
    }

    pub(super) fn count(&self, event: &str) -> usize {
        self.events.borrow().iter().filter(|e| *e == event).count()
    }

    pub(super) fn len(&self) -> usize {
        self.events.borrow().len()
    }
}
