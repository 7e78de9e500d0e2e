//! Deferred registry mutations
//!
//! Callbacks run while the registry is mutably borrowed, so they cannot touch
//! it directly. Anything they need to change (a resource created from inside
//! `on_activate`, a guard dropped from inside `on_deactivate`) goes through a
//! [`DeferredQueue`] instead and is applied after the running pass.
//!
//! ```text
//! notify_active()
//!     ├── snapshot ids
//!     ├── activate_chain(..) for each      <- callbacks push into the queue
//!     └── flush_deferred()                 <- queue applied in FIFO order
//! ```

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use super::error::ContextResult;
use super::listener::ListenerCallbacks;
use super::registry::ContextRegistry;
use crate::foundation::collections::ListenerId;

/// One queued registry mutation
#[derive(Debug)]
pub(crate) enum DeferredOp {
    Register {
        callbacks: ListenerCallbacks,
        pending: PendingListener,
    },
    Unregister(ListenerId),
    AddDependency {
        master: ListenerId,
        slave: ListenerId,
    },
    RemoveDependency {
        master: ListenerId,
        slave: ListenerId,
    },
}

/// Id slot filled in once a deferred registration is applied
#[derive(Debug, Clone, Default)]
pub struct PendingListener {
    id: Rc<Cell<Option<ListenerId>>>,
}

impl PendingListener {
    /// The registered id, or `None` while the registration is still queued
    pub fn id(&self) -> Option<ListenerId> {
        self.id.get()
    }

    /// Whether the registration has been applied
    pub fn is_applied(&self) -> bool {
        self.id.get().is_some()
    }

    fn resolve(&self, id: ListenerId) {
        self.id.set(Some(id));
    }
}

/// Cloneable handle for queuing registry mutations from inside callbacks
#[derive(Debug, Clone, Default)]
pub struct DeferredQueue {
    ops: Rc<RefCell<VecDeque<DeferredOp>>>,
}

impl DeferredQueue {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue a registration
    pub fn register(&self, callbacks: ListenerCallbacks) -> PendingListener {
        let pending = PendingListener::default();
        self.push(DeferredOp::Register {
            callbacks,
            pending: pending.clone(),
        });
        pending
    }

    /// Queue an unregistration
    pub fn unregister(&self, id: ListenerId) {
        self.push(DeferredOp::Unregister(id));
    }

    /// Queue `master -> slave`
    pub fn add_dependency(&self, master: ListenerId, slave: ListenerId) {
        self.push(DeferredOp::AddDependency { master, slave });
    }

    /// Queue removal of `master -> slave`
    pub fn remove_dependency(&self, master: ListenerId, slave: ListenerId) {
        self.push(DeferredOp::RemoveDependency { master, slave });
    }

    /// Number of queued operations
    pub fn len(&self) -> usize {
        self.ops.borrow().len()
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.ops.borrow().is_empty()
    }

    fn push(&self, op: DeferredOp) {
        self.ops.borrow_mut().push_back(op);
    }

    fn pop(&self) -> Option<DeferredOp> {
        self.ops.borrow_mut().pop_front()
    }
}

impl ContextRegistry {
    /// Apply every queued deferred operation in FIFO order.
    ///
    /// Operations queued while flushing are applied in the same flush. The
    /// first failing operation stops the flush; it is dropped and the rest
    /// stay queued.
    pub fn flush_deferred(&mut self) -> ContextResult<()> {
        let queue = self.deferred();
        let mut applied = 0_usize;

        while let Some(op) = queue.pop() {
            let result = match op {
                DeferredOp::Register { callbacks, pending } => {
                    pending.resolve(self.register(callbacks));
                    Ok(())
                }
                DeferredOp::Unregister(id) => self.unregister(id),
                DeferredOp::AddDependency { master, slave } => self.add_dependency(master, slave),
                DeferredOp::RemoveDependency { master, slave } => {
                    self.remove_dependency(master, slave).map(|_| ())
                }
            };

            if let Err(err) = result {
                log::error!(
                    "[{}] Deferred operation failed after {} applied ({} still queued): {}",
                    self.config().name,
                    applied,
                    queue.len(),
                    err
                );
                return Err(err);
            }
            applied += 1;
        }

        if applied > 0 {
            log::debug!("[{}] Applied {} deferred operation(s)", self.config().name, applied);
        }
        Ok(())
    }
}
