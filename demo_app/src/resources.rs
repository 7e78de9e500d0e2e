//! Device resource wrappers
//!
//! Each wrapper keeps its device-side name behind a shared cell and lets the
//! context registry recreate it. Vertex arrays declare their buffers as
//! dependencies, so the buffers always exist when the vertex array is set up
//! and still exist when it is torn down.

use std::cell::RefCell;
use std::rc::Rc;

use context_graph::prelude::*;

use crate::device::{DeviceError, MockDevice, ObjectKind};

#[derive(Debug)]
struct ObjectState {
    kind: ObjectKind,
    label: String,
    device: MockDevice,
    name: Option<u32>,
    inputs: Vec<Rc<RefCell<ObjectState>>>,
}

impl ObjectState {
    /// Report every input without a live device object
    fn check_inputs(&self) -> bool {
        let mut ok = true;
        for input in &self.inputs {
            let input = input.borrow();
            let live = input.name.is_some_and(|name| self.device.is_live(name));
            if !live {
                self.device.report(DeviceError::MissingInput {
                    kind: self.kind,
                    label: self.label.clone(),
                    input: input.label.clone(),
                });
                ok = false;
            }
        }
        ok
    }
}

impl ContextListener for ObjectState {
    fn on_activate(&mut self) {
        self.check_inputs();
        match self.device.create(self.kind, &self.label) {
            Ok(name) => self.name = Some(name),
            Err(err) => self.device.report(err),
        }
    }

    fn on_deactivate(&mut self) {
        // Inputs must outlive us on the device
        self.check_inputs();
        if let Some(name) = self.name.take() {
            if let Err(err) = self.device.delete(self.kind, &self.label, name) {
                self.device.report(err);
            }
        }
    }
}

/// A device object whose lifetime follows the context
#[derive(Debug)]
pub struct GpuResource {
    state: Rc<RefCell<ObjectState>>,
    guard: ListenerGuard,
}

impl GpuResource {
    /// Create and register a resource. It comes up immediately if the context is active.
    pub fn new(registry: &SharedRegistry, device: &MockDevice, kind: ObjectKind, label: impl Into<String>) -> Self {
        let label = label.into();
        let state = Rc::new(RefCell::new(ObjectState {
            kind,
            label: label.clone(),
            device: device.clone(),
            name: None,
            inputs: Vec::new(),
        }));
        let callbacks = ListenerCallbacks::from_listener(Rc::clone(&state)).with_label(label);
        let guard = ListenerGuard::register(registry, callbacks);

        Self { state, guard }
    }

    /// Convenience constructor for a buffer
    pub fn buffer(registry: &SharedRegistry, device: &MockDevice, label: impl Into<String>) -> Self {
        Self::new(registry, device, ObjectKind::Buffer, label)
    }

    /// Convenience constructor for a vertex array over `buffers`
    pub fn vertex_array(
        registry: &SharedRegistry,
        device: &MockDevice,
        label: impl Into<String>,
        buffers: &[&Self],
    ) -> ContextResult<Self> {
        let vertex_array = Self::new(registry, device, ObjectKind::VertexArray, label);
        vertex_array.set_inputs(buffers)?;
        Ok(vertex_array)
    }

    /// Replace the objects this one is built from.
    ///
    /// A live object re-checks its new inputs right away, like rebinding a
    /// vertex array to new buffers.
    pub fn set_inputs(&self, inputs: &[&Self]) -> ContextResult<()> {
        let guards: Vec<&ListenerGuard> = inputs.iter().map(|input| &input.guard).collect();
        let states = inputs.iter().map(|input| Rc::clone(&input.state)).collect();

        // Inputs go in first: rewiring may activate us on the spot
        let previous = std::mem::replace(&mut self.state.borrow_mut().inputs, states);
        if let Err(err) = self.guard.set_dependencies(&guards) {
            self.state.borrow_mut().inputs = previous;
            return Err(err);
        }

        let state = self.state.borrow();
        if state.name.is_some() {
            state.check_inputs();
        }
        Ok(())
    }

    /// Kind of the underlying object
    pub fn kind(&self) -> ObjectKind {
        self.state.borrow().kind
    }

    /// Label given at construction
    pub fn label(&self) -> String {
        self.state.borrow().label.clone()
    }

    /// Device name, `None` while the context is gone
    pub fn name(&self) -> Option<u32> {
        self.state.borrow().name
    }

    /// Registry identity
    pub const fn id(&self) -> ListenerId {
        self.guard.id()
    }

    /// Use the object for drawing. Returns whether it and its inputs were usable.
    pub fn bind(&self) -> bool {
        let state = self.state.borrow();
        let Some(name) = state.name else {
            return false;
        };
        if !state.device.is_live(name) {
            state.device.report(DeviceError::UnknownObject {
                kind: state.kind,
                label: state.label.clone(),
                name,
            });
            return false;
        }
        state.check_inputs()
    }
}
