//! Mock graphics device
//!
//! Hands out object names like a GL driver would and forgets all of them
//! when the context is lost. Misuse is recorded instead of panicking so the
//! demo can report every ordering mistake at the end of a run.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;
use thiserror::Error;

/// Kind of device object
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    /// Vertex, index, or uniform storage
    Buffer,
    /// Sampled image
    Texture,
    /// Linked shader program
    Shader,
    /// Vertex attribute bindings over one or more buffers
    VertexArray,
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Buffer => "buffer",
            Self::Texture => "texture",
            Self::Shader => "shader",
            Self::VertexArray => "vertex array",
        };
        f.write_str(name)
    }
}

/// Device misuse recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeviceError {
    /// An object was created or used while no context was current
    #[error("{kind} '{label}' touched the device without a current context")]
    NoContext {
        /// Kind of the offending object
        kind: ObjectKind,
        /// Label of the offending object
        label: String,
    },

    /// An object referenced a name the device does not know
    #[error("{kind} '{label}' used unknown object name {name}")]
    UnknownObject {
        /// Kind of the offending object
        kind: ObjectKind,
        /// Label of the offending object
        label: String,
        /// The stale name
        name: u32,
    },

    /// An object was set up while one of its inputs had no device object
    #[error("{kind} '{label}' was set up before its input '{input}'")]
    MissingInput {
        /// Kind of the offending object
        kind: ObjectKind,
        /// Label of the offending object
        label: String,
        /// Label of the input that was not live
        input: String,
    },

    /// Objects were still alive when the context went away
    #[error("{count} object(s) leaked across context loss")]
    Leaked {
        /// Number of leaked objects
        count: usize,
    },
}

/// Device counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeviceStats {
    /// Objects created over the run
    pub created: u64,
    /// Objects deleted over the run
    pub deleted: u64,
    /// Objects currently alive
    pub live: usize,
    /// Context losses so far
    pub losses: u64,
}

#[derive(Debug, Default)]
struct DeviceState {
    current: bool,
    next_name: u32,
    objects: HashMap<u32, ObjectKind>,
    errors: Vec<DeviceError>,
    stats: DeviceStats,
}

/// Cloneable handle to the mock device
#[derive(Debug, Clone, Default)]
pub struct MockDevice {
    state: Rc<RefCell<DeviceState>>,
}

impl MockDevice {
    /// Create a device with no current context
    pub fn new() -> Self {
        Self::default()
    }

    /// Make a fresh context current. No-op if one already is.
    pub fn restore(&self) {
        let mut state = self.state.borrow_mut();
        if !state.current {
            state.current = true;
            log::info!("Device: context restored");
        }
    }

    /// Drop the current context and every object in it. No-op if none is current.
    pub fn lose(&self) {
        let mut state = self.state.borrow_mut();
        if !state.current {
            return;
        }

        state.current = false;
        state.stats.losses += 1;
        let leaked = state.objects.len();
        state.objects.clear();
        if leaked > 0 {
            log::error!("Device: {} object(s) still alive at context loss", leaked);
            state.errors.push(DeviceError::Leaked { count: leaked });
        } else {
            log::info!("Device: context lost");
        }
    }

    /// Whether a context is current
    pub fn is_current(&self) -> bool {
        self.state.borrow().current
    }

    /// Allocate a device object
    pub fn create(&self, kind: ObjectKind, label: &str) -> Result<u32, DeviceError> {
        let mut state = self.state.borrow_mut();
        if !state.current {
            return Err(DeviceError::NoContext {
                kind,
                label: label.to_string(),
            });
        }

        state.next_name += 1;
        let name = state.next_name;
        state.objects.insert(name, kind);
        state.stats.created += 1;
        log::trace!("Device: created {} '{}' as #{}", kind, label, name);
        Ok(name)
    }

    /// Release a device object
    pub fn delete(&self, kind: ObjectKind, label: &str, name: u32) -> Result<(), DeviceError> {
        let mut state = self.state.borrow_mut();
        if !state.current {
            return Err(DeviceError::NoContext {
                kind,
                label: label.to_string(),
            });
        }
        if state.objects.remove(&name).is_none() {
            return Err(DeviceError::UnknownObject {
                kind,
                label: label.to_string(),
                name,
            });
        }

        state.stats.deleted += 1;
        log::trace!("Device: deleted {} '{}' (#{})", kind, label, name);
        Ok(())
    }

    /// Whether `name` is a live object of the current context
    pub fn is_live(&self, name: u32) -> bool {
        let state = self.state.borrow();
        state.current && state.objects.contains_key(&name)
    }

    /// Record misuse detected by a resource
    pub fn report(&self, error: DeviceError) {
        log::error!("Device: {}", error);
        self.state.borrow_mut().errors.push(error);
    }

    /// Every misuse recorded so far
    pub fn errors(&self) -> Vec<DeviceError> {
        self.state.borrow().errors.clone()
    }

    /// Current counters
    pub fn stats(&self) -> DeviceStats {
        let state = self.state.borrow();
        DeviceStats {
            live: state.objects.len(),
            ..state.stats
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_requires_context() {
        let device = MockDevice::new();
        assert!(matches!(
            device.create(ObjectKind::Buffer, "vbo"),
            Err(DeviceError::NoContext { .. })
        ));

        device.restore();
        let name = device.create(ObjectKind::Buffer, "vbo").unwrap();
        assert!(device.is_live(name));
        device.delete(ObjectKind::Buffer, "vbo", name).unwrap();
        assert!(!device.is_live(name));
    }

    #[test]
    fn test_loss_with_live_objects_is_a_leak() {
        let device = MockDevice::new();
        device.restore();
        let name = device.create(ObjectKind::Texture, "albedo").unwrap();

        device.lose();
        assert!(!device.is_live(name));
        assert_eq!(device.errors(), vec![DeviceError::Leaked { count: 1 }]);
        assert_eq!(device.stats().losses, 1);
    }

    #[test]
    fn test_double_delete_is_reported() {
        let device = MockDevice::new();
        device.restore();
        let name = device.create(ObjectKind::Shader, "basic").unwrap();
        device.delete(ObjectKind::Shader, "basic", name).unwrap();

        assert!(matches!(
            device.delete(ObjectKind::Shader, "basic", name),
            Err(DeviceError::UnknownObject { .. })
        ));
    }
}
