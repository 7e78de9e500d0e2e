//! # Context Graph
//!
//! Lifecycle management for resources bound to a graphics context that can
//! be lost and recreated while the process keeps running.
//!
//! ## Features
//!
//! - **Dependency Ordering**: resources come up after what they need and go
//!   down before it
//! - **Idempotent Signaling**: at most one callback per transition, however
//!   often the host repeats itself
//! - **Live Rewiring**: registering or rewiring while the context is valid
//!   takes effect immediately
//! - **Stable Handles**: generation-checked ids instead of pointers
//!
//! ## Quick Start
//!
//! ```rust
//! use context_graph::prelude::*;
//!
//! fn main() -> Result<(), ContextError> {
//!     let mut registry = ContextRegistry::new();
//!
//!     let buffer = registry.register(ListenerCallbacks::new(
//!         || println!("create buffer"),
//!         || println!("delete buffer"),
//!     ));
//!     let vertex_array = registry.register(ListenerCallbacks::new(
//!         || println!("create vertex array"),
//!         || println!("delete vertex array"),
//!     ));
//!     registry.add_dependency(vertex_array, buffer)?;
//!
//!     registry.notify_active()?;   // buffer, then vertex array
//!     registry.notify_inactive()?; // vertex array, then buffer
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod context;
pub mod core;
pub mod foundation;
pub mod host;

/// Common imports for users of the crate
pub mod prelude {
    pub use crate::{
        context::{
            ContextError, ContextListener, ContextRegistry, ContextResult, DeferredQueue,
            ListenerCallbacks, ListenerGuard, ListenerId, PendingListener, RegistryStats,
            SharedRegistry,
        },
        core::config::{Config, ConfigError, ContextConfig, LoggingConfig, RegistryConfig},
        host::{ContextHost, HostEvent},
    };
}
