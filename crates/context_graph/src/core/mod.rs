//! # Core Module
//!
//! Shared configuration used by the registry, the host adapter, and
//! applications embedding them.

pub mod config;

// Re-export commonly used config types
pub use config::{Config, ConfigError, ContextConfig, LoggingConfig, RegistryConfig};
