//! # Unified Configuration System
//!
//! Configuration for the context registry and the logging setup around it.
//! Everything here is plain data: serializable to TOML or RON through the
//! [`Config`] trait, with builder-style setters and sensible defaults.
//!
//! ## Configuration Categories
//!
//! - **Logging Config**: default log filter for `env_logger`
//! - **Registry Config**: preallocation and per-callback tracing

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

const LOG_LEVELS: [&str; 6] = ["off", "error", "warn", "info", "debug", "trace"];

/// # Logging Configuration
///
/// Default filter handed to `env_logger`. `RUST_LOG` overrides it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level for the crate (`off`, `error`, `warn`, `info`, `debug`, `trace`)
    pub level: String,
}

impl LoggingConfig {
    /// Create a new logging configuration
    pub fn new() -> Self {
        Self {
            level: "info".to_string(),
        }
    }

    /// Set log level
    #[must_use]
    pub fn with_level(mut self, level: impl Into<String>) -> Self {
        self.level = level.into();
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.to_ascii_lowercase();
        if LOG_LEVELS.contains(&level.as_str()) {
            Ok(())
        } else {
            Err(ConfigError::Invalid(format!("Unknown log level: {}", self.level)))
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Registry Configuration
///
/// Tuning knobs for a [`ContextRegistry`](crate::context::ContextRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Name used to tell registries apart in log output
    pub name: String,
    /// Number of listener slots to preallocate
    pub initial_capacity: usize,
    /// Log every fired callback at `trace` level
    pub trace_callbacks: bool,
}

impl RegistryConfig {
    /// Create a new registry configuration
    pub fn new() -> Self {
        Self {
            name: "context".to_string(),
            initial_capacity: 64,
            trace_callbacks: cfg!(debug_assertions),
        }
    }

    /// Set the registry name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the number of preallocated listener slots
    #[must_use]
    pub fn with_initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Enable or disable per-callback tracing
    #[must_use]
    pub fn with_trace_callbacks(mut self, enabled: bool) -> Self {
        self.trace_callbacks = enabled;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Invalid("Registry name cannot be empty".to_string()));
        }

        Ok(())
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// # Complete Configuration
///
/// Top-level configuration, the structure applications load from disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Registry configuration
    pub registry: RegistryConfig,
}

impl ContextConfig {
    /// Create a configuration with defaults for every section
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the logging section
    #[must_use]
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// Replace the registry section
    #[must_use]
    pub fn with_registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }
}

impl Config for ContextConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        self.logging.validate()?;
        self.registry.validate()
    }
}
