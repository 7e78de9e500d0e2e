//! Logging utilities and structured logging support

pub use log::{debug, error, info, trace, warn};

use crate::core::config::LoggingConfig;

/// Initialize the logging system with a default filter.
///
/// `RUST_LOG` still takes precedence when it is set. Calling this twice is
/// harmless; the second call is ignored.
pub fn init_with_level(level: &str) {
    let env = env_logger::Env::default().default_filter_or(level);
    if env_logger::Builder::from_env(env).try_init().is_err() {
        log::debug!("Logger already initialized, ignoring level '{}'", level);
    }
}

/// Initialize the logging system from a [`LoggingConfig`]
pub fn init_from_config(config: &LoggingConfig) {
    init_with_level(&config.level);
}

/// Route log output through the test harness' captured stdout
pub fn try_init_for_tests() {
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("trace"))
        .is_test(true)
        .try_init();
}
