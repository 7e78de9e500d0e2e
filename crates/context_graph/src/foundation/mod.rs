//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Slot-map backed identities and adjacency helpers
//! - Logging setup

pub mod collections;
pub mod logging;
