//! Configuration module for markcard
//!
//! This module handles conversion settings, including
//! serialization/deserialization to/from JSON and persistent storage to
//! platform-specific directories.

mod persistence;
mod settings;

pub use persistence::*;
pub use settings::*;
