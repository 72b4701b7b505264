//! Application configuration and constants.
//!
//! This module provides:
//! - Configuration constants (timeouts, retry parameters, file locations)
//! - CLI option types and parsing

mod constants;
mod types;

// Re-export all constants
pub use constants::*;
pub use types::{Config, HandshakePolicy, LogFormat, LogLevel};
