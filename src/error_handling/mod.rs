//! Error handling and processing statistics.
//!
//! This module provides:
//! - Error type definitions for every crawl stage
//! - Categorization of those errors into counted `ErrorType`s
//! - Processing statistics tracking

mod categorization;
mod stats;
mod types;

// Re-export public API
pub use categorization::{categorize_parse_error, update_fetch_error_stats};
pub use stats::ProcessingStats;
pub use types::{
    DatabaseError, ErrorType, FailureClass, FetchError, InitializationError, InputError,
    LedgerError, ParseError,
};
