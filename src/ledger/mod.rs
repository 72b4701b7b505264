//! Shared append-only files written by the crawl.
//!
//! - `ActivityLog`: a human-readable block per processed domain
//! - `FailureLedger`: permanently failed domains, read back at the next run start

mod activity;
mod failure;

pub use activity::{ActivityLog, LogEntry};
pub use failure::FailureLedger;
