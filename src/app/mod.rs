//! Progress and statistics reporting used by the crawl.

pub mod logging;
pub mod statistics;

// Re-export public API
pub use logging::log_progress;
pub use statistics::print_error_statistics;
