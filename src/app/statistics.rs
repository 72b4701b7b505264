//! Statistics printing.

use log::info;
use strum::IntoEnumIterator;

use crate::error_handling::{ErrorType, ProcessingStats};

/// Prints the error counts collected during a crawl to the log.
///
/// Categories with a zero count are left out.
pub fn print_error_statistics(error_stats: &ProcessingStats) {
    let total_errors = error_stats.total_errors();
    if total_errors == 0 {
        return;
    }

    info!("Error Counts ({} total):", total_errors);
    for error_type in ErrorType::iter() {
        let count = error_stats.get_error_count(error_type);
        if count > 0 {
            info!("   {}: {}", error_type.as_str(), count);
        }
    }
}
