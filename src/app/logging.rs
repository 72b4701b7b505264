//! Progress logging utilities.

use log::info;
use std::time::Instant;

/// Logs how many of the dispatched domains have completed, and the rate.
///
/// # Arguments
///
/// * `start_time` - When the crawl started
/// * `completed` - Domains with a final outcome so far
/// * `total` - Domains dispatched in this run
pub fn log_progress(start_time: Instant, completed: usize, total: usize) {
    let elapsed_secs = start_time.elapsed().as_secs_f64();
    let rate = if elapsed_secs > 0.0 {
        completed as f64 / elapsed_secs
    } else {
        0.0
    };
    info!(
        "Processed {}/{} domains in {:.2} seconds (~{:.2} domains/sec)",
        completed, total, elapsed_secs, rate
    );
}
