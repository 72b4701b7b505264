//! Crawl finalization and cleanup.

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::app::print_error_statistics;
use crate::crawl::CrawlSummary;
use crate::storage::{update_run_stats, RunStats};

use super::init::CrawlResources;
use super::CrawlReport;

/// Finalize a crawl run and produce the final report.
///
/// 1. Update run statistics in the database
/// 2. Checkpoint the WAL file
/// 3. Close the database pool
/// 4. Print error statistics
///
/// # Errors
///
/// Returns an error if the run statistics cannot be written.
pub(super) async fn finalize_crawl(
    resources: CrawlResources,
    summary: CrawlSummary,
    db_path: PathBuf,
) -> Result<CrawlReport> {
    let elapsed_seconds = resources.start_time.elapsed().as_secs_f64();

    let stats = RunStats {
        run_id: &resources.run_id,
        total_domains: count(resources.total_domains),
        dispatched_domains: count(summary.dispatched),
        stored_domains: count(summary.stored),
        failed_domains: count(summary.permanently_failed),
        deferred_domains: count(summary.deferred),
        elapsed_seconds,
    };
    update_run_stats(resources.store.pool(), &stats)
        .await
        .context("Failed to update run statistics")?;

    if let Err(e) = sqlx::query("PRAGMA wal_checkpoint(TRUNCATE)")
        .execute(resources.store.pool())
        .await
    {
        log::warn!("Failed to checkpoint WAL file (this is non-critical): {}", e);
    }

    resources.store.close().await;
    log::debug!("Database pool closed");

    print_error_statistics(&resources.stats);

    Ok(CrawlReport {
        total_domains: resources.total_domains,
        skipped_resolved: resources.skipped_resolved,
        skipped_failed: resources.skipped_failed,
        dispatched: summary.dispatched,
        stored: summary.stored,
        already_stored: summary.already_stored,
        permanently_failed: summary.permanently_failed,
        deferred: summary.deferred,
        db_path,
        run_id: resources.run_id,
        elapsed_seconds,
    })
}

fn count(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}
