//! Crawl orchestration.
//!
//! `run_crawl` wires every component together for one run: storage, the
//! resolution index, the fetcher and parser, the ledgers and the worker pool.

mod finalize;
mod init;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use log::info;

use crate::config::Config;
use crate::crawl::{crawl, CrawlContext, CrawlLedgers, CrawlOptions};

use finalize::finalize_crawl;
use init::init_crawl_resources;

/// Results of a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Distinct domains read from the input file
    pub total_domains: usize,
    /// Domains skipped because the store already held them at startup
    pub skipped_resolved: usize,
    /// Domains skipped because the failure ledger listed them at startup
    pub skipped_failed: usize,
    /// Domains handed to the worker pool
    pub dispatched: usize,
    /// Certificates written in this run
    pub stored: usize,
    /// Domains found in the store by their worker
    pub already_stored: usize,
    /// Domains added to the failure ledger in this run
    pub permanently_failed: usize,
    /// Domains left unresolved for a later run (storage error or worker crash)
    pub deferred: usize,
    /// Path to the SQLite database holding the certificates
    pub db_path: PathBuf,
    /// Run identifier (format: `run_<timestamp_millis>`)
    pub run_id: String,
    /// Elapsed time in seconds
    pub elapsed_seconds: f64,
}

/// Runs one crawl with the provided configuration.
///
/// Reads the domain list, skips every domain resolved by an earlier run,
/// fetches and parses the leaf certificate of the rest with a bounded pool of
/// workers and stores the parsed records.
///
/// # Errors
///
/// Fails before any domain is dispatched if the configuration is invalid,
/// the input cannot be read, or the database or ledger files cannot be
/// opened. Per-domain failures never make the run fail.
///
/// # Example
///
/// ```no_run
/// use cert_crawler::{run_crawl, Config};
/// use std::path::PathBuf;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Config {
///     file: PathBuf::from("domains.csv"),
///     ..Default::default()
/// };
/// let report = run_crawl(config).await?;
/// println!("Stored {} certificates", report.stored);
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlReport> {
    let mut resources = init_crawl_resources(&config).await?;

    info!(
        "Dispatching {} of {} domains ({} already stored, {} previously failed)",
        resources.domains.len(),
        resources.total_domains,
        resources.skipped_resolved,
        resources.skipped_failed
    );

    let ctx = Arc::new(CrawlContext::new(
        Arc::clone(&resources.fetcher),
        Arc::clone(&resources.parser),
        resources.store.clone(),
        resources.retry.clone(),
        Arc::clone(&resources.stats),
    ));

    let domains = std::mem::take(&mut resources.domains);
    let summary = crawl(
        ctx,
        domains,
        CrawlLedgers {
            activity: &resources.activity_log,
            failures: &resources.failure_ledger,
        },
        CrawlOptions {
            max_workers: config.max_workers,
            progress_interval: config.progress_interval,
        },
    )
    .await;

    finalize_crawl(resources, summary, config.db_path).await
}
