//! Bounded worker pool.
//!
//! Each unresolved domain is processed by exactly one spawned task; at most
//! `max_workers` run at a time. Outcomes are consumed in completion order by
//! the scheduler, which writes the activity log and the failure ledger.

mod outcome;
mod task;

use std::sync::Arc;
use std::time::Instant;

use futures::stream::FuturesUnordered;
use futures::StreamExt;
use log::warn;

use crate::app::log_progress;
use crate::error_handling::{ErrorType, ProcessingStats};
use crate::ledger::{ActivityLog, FailureLedger, LogEntry};
use crate::parser::CertificateParser;
use crate::retry::RetryPolicy;
use crate::storage::CertificateStore;
use crate::tls::CertificateFetcher;

pub use outcome::{CrawlSummary, Disposition, DomainOutcome};
pub use task::process_domain;

/// Shared resources every worker needs.
pub struct CrawlContext {
    pub fetcher: Arc<dyn CertificateFetcher>,
    pub parser: Arc<dyn CertificateParser>,
    pub store: CertificateStore,
    pub retry: RetryPolicy,
    pub stats: Arc<ProcessingStats>,
}

impl CrawlContext {
    pub fn new(
        fetcher: Arc<dyn CertificateFetcher>,
        parser: Arc<dyn CertificateParser>,
        store: CertificateStore,
        retry: RetryPolicy,
        stats: Arc<ProcessingStats>,
    ) -> Self {
        Self {
            fetcher,
            parser,
            store,
            retry,
            stats,
        }
    }
}

/// Scheduler settings.
#[derive(Debug, Clone, Copy)]
pub struct CrawlOptions {
    pub max_workers: usize,
    pub progress_interval: usize,
}

/// Append-only files the scheduler records outcomes in.
pub struct CrawlLedgers<'a> {
    pub activity: &'a ActivityLog,
    pub failures: &'a FailureLedger,
}

/// Processes `domains` with a bounded pool of workers.
///
/// Every dispatched domain yields exactly one outcome, including when its
/// worker panics, and every outcome gets an activity log block.
pub async fn crawl(
    ctx: Arc<CrawlContext>,
    domains: Vec<String>,
    ledgers: CrawlLedgers<'_>,
    options: CrawlOptions,
) -> CrawlSummary {
    let max_workers = options.max_workers.max(1);
    let progress_interval = options.progress_interval.max(1);
    let total = domains.len();
    let start_time = Instant::now();

    let mut summary = CrawlSummary::default();
    let mut tasks = FuturesUnordered::new();

    for domain in domains {
        while tasks.len() >= max_workers {
            if let Some((finished, joined)) = tasks.next().await {
                let outcome = into_outcome(&ctx.stats, finished, joined);
                record_outcome(&ledgers, &mut summary, outcome).await;
                report_progress(&summary, total, progress_interval, start_time);
            }
        }

        summary.dispatched += 1;
        let handle = tokio::spawn(process_domain(Arc::clone(&ctx), domain.clone()));
        tasks.push(async move { (domain, handle.await) });
    }

    while let Some((finished, joined)) = tasks.next().await {
        let outcome = into_outcome(&ctx.stats, finished, joined);
        record_outcome(&ledgers, &mut summary, outcome).await;
        report_progress(&summary, total, progress_interval, start_time);
    }

    log_progress(start_time, summary.completed(), total);
    summary
}

fn into_outcome(
    stats: &ProcessingStats,
    domain: String,
    joined: Result<DomainOutcome, tokio::task::JoinError>,
) -> DomainOutcome {
    match joined {
        Ok(outcome) => outcome,
        Err(join_error) => {
            warn!("Worker for {domain} failed: {join_error}");
            stats.increment_error(ErrorType::WorkerPanic);
            let mut entry = LogEntry::new(domain.as_str());
            entry.push(format!("Worker error: {join_error}"));
            DomainOutcome {
                domain,
                entry,
                disposition: Disposition::Deferred,
            }
        }
    }
}

async fn record_outcome(
    ledgers: &CrawlLedgers<'_>,
    summary: &mut CrawlSummary,
    outcome: DomainOutcome,
) {
    if let Err(e) = ledgers.activity.append(&outcome.entry).await {
        warn!("Failed to write activity log for {}: {e}", outcome.domain);
    }
    if !outcome.success() {
        if let Err(e) = ledgers.failures.append(&outcome.domain).await {
            warn!("Failed to record {} as failed: {e}", outcome.domain);
        }
    }
    summary.record(outcome.disposition);
}

fn report_progress(summary: &CrawlSummary, total: usize, interval: usize, start_time: Instant) {
    let completed = summary.completed();
    if completed % interval == 0 && completed < total {
        log_progress(start_time, completed, total);
    }
}
