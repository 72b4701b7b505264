//! Crawl resource initialization.
//!
//! Everything here runs before the first domain is dispatched; any failure
//! aborts the run.

use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use chrono::Utc;
use log::info;

use crate::config::Config;
use crate::error_handling::ProcessingStats;
use crate::input::load_domains;
use crate::ledger::{ActivityLog, FailureLedger};
use crate::parser::{CertificateParser, ExternalParser};
use crate::retry::RetryPolicy;
use crate::state::ResolutionIndex;
use crate::storage::{
    init_db_pool_with_path, insert_run_metadata, run_migrations, CertificateStore, RunMetadata,
};
use crate::tls::{CertificateFetcher, TlsFetcher, VerificationMode};

/// Everything one run holds on to.
pub(super) struct CrawlResources {
    pub store: CertificateStore,
    pub fetcher: Arc<dyn CertificateFetcher>,
    pub parser: Arc<dyn CertificateParser>,
    pub retry: RetryPolicy,
    pub stats: Arc<ProcessingStats>,
    pub activity_log: ActivityLog,
    pub failure_ledger: FailureLedger,
    /// Unresolved domains, input order
    pub domains: Vec<String>,
    pub total_domains: usize,
    pub skipped_resolved: usize,
    pub skipped_failed: usize,
    pub run_id: String,
    pub start_time: Instant,
}

/// Initialize all resources needed for a crawl.
///
/// 1. Validate the configuration
/// 2. Open the database, apply migrations and check it answers
/// 3. Load the domain list and drop domains resolved by earlier runs
/// 4. Record the run
/// 5. Build the fetcher, parser and ledgers
pub(super) async fn init_crawl_resources(config: &Config) -> Result<CrawlResources> {
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {e}"))?;

    let pool = init_db_pool_with_path(&config.db_path)
        .await
        .context("Failed to initialize database pool")?;
    run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let start_time_epoch = Utc::now().timestamp_millis();
    let run_id = format!("run_{}", start_time_epoch);
    let store = CertificateStore::new(pool).with_run_id(run_id.clone());
    store.ping().await.context("Database is not reachable")?;

    let all_domains = load_domains(&config.file, &config.column)
        .with_context(|| format!("Failed to load domains from {}", config.file.display()))?;
    let total_domains = all_domains.len();
    info!("Total domains in {}: {}", config.file.display(), total_domains);

    let index = ResolutionIndex::load(&store, &config.failure_file).await?;
    info!(
        "Resolution state: {} domains stored, {} in failure ledger",
        index.resolved_count(),
        index.failed_count()
    );
    let partition = index.partition(all_domains);

    info!("Starting run: {}", run_id);
    insert_run_metadata(
        store.pool(),
        &RunMetadata {
            run_id: &run_id,
            start_time_ms: start_time_epoch,
            version: env!("CARGO_PKG_VERSION"),
        },
    )
    .await
    .context("Failed to insert run metadata")?;

    let fetcher = TlsFetcher::new(
        VerificationMode::from_flag(config.verify_certificates),
        config.port,
        config.connect_timeout(),
    )
    .context("Failed to initialize TLS client")?;
    let parser = ExternalParser::new(
        config.parser_command.clone(),
        config.parser_args.clone(),
        config.parse_timeout(),
    );

    let activity_log = ActivityLog::open(&config.log_file)
        .await
        .context("Failed to open activity log")?;
    let failure_ledger = FailureLedger::open(&config.failure_file)
        .await
        .context("Failed to open failure ledger")?;

    Ok(CrawlResources {
        store,
        fetcher: Arc::new(fetcher),
        parser: Arc::new(parser),
        retry: RetryPolicy::from_config(config),
        stats: Arc::new(ProcessingStats::new()),
        activity_log,
        failure_ledger,
        domains: partition.unresolved,
        total_domains,
        skipped_resolved: partition.already_resolved,
        skipped_failed: partition.already_failed,
        run_id,
        start_time: Instant::now(),
    })
}
