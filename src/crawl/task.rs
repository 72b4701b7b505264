//! Per-domain processing.
//!
//! Runs inside one spawned task: store check, fetch with retry, parse, upsert.
//! Every step appends to the domain's `LogEntry`; no error escapes the task.

use std::sync::Arc;

use log::{debug, warn};

use crate::error_handling::{categorize_parse_error, update_fetch_error_stats, ErrorType};
use crate::ledger::LogEntry;
use crate::retry::fetch_with_retry;
use crate::storage::ParsedCertificateRecord;
use crate::tls::FetchFailure;

use super::outcome::{Disposition, DomainOutcome};
use super::CrawlContext;

/// Processes one domain and reports what happened.
pub async fn process_domain(ctx: Arc<CrawlContext>, domain: String) -> DomainOutcome {
    let mut entry = LogEntry::new(domain.as_str());
    let disposition = run_pipeline(&ctx, &domain, &mut entry).await;
    debug!("{domain}: {disposition:?}");
    DomainOutcome {
        domain,
        entry,
        disposition,
    }
}

async fn run_pipeline(ctx: &CrawlContext, domain: &str, entry: &mut LogEntry) -> Disposition {
    match ctx.store.is_stored(domain).await {
        Ok(true) => {
            entry.push("Already present in store, skipping");
            return Disposition::AlreadyStored;
        }
        Ok(false) => {}
        Err(e) => {
            warn!("Store lookup for {domain} failed: {e}");
            entry.push(format!("Store lookup failed, fetching anyway: {e}"));
        }
    }

    entry.push("Fetching certificate");
    let retried = fetch_with_retry(ctx.fetcher.as_ref(), domain, &ctx.retry, |attempt, failure| {
        if let FetchFailure::Transient(e) = failure {
            update_fetch_error_stats(&ctx.stats, e);
        }
        entry.push(format!("Attempt {attempt} failed: {failure}"));
    })
    .await;

    let pem = match retried.outcome {
        Ok(pem) => {
            entry.push(format!(
                "Certificate retrieved (attempt {})",
                retried.attempts
            ));
            pem
        }
        Err(FetchFailure::Parse(_)) => {
            ctx.stats.increment_error(ErrorType::CertificateDecodeError);
            entry.push("Giving up: presented certificate cannot be decoded");
            return Disposition::PermanentlyFailed;
        }
        Err(FetchFailure::Transient(_)) => {
            if retried.attempts > ctx.retry.max_retries() {
                ctx.stats.increment_error(ErrorType::RetriesExhausted);
            }
            entry.push(format!(
                "Giving up after {} attempt(s)",
                retried.attempts
            ));
            return Disposition::PermanentlyFailed;
        }
    };

    let document = match ctx.parser.parse(&pem).await {
        Ok(document) => document,
        Err(e) => {
            ctx.stats.increment_error(categorize_parse_error(&e));
            entry.push(format!("Certificate parsing failed: {e}"));
            return Disposition::PermanentlyFailed;
        }
    };
    entry.push("Certificate parsed");

    let record = ParsedCertificateRecord::from_document(domain, document);
    match ctx.store.upsert(&record).await {
        Ok(()) => {
            entry.push("Certificate stored");
            Disposition::Stored
        }
        Err(e) => {
            ctx.stats.increment_error(ErrorType::StorageError);
            warn!("Failed to store certificate for {domain}: {e}");
            entry.push(format!("Failed to store certificate: {e}"));
            Disposition::Deferred
        }
    }
}
