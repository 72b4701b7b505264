//! Per-domain outcomes and run totals.

use crate::ledger::LogEntry;

/// What happened to a domain in this run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Disposition {
    /// Certificate fetched, parsed and written to the store.
    Stored,
    /// The store already held a certificate; nothing was fetched.
    AlreadyStored,
    /// Retry budget spent or certificate unparseable. Recorded in the failure ledger.
    PermanentlyFailed,
    /// Storage failure or worker crash. Not terminal; a later run tries again.
    Deferred,
}

impl Disposition {
    pub fn is_success(self) -> bool {
        !matches!(self, Disposition::PermanentlyFailed)
    }
}

/// The result one worker hands back to the scheduler.
#[derive(Debug, Clone)]
pub struct DomainOutcome {
    pub domain: String,
    pub entry: LogEntry,
    pub disposition: Disposition,
}

impl DomainOutcome {
    pub fn success(&self) -> bool {
        self.disposition.is_success()
    }
}

/// Totals for the domains dispatched in one crawl.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub dispatched: usize,
    pub stored: usize,
    pub already_stored: usize,
    pub permanently_failed: usize,
    pub deferred: usize,
}

impl CrawlSummary {
    pub fn record(&mut self, disposition: Disposition) {
        match disposition {
            Disposition::Stored => self.stored += 1,
            Disposition::AlreadyStored => self.already_stored += 1,
            Disposition::PermanentlyFailed => self.permanently_failed += 1,
            Disposition::Deferred => self.deferred += 1,
        }
    }

    pub fn completed(&self) -> usize {
        self.stored + self.already_stored + self.permanently_failed + self.deferred
    }

    pub fn succeeded(&self) -> usize {
        self.completed() - self.permanently_failed
    }
}
