//! Resolution state across runs.
//!
//! A domain is `Resolved` when the store holds its certificate and
//! `PermanentlyFailed` when the failure ledger lists it. Both are terminal; only
//! `Unresolved` domains are scheduled. The index is built once at run start
//! and never refreshed during the run.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};

use crate::ledger::FailureLedger;
use crate::storage::CertificateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolved,
    PermanentlyFailed,
}

/// Snapshot of which domains are already resolved.
#[derive(Debug, Default)]
pub struct ResolutionIndex {
    resolved: HashSet<String>,
    failed: HashSet<String>,
}

/// Input domains split by resolution state, input order preserved.
#[derive(Debug, Default)]
pub struct Partition {
    pub unresolved: Vec<String>,
    pub already_resolved: usize,
    pub already_failed: usize,
}

impl ResolutionIndex {
    pub fn new(resolved: HashSet<String>, failed: HashSet<String>) -> Self {
        Self { resolved, failed }
    }

    /// Builds the index from the store's domains and the failure ledger file.
    ///
    /// # Errors
    ///
    /// Fails if the store cannot be queried or the ledger cannot be read.
    pub async fn load(store: &CertificateStore, failure_ledger: &Path) -> Result<Self> {
        let resolved = store
            .stored_domains()
            .await
            .context("Failed to read stored domains")?;
        let failed = FailureLedger::load(failure_ledger)
            .await
            .context("Failed to read failure ledger")?;
        Ok(Self::new(resolved, failed))
    }

    /// A stored certificate wins over a ledger line for the same domain.
    pub fn state(&self, domain: &str) -> ResolutionState {
        if self.resolved.contains(domain) {
            ResolutionState::Resolved
        } else if self.failed.contains(domain) {
            ResolutionState::PermanentlyFailed
        } else {
            ResolutionState::Unresolved
        }
    }

    pub fn partition(&self, domains: Vec<String>) -> Partition {
        let mut partition = Partition::default();
        for domain in domains {
            match self.state(&domain) {
                ResolutionState::Unresolved => partition.unresolved.push(domain),
                ResolutionState::Resolved => partition.already_resolved += 1,
                ResolutionState::PermanentlyFailed => partition.already_failed += 1,
            }
        }
        partition
    }

    pub fn resolved_count(&self) -> usize {
        self.resolved.len()
    }

    pub fn failed_count(&self) -> usize {
        self.failed.len()
    }
}
