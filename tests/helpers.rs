// Shared test helpers for crawl scenarios.
//
// Scripted fetchers and parsers stand in for the network and for
// `zcertificate`, so scenarios run without either.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tempfile::TempDir;

use cert_crawler::{
    crawl, init_db_pool_with_path, run_migrations, ActivityLog, CertificateFetcher,
    CertificateParser, CertificateStore, CrawlContext, CrawlLedgers, CrawlOptions, CrawlSummary,
    FailureLedger, FetchError, FetchFailure, FetchOutcome, HandshakePolicy, ParseError,
    PemCertificate, ProcessingStats, ResolutionIndex, RetryPolicy,
};

/// How the scripted fetcher answers for one domain.
#[allow(dead_code)] // Not every test file uses every behavior
#[derive(Debug, Clone, Copy)]
pub enum Behavior {
    /// Returns a certificate straight away
    Serve,
    /// Connect times out on every attempt
    Timeout,
    /// Handshake fails on every attempt
    HandshakeFailure,
    /// Presents bytes that are not a certificate
    Undecodable,
    /// Fails `n` times, then serves
    Flaky(usize),
}

/// `CertificateFetcher` driven by a per-domain script. Unknown domains are served.
pub struct ScriptedFetcher {
    behaviors: HashMap<String, Behavior>,
    calls: Mutex<HashMap<String, usize>>,
}

#[allow(dead_code)]
impl ScriptedFetcher {
    pub fn new(behaviors: &[(&str, Behavior)]) -> Self {
        Self {
            behaviors: behaviors
                .iter()
                .map(|(d, b)| (d.to_string(), *b))
                .collect(),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn calls_for(&self, domain: &str) -> usize {
        self.calls
            .lock()
            .expect("lock")
            .get(domain)
            .copied()
            .unwrap_or(0)
    }

    pub fn total_calls(&self) -> usize {
        self.calls.lock().expect("lock").values().sum()
    }
}

#[async_trait]
impl CertificateFetcher for ScriptedFetcher {
    async fn fetch(&self, domain: &str) -> FetchOutcome {
        let call = {
            let mut calls = self.calls.lock().expect("lock");
            let count = calls.entry(domain.to_string()).or_default();
            *count += 1;
            *count
        };
        // Yield so workers genuinely interleave
        tokio::time::sleep(Duration::from_millis(1)).await;

        let behavior = self.behaviors.get(domain).copied().unwrap_or(Behavior::Serve);
        match behavior {
            Behavior::Serve => Ok(pem_for(domain)),
            Behavior::Flaky(failures) if call > failures => Ok(pem_for(domain)),
            Behavior::Timeout | Behavior::Flaky(_) => Err(FetchError::ConnectTimeout {
                domain: domain.to_string(),
                port: 443,
                secs: 3,
            }
            .into()),
            Behavior::HandshakeFailure => Err(FetchError::Handshake {
                domain: domain.to_string(),
                source: std::io::Error::new(std::io::ErrorKind::InvalidData, "bad record mac"),
            }
            .into()),
            Behavior::Undecodable => Err(FetchFailure::Parse("not a certificate".into())),
        }
    }
}

fn pem_for(domain: &str) -> PemCertificate {
    PemCertificate::new(format!("PEM:{domain}"))
}

/// `CertificateParser` that exits non-zero for the listed domains.
pub struct ScriptedParser {
    rejects: HashSet<String>,
}

impl ScriptedParser {
    pub fn rejecting(domains: &[&str]) -> Self {
        Self {
            rejects: domains.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[async_trait]
impl CertificateParser for ScriptedParser {
    async fn parse(&self, pem: &PemCertificate) -> Result<Value, ParseError> {
        let domain = pem.as_str().trim_start_matches("PEM:");
        if self.rejects.contains(domain) {
            return Err(ParseError::NonZeroExit {
                command: "zcertificate".into(),
                code: "1".into(),
                stderr: "failed to parse certificate".into(),
            });
        }
        Ok(json!({
            "raw": pem.as_str(),
            "parsed": {
                "subject": {"common_name": [domain]},
                "issuer": {"organization": ["Scripted CA"]},
                "validity": {"start": "2024-01-01T00:00:00Z", "end": "2025-01-01T00:00:00Z"}
            }
        }))
    }
}

/// Database, activity log and failure ledger that persist across runs.
pub struct Workspace {
    pub dir: TempDir,
}

#[allow(dead_code)]
impl Workspace {
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().expect("Failed to create temp dir"),
        }
    }

    pub fn db_path(&self) -> PathBuf {
        self.dir.path().join("certificates.db")
    }

    pub fn log_path(&self) -> PathBuf {
        self.dir.path().join("crawl.log")
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.dir.path().join("crawl_failures.txt")
    }

    pub async fn open_store(&self) -> CertificateStore {
        let pool = init_db_pool_with_path(&self.db_path())
            .await
            .expect("Failed to create database pool");
        run_migrations(&pool)
            .await
            .expect("Failed to run migrations");
        CertificateStore::new(pool)
    }

    pub fn log(&self) -> String {
        std::fs::read_to_string(self.log_path()).unwrap_or_default()
    }

    pub fn failed_domains(&self) -> Vec<String> {
        let mut lines: Vec<String> = std::fs::read_to_string(self.ledger_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect();
        lines.sort();
        lines
    }

    /// One crawl the way `run_crawl` wires it: resolution filter, then pool.
    pub async fn run(
        &self,
        fetcher: Arc<ScriptedFetcher>,
        parser: ScriptedParser,
        domains: &[&str],
        max_workers: usize,
        max_retries: u32,
    ) -> CrawlSummary {
        let store = self.open_store().await;
        let index = ResolutionIndex::load(&store, &self.ledger_path())
            .await
            .expect("Failed to load resolution index");
        let partition = index.partition(domains.iter().map(|d| d.to_string()).collect());

        let activity = ActivityLog::open(&self.log_path())
            .await
            .expect("Failed to open activity log");
        let failures = FailureLedger::open(&self.ledger_path())
            .await
            .expect("Failed to open failure ledger");

        let ctx = Arc::new(CrawlContext::new(
            fetcher,
            Arc::new(parser),
            store.clone(),
            RetryPolicy::new(max_retries, 1.2, HandshakePolicy::Retry)
                .with_unit(Duration::from_millis(1)),
            Arc::new(ProcessingStats::new()),
        ));

        let summary = crawl(
            ctx,
            partition.unresolved,
            CrawlLedgers {
                activity: &activity,
                failures: &failures,
            },
            CrawlOptions {
                max_workers,
                progress_interval: 10,
            },
        )
        .await;

        store.close().await;
        summary
    }
}
