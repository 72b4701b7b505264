//! cert_crawler library: concurrent TLS leaf certificate collection
//!
//! This library reads a list of domains, connects to each one over TLS,
//! captures the leaf certificate the server presents, turns it into a
//! structured document with an external parser (`zcertificate` by default)
//! and upserts the result into a SQLite database. Domains resolved by an
//! earlier run, stored or recorded as permanently failed, are skipped.
//!
//! # Example
//!
//! ```no_run
//! use cert_crawler::{Config, run_crawl};
//! use tokio;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config {
//!     file: std::path::PathBuf::from("domains.csv"),
//!     max_workers: 20,
//!     ..Default::default()
//! };
//!
//! let report = run_crawl(config).await?;
//! println!("Dispatched {} domains: {} stored, {} failed",
//!          report.dispatched, report.stored, report.permanently_failed);
//! # Ok(())
//! # }
//! ```
//!
//! # Requirements
//!
//! This library requires a Tokio runtime. Use `#[tokio::main]` in your application
//! or ensure you're calling library functions within an async context.

mod app;
pub mod config;
mod crawl;
mod error_handling;
pub mod initialization;
mod input;
mod ledger;
mod parser;
mod retry;
mod run;
mod state;
mod storage;
mod tls;

// Re-export public API
pub use config::{Config, HandshakePolicy, LogFormat, LogLevel};
pub use crawl::{
    crawl, process_domain, CrawlContext, CrawlLedgers, CrawlOptions, CrawlSummary, Disposition,
    DomainOutcome,
};
pub use error_handling::{
    DatabaseError, ErrorType, FailureClass, FetchError, InitializationError, InputError,
    LedgerError, ParseError, ProcessingStats,
};
pub use input::{load_domains, normalize_domain};
pub use ledger::{ActivityLog, FailureLedger, LogEntry};
pub use parser::{CertificateParser, ExternalParser};
pub use retry::{fetch_with_retry, RetriedFetch, RetryPolicy};
pub use run::{run_crawl, CrawlReport};
pub use state::{Partition, ResolutionIndex, ResolutionState};
pub use storage::{
    init_db_pool_with_path, query_run_history, run_migrations, CertificateStore,
    ParsedCertificateRecord, RunSummary, StoredCertificate,
};
pub use tls::{
    leaf_to_pem, CertificateFetcher, FetchFailure, FetchOutcome, PemCertificate, TlsFetcher,
    VerificationMode,
};
