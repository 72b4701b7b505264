//! Configuration constants.
//!
//! This module defines the defaults used by the CLI and by `Config::default()`,
//! including timeouts, retry parameters and file locations.

use std::time::Duration;

/// Default number of concurrent crawl workers.
pub const DEFAULT_MAX_WORKERS: usize = 5;
/// Upper bound accepted by `Config::validate`.
/// Each worker holds one socket and, briefly, one parser process.
pub const MAX_WORKERS_LIMIT: usize = 500;

/// Log a progress line every N completed domains.
pub const PROGRESS_INTERVAL: usize = 100;

// File locations
pub const DB_PATH: &str = "./certificates.db";
pub const ACTIVITY_LOG_PATH: &str = "./crawl.log";
pub const FAILURE_LEDGER_PATH: &str = "./crawl_failures.txt";

/// Header of the CSV column holding the domains.
pub const DEFAULT_DOMAIN_COLUMN: &str = "Websites URL";

// Network operation timeouts
/// TCP connect timeout in seconds (DNS resolution included)
pub const CONNECT_TIMEOUT_SECS: u64 = 3;
/// Port the fetcher connects to
pub const TLS_PORT: u16 = 443;

// External parser
/// Command used to parse PEM certificates into JSON documents
pub const DEFAULT_PARSER_COMMAND: &str = "zcertificate";
/// Arguments passed to the parser command
pub const DEFAULT_PARSER_ARGS: &[&str] = &["-format", "pem"];
/// Parser process timeout in seconds
pub const PARSE_TIMEOUT_SECS: u64 = 5;

// Retry strategy
/// Additional attempts after the first one (3 attempts in total)
pub const RETRY_MAX_RETRIES: u32 = 2;
/// Base of the exponential backoff; retry k waits `base^k` units
pub const RETRY_BACKOFF_BASE: f64 = 1.2;
/// Time unit the backoff exponent is multiplied with
pub const RETRY_BACKOFF_UNIT: Duration = Duration::from_secs(1);
