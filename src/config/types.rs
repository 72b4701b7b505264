//! Configuration types and CLI options.
//!
//! This module defines enums and structs used for command-line argument parsing
//! and configuration.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Parser, ValueEnum};

use crate::config::constants::*;

/// Logging level for the application.
///
/// Controls the verbosity of log output, from most restrictive (Error) to most
/// verbose (Trace).
#[derive(Clone, Debug, ValueEnum)]
pub enum LogLevel {
    /// Only error messages
    Error,
    /// Error and warning messages
    Warn,
    /// Error, warning, and informational messages
    Info,
    /// All messages except trace
    Debug,
    /// All messages including trace
    Trace,
}

impl From<LogLevel> for log::LevelFilter {
    fn from(l: LogLevel) -> Self {
        match l {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Log output format.
///
/// - `Plain`: Human-readable format with colors (default)
/// - `Json`: Structured JSON format for machine parsing
#[derive(Clone, Debug, ValueEnum)]
pub enum LogFormat {
    /// Human-readable format with colors (default)
    Plain,
    /// Structured JSON format for machine parsing
    Json,
}

/// How TLS handshake failures are treated by the retry policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum HandshakePolicy {
    /// Retry handshake failures like network failures, within the retry budget
    Retry,
    /// A failed handshake marks the domain as permanently failed immediately
    Permanent,
}

/// Crawler configuration.
///
/// Parsed from the command line by `clap`, or built programmatically from
/// `Config::default()` when the crate is used as a library.
///
/// # Examples
///
/// ```no_run
/// use cert_crawler::Config;
/// use std::path::PathBuf;
///
/// let config = Config {
///     file: PathBuf::from("domains.csv"),
///     max_workers: 20,
///     ..Default::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Parser)]
#[command(
    name = "cert_crawler",
    about = "Fetches TLS leaf certificates for a list of domains and stores the parsed records."
)]
pub struct Config {
    /// Input file: CSV with a header row, or one domain per line
    #[arg(value_parser)]
    pub file: PathBuf,

    /// CSV column holding the domains
    #[arg(long, default_value = DEFAULT_DOMAIN_COLUMN)]
    pub column: String,

    /// Log level: error|warn|info|debug|trace
    #[arg(long, value_enum, default_value_t = LogLevel::Info)]
    pub log_level: LogLevel,

    /// Log format: plain|json
    #[arg(long, value_enum, default_value_t = LogFormat::Plain)]
    pub log_format: LogFormat,

    /// Database path (SQLite file)
    #[arg(long, value_parser, default_value = DB_PATH)]
    pub db_path: PathBuf,

    /// Per-domain activity log (appended to)
    #[arg(long, value_parser, default_value = ACTIVITY_LOG_PATH)]
    pub log_file: PathBuf,

    /// Ledger of permanently failed domains, one per line (appended to)
    #[arg(long, value_parser, default_value = FAILURE_LEDGER_PATH)]
    pub failure_file: PathBuf,

    /// Number of concurrent workers
    #[arg(long, default_value_t = DEFAULT_MAX_WORKERS)]
    pub max_workers: usize,

    /// TCP connect and TLS handshake timeout in seconds
    #[arg(long, default_value_t = CONNECT_TIMEOUT_SECS)]
    pub connect_timeout_secs: u64,

    /// Parser process timeout in seconds
    #[arg(long, default_value_t = PARSE_TIMEOUT_SECS)]
    pub parse_timeout_secs: u64,

    /// Extra fetch attempts after the first one
    #[arg(long, default_value_t = RETRY_MAX_RETRIES)]
    pub max_retries: u32,

    /// Backoff base (> 1.0); retry k waits base^k seconds
    #[arg(long, default_value_t = RETRY_BACKOFF_BASE)]
    pub backoff_base: f64,

    /// Optional ceiling for a single backoff delay, in seconds
    #[arg(long)]
    pub max_backoff_secs: Option<f64>,

    /// External certificate parser command
    #[arg(long, default_value = DEFAULT_PARSER_COMMAND)]
    pub parser_command: String,

    /// Argument passed to the parser command (repeatable)
    #[arg(long = "parser-arg", allow_hyphen_values = true, default_values_t = default_parser_args())]
    pub parser_args: Vec<String>,

    /// Require the presented chain to verify against the webpki roots
    #[arg(long)]
    pub verify_certificates: bool,

    /// How TLS handshake failures are treated: retry|permanent
    #[arg(long, value_enum, default_value_t = HandshakePolicy::Retry)]
    pub handshake_failures: HandshakePolicy,

    /// Port to connect to
    #[arg(long, default_value_t = TLS_PORT)]
    pub port: u16,

    /// Log progress every N completed domains
    #[arg(long, default_value_t = PROGRESS_INTERVAL)]
    pub progress_interval: usize,
}

fn default_parser_args() -> Vec<String> {
    DEFAULT_PARSER_ARGS.iter().map(|s| s.to_string()).collect()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            file: PathBuf::from("domains.csv"),
            column: DEFAULT_DOMAIN_COLUMN.to_string(),
            log_level: LogLevel::Info,
            log_format: LogFormat::Plain,
            db_path: PathBuf::from(DB_PATH),
            log_file: PathBuf::from(ACTIVITY_LOG_PATH),
            failure_file: PathBuf::from(FAILURE_LEDGER_PATH),
            max_workers: DEFAULT_MAX_WORKERS,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            parse_timeout_secs: PARSE_TIMEOUT_SECS,
            max_retries: RETRY_MAX_RETRIES,
            backoff_base: RETRY_BACKOFF_BASE,
            max_backoff_secs: None,
            parser_command: DEFAULT_PARSER_COMMAND.to_string(),
            parser_args: default_parser_args(),
            verify_certificates: false,
            handshake_failures: HandshakePolicy::Retry,
            port: TLS_PORT,
            progress_interval: PROGRESS_INTERVAL,
        }
    }
}

impl Config {
    /// Checks option values that clap cannot check on its own.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid option.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_workers == 0 {
            return Err("max_workers must be at least 1".to_string());
        }
        if self.max_workers > MAX_WORKERS_LIMIT {
            return Err(format!(
                "max_workers must not exceed {MAX_WORKERS_LIMIT} (got {})",
                self.max_workers
            ));
        }
        if self.connect_timeout_secs == 0 {
            return Err("connect_timeout_secs must be greater than 0".to_string());
        }
        if self.parse_timeout_secs == 0 {
            return Err("parse_timeout_secs must be greater than 0".to_string());
        }
        if !self.backoff_base.is_finite() || self.backoff_base <= 1.0 {
            return Err(format!(
                "backoff_base must be a finite number > 1.0 (got {})",
                self.backoff_base
            ));
        }
        if let Some(cap) = self.max_backoff_secs {
            if !cap.is_finite() || cap <= 0.0 {
                return Err(format!("max_backoff_secs must be positive (got {cap})"));
            }
        }
        if self.parser_command.trim().is_empty() {
            return Err("parser_command must not be empty".to_string());
        }
        if self.column.trim().is_empty() {
            return Err("column must not be empty".to_string());
        }
        if self.progress_interval == 0 {
            return Err("progress_interval must be at least 1".to_string());
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn parse_timeout(&self) -> Duration {
        Duration::from_secs(self.parse_timeout_secs)
    }
}
