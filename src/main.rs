//! Main application entry point (CLI binary).
//!
//! This is a thin wrapper around the `cert_crawler` library that handles:
//! - Command-line argument parsing
//! - Logger initialization
//! - User-facing output formatting
//!
//! All core functionality is implemented in the library crate.

use anyhow::{Context, Result};
use clap::Parser;
use std::process;

use cert_crawler::initialization::{init_crypto_provider, init_logger_with};
use cert_crawler::{run_crawl, Config};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    let log_level = config.log_level.clone();
    let log_format = config.log_format.clone();
    init_logger_with(log_level.into(), log_format).context("Failed to initialize logger")?;

    // Installed before the first TLS connection
    init_crypto_provider();

    match run_crawl(config).await {
        Ok(report) => {
            println!(
                "✅ Crawled {} domain{} ({} stored, {} failed, {} deferred; {} skipped from earlier runs) in {:.1}s",
                report.dispatched,
                if report.dispatched == 1 { "" } else { "s" },
                report.stored,
                report.permanently_failed,
                report.deferred,
                report.skipped_resolved + report.skipped_failed,
                report.elapsed_seconds
            );
            println!("Results saved in {}", report.db_path.display());
            Ok(())
        }
        Err(e) => {
            eprintln!("cert_crawler error: {:#}", e);
            process::exit(1);
        }
    }
}
