//! Error categorization.
//!
//! Maps the typed errors of each crawl stage onto the `ErrorType` counters.

use super::stats::ProcessingStats;
use super::types::{ErrorType, FetchError, ParseError};

/// Categorizes a failed fetch attempt into an `ErrorType`.
pub fn categorize_fetch_error(error: &FetchError) -> ErrorType {
    match error {
        FetchError::Dns { .. } => ErrorType::DnsError,
        FetchError::Connect { .. } => ErrorType::ConnectError,
        FetchError::ConnectTimeout { .. } => ErrorType::ConnectTimeout,
        FetchError::Handshake { .. } => ErrorType::HandshakeError,
        FetchError::HandshakeTimeout { .. } => ErrorType::HandshakeTimeout,
        FetchError::NoCertificate { .. } => ErrorType::NoCertificate,
        FetchError::InvalidDomain { .. } => ErrorType::InvalidDomain,
        FetchError::Unexpected { .. } => ErrorType::UnexpectedFetchError,
    }
}

/// Categorizes a parser failure into an `ErrorType`.
pub fn categorize_parse_error(error: &ParseError) -> ErrorType {
    match error {
        ParseError::Timeout { .. } => ErrorType::ParserTimeout,
        _ => ErrorType::ParserError,
    }
}

/// Records one failed fetch attempt in `stats`.
pub fn update_fetch_error_stats(stats: &ProcessingStats, error: &FetchError) {
    stats.increment_error(categorize_fetch_error(error));
}
