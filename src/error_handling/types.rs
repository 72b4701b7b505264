//! Error type definitions.
//!
//! This module defines the error types produced by each crawl stage, plus the
//! `ErrorType` categories counted by `ProcessingStats`.

use log::SetLoggerError;
use strum_macros::EnumIter as EnumIterMacro;
use thiserror::Error;

/// Error types for initialization failures.
#[derive(Error, Debug)]
#[allow(clippy::enum_variant_names)] // All variants end with "Error" by convention
pub enum InitializationError {
    /// Error initializing the logger.
    #[error("Logger initialization error: {0}")]
    LoggerError(#[from] SetLoggerError),

    /// Error building the TLS client configuration.
    #[error("TLS client initialization error: {0}")]
    TlsConfigError(#[from] rustls::Error),
}

/// Error types for database operations.
#[derive(Error, Debug)]
pub enum DatabaseError {
    /// Error creating the database file.
    #[error("Database file creation error: {0}")]
    FileCreationError(String),

    /// SQL execution error.
    #[error("SQL error: {0}")]
    SqlError(#[from] sqlx::Error),

    /// Error applying the embedded migrations.
    #[error("Migration error: {0}")]
    MigrationError(#[from] sqlx::migrate::MigrateError),

    /// The stored parser document could not be serialized.
    #[error("Document serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Errors writing the activity log or the failure ledger.
#[derive(Error, Debug)]
pub enum LedgerError {
    #[error("Failed to open {path}: {source}")]
    Open {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to append to {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Error types for reading the domain list.
#[derive(Error, Debug)]
pub enum InputError {
    #[error("Failed to read input file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed CSV input: {0}")]
    Csv(#[from] csv::Error),

    #[error("{path} has no column named {column:?}")]
    MissingColumn { path: String, column: String },
}

/// Coarse classification of a failed fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// DNS, connection refused, connect timeout
    TransientNetwork,
    /// TLS negotiation failed
    Handshake,
    /// The domain can never be connected to; retrying cannot help
    InvalidInput,
    /// Anything the fetcher did not anticipate
    Unexpected,
}

/// A failed certificate fetch attempt.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Cannot resolve {domain}: {source}")]
    Dns {
        domain: String,
        source: std::io::Error,
    },

    #[error("Cannot connect to {domain}:{port}: {source}")]
    Connect {
        domain: String,
        port: u16,
        source: std::io::Error,
    },

    #[error("Connection to {domain}:{port} timed out after {secs}s")]
    ConnectTimeout { domain: String, port: u16, secs: u64 },

    #[error("SSL handshake failed for {domain}: {source}")]
    Handshake {
        domain: String,
        source: std::io::Error,
    },

    #[error("SSL handshake with {domain} timed out after {secs}s")]
    HandshakeTimeout { domain: String, secs: u64 },

    #[error("{domain} presented no certificate")]
    NoCertificate { domain: String },

    #[error("Invalid domain name {domain}: {reason}")]
    InvalidDomain { domain: String, reason: String },

    #[error("Unexpected error for {domain}: {reason}")]
    Unexpected { domain: String, reason: String },
}

impl FetchError {
    pub fn class(&self) -> FailureClass {
        match self {
            FetchError::Dns { .. }
            | FetchError::Connect { .. }
            | FetchError::ConnectTimeout { .. } => FailureClass::TransientNetwork,
            FetchError::Handshake { .. }
            | FetchError::HandshakeTimeout { .. }
            | FetchError::NoCertificate { .. } => FailureClass::Handshake,
            FetchError::InvalidDomain { .. } => FailureClass::InvalidInput,
            FetchError::Unexpected { .. } => FailureClass::Unexpected,
        }
    }
}

/// Failure of the external certificate parser.
///
/// All variants are permanent: the same bytes will not parse differently on
/// a second attempt.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("Failed to start {command}: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("I/O error talking to {command}: {source}")]
    Io {
        command: String,
        source: std::io::Error,
    },

    #[error("{command} exited with code {code}: {stderr}")]
    NonZeroExit {
        command: String,
        code: String,
        stderr: String,
    },

    #[error("{command} produced no output")]
    EmptyOutput { command: String },

    #[error("Failed to parse {command} JSON: {source}")]
    InvalidJson {
        command: String,
        source: serde_json::Error,
    },

    #[error("{command} output is not a JSON object")]
    NotAnObject { command: String },

    #[error("{command} timed out after {secs}s")]
    Timeout { command: String, secs: u64 },
}

/// Types of errors counted during a crawl.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIterMacro)]
pub enum ErrorType {
    // Fetch errors (per attempt)
    DnsError,
    ConnectError,
    ConnectTimeout,
    HandshakeError,
    HandshakeTimeout,
    NoCertificate,
    InvalidDomain,
    UnexpectedFetchError,
    // Terminal outcomes
    RetriesExhausted,
    CertificateDecodeError,
    ParserError,
    ParserTimeout,
    StorageError,
    WorkerPanic,
}

impl std::fmt::Display for ErrorType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl ErrorType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorType::DnsError => "DNS resolution error",
            ErrorType::ConnectError => "TCP connect error",
            ErrorType::ConnectTimeout => "TCP connect timeout",
            ErrorType::HandshakeError => "TLS handshake error",
            ErrorType::HandshakeTimeout => "TLS handshake timeout",
            ErrorType::NoCertificate => "No certificate presented",
            ErrorType::InvalidDomain => "Invalid domain name",
            ErrorType::UnexpectedFetchError => "Unexpected fetch error",
            ErrorType::RetriesExhausted => "Retry budget exhausted",
            ErrorType::CertificateDecodeError => "Certificate decode error",
            ErrorType::ParserError => "Certificate parser error",
            ErrorType::ParserTimeout => "Certificate parser timeout",
            ErrorType::StorageError => "Storage error",
            ErrorType::WorkerPanic => "Worker panic",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn io_err() -> std::io::Error {
        std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused")
    }

    #[test]
    fn test_fetch_error_classes() {
        let dns = FetchError::Dns {
            domain: "a.example".into(),
            source: io_err(),
        };
        let connect = FetchError::Connect {
            domain: "a.example".into(),
            port: 443,
            source: io_err(),
        };
        let timeout = FetchError::ConnectTimeout {
            domain: "a.example".into(),
            port: 443,
            secs: 3,
        };
        assert_eq!(dns.class(), FailureClass::TransientNetwork);
        assert_eq!(connect.class(), FailureClass::TransientNetwork);
        assert_eq!(timeout.class(), FailureClass::TransientNetwork);

        let handshake = FetchError::HandshakeTimeout {
            domain: "a.example".into(),
            secs: 3,
        };
        let no_cert = FetchError::NoCertificate {
            domain: "a.example".into(),
        };
        assert_eq!(handshake.class(), FailureClass::Handshake);
        assert_eq!(no_cert.class(), FailureClass::Handshake);

        let unexpected = FetchError::Unexpected {
            domain: "a.example".into(),
            reason: "boom".into(),
        };
        assert_eq!(unexpected.class(), FailureClass::Unexpected);

        let invalid = FetchError::InvalidDomain {
            domain: "rank,domain".into(),
            reason: "invalid dns name".into(),
        };
        assert_eq!(invalid.class(), FailureClass::InvalidInput);
    }

    #[test]
    fn test_fetch_error_messages_name_the_domain() {
        let err = FetchError::Connect {
            domain: "a.example".into(),
            port: 443,
            source: io_err(),
        };
        assert_eq!(
            err.to_string(),
            "Cannot connect to a.example:443: refused"
        );
    }

    #[test]
    fn test_all_error_types_have_string_representation() {
        for error_type in ErrorType::iter() {
            assert!(
                !error_type.as_str().is_empty(),
                "{:?} should have non-empty string",
                error_type
            );
        }
    }
}
