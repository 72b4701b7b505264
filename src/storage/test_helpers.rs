//! Shared test helpers for storage module tests.

use serde_json::json;
use tempfile::TempDir;

use super::models::ParsedCertificateRecord;
use super::{init_db_pool_with_path, run_migrations, CertificateStore};

/// Creates a migrated store backed by a file in a fresh temp directory.
///
/// The `TempDir` must be kept alive for as long as the store is used.
pub async fn create_test_store() -> (CertificateStore, TempDir) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = init_db_pool_with_path(&dir.path().join("test.db"))
        .await
        .expect("Failed to create test database pool");
    run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    (CertificateStore::new(pool), dir)
}

/// A record shaped like parser output, with the given issuer organization.
pub fn sample_record(domain: &str, issuer_organization: &str) -> ParsedCertificateRecord {
    ParsedCertificateRecord::from_document(
        domain,
        json!({
            "parsed": {
                "issuer": {"organization": [issuer_organization], "common_name": ["Test CA"]},
                "subject": {"common_name": [domain]},
                "validity": {"start": "2024-01-01T00:00:00Z", "end": "2025-01-01T00:00:00Z"},
                "serial_number": "1",
                "signature_algorithm": {"name": "SHA256-RSA"},
                "subject_key_info": {"key_algorithm": {"name": "RSA"}},
                "validation_level": "DV"
            }
        }),
    )
}
