//! Certificate persistence.
//!
//! `CertificateStore` is the sink the crawl writes to and the source of the
//! "already stored" half of the resolution state.

use std::collections::HashSet;

use sqlx::{Row, SqlitePool};

use super::models::{ParsedCertificateRecord, StoredCertificate};
use crate::error_handling::DatabaseError;

/// SQLite-backed store holding one certificate row per domain.
///
/// Cloning is cheap; clones share the underlying pool.
#[derive(Clone)]
pub struct CertificateStore {
    pool: SqlitePool,
    run_id: Option<String>,
}

impl CertificateStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool, run_id: None }
    }

    /// Tags every row written through this store with `run_id`.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = Some(run_id.into());
        self
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Round-trips a trivial query to prove the database is usable.
    pub async fn ping(&self) -> Result<(), DatabaseError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Inserts the record, or overwrites the existing row for the same domain.
    ///
    /// Writing the same domain any number of times leaves exactly one row
    /// holding the latest values.
    pub async fn upsert(&self, record: &ParsedCertificateRecord) -> Result<(), DatabaseError> {
        let document = serde_json::to_string(&record.document)?;
        let observed_at_ms = chrono::Utc::now().timestamp_millis();

        sqlx::query(
            "INSERT INTO certificates (
                domain, issuer_organization, issuer_common_name, subject_common_name,
                validity_start, validity_end, serial_number, fingerprint_sha256,
                signature_algorithm, key_algorithm, validation_level,
                document, observed_at_ms, run_id
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(domain) DO UPDATE SET
                issuer_organization=excluded.issuer_organization,
                issuer_common_name=excluded.issuer_common_name,
                subject_common_name=excluded.subject_common_name,
                validity_start=excluded.validity_start,
                validity_end=excluded.validity_end,
                serial_number=excluded.serial_number,
                fingerprint_sha256=excluded.fingerprint_sha256,
                signature_algorithm=excluded.signature_algorithm,
                key_algorithm=excluded.key_algorithm,
                validation_level=excluded.validation_level,
                document=excluded.document,
                observed_at_ms=excluded.observed_at_ms,
                run_id=excluded.run_id",
        )
        .bind(&record.domain)
        .bind(&record.issuer_organization)
        .bind(&record.issuer_common_name)
        .bind(&record.subject_common_name)
        .bind(&record.validity_start)
        .bind(&record.validity_end)
        .bind(&record.serial_number)
        .bind(&record.fingerprint_sha256)
        .bind(&record.signature_algorithm)
        .bind(&record.key_algorithm)
        .bind(&record.validation_level)
        .bind(document)
        .bind(observed_at_ms)
        .bind(&self.run_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Returns true when a row for `domain` exists.
    pub async fn is_stored(&self, domain: &str) -> Result<bool, DatabaseError> {
        let row = sqlx::query("SELECT 1 FROM certificates WHERE domain = ? LIMIT 1")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    /// All stored domains.
    pub async fn stored_domains(&self) -> Result<HashSet<String>, DatabaseError> {
        let rows = sqlx::query("SELECT domain FROM certificates")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|row| row.get("domain")).collect())
    }

    pub async fn count(&self) -> Result<i64, DatabaseError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM certificates")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Reads back the row for `domain`, if any.
    pub async fn fetch(&self, domain: &str) -> Result<Option<StoredCertificate>, DatabaseError> {
        let row = sqlx::query(
            "SELECT domain, issuer_organization, issuer_common_name, subject_common_name,
                    validity_start, validity_end, serial_number, fingerprint_sha256,
                    signature_algorithm, key_algorithm, validation_level,
                    document, observed_at_ms, run_id
             FROM certificates WHERE domain = ?",
        )
        .bind(domain)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let document: String = row.get("document");
        let record = ParsedCertificateRecord {
            domain: row.get("domain"),
            issuer_organization: row.get("issuer_organization"),
            issuer_common_name: row.get("issuer_common_name"),
            subject_common_name: row.get("subject_common_name"),
            validity_start: row.get("validity_start"),
            validity_end: row.get("validity_end"),
            serial_number: row.get("serial_number"),
            fingerprint_sha256: row.get("fingerprint_sha256"),
            signature_algorithm: row.get("signature_algorithm"),
            key_algorithm: row.get("key_algorithm"),
            validation_level: row.get("validation_level"),
            document: serde_json::from_str(&document)?,
        };

        Ok(Some(StoredCertificate {
            record,
            observed_at_ms: row.get("observed_at_ms"),
            run_id: row.get("run_id"),
        }))
    }

    /// Closes the pool; pending writes are finished first.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::test_helpers::{create_test_store, sample_record};
    use serde_json::json;

    #[tokio::test]
    async fn test_upsert_then_fetch() {
        let (store, _dir) = create_test_store().await;
        let record = sample_record("example.com", "Let's Encrypt");

        store.upsert(&record).await.expect("upsert");

        let stored = store
            .fetch("example.com")
            .await
            .expect("fetch")
            .expect("row present");
        assert_eq!(stored.record, record);
        assert!(stored.observed_at_ms > 0);
        assert_eq!(stored.run_id, None);
    }

    #[tokio::test]
    async fn test_upsert_twice_keeps_one_row_with_latest_values() {
        let (store, _dir) = create_test_store().await;

        store
            .upsert(&sample_record("example.com", "Old CA"))
            .await
            .expect("first upsert");
        store
            .upsert(&sample_record("example.com", "New CA"))
            .await
            .expect("second upsert");

        assert_eq!(store.count().await.expect("count"), 1);
        let stored = store
            .fetch("example.com")
            .await
            .expect("fetch")
            .expect("row present");
        assert_eq!(stored.record.issuer_organization.as_deref(), Some("New CA"));
        assert_eq!(
            stored.record.document["parsed"]["issuer"]["organization"][0],
            json!("New CA")
        );
    }

    #[tokio::test]
    async fn test_is_stored_and_stored_domains() {
        let (store, _dir) = create_test_store().await;
        assert!(!store.is_stored("a.example").await.expect("is_stored"));

        store
            .upsert(&sample_record("a.example", "CA"))
            .await
            .expect("upsert a");
        store
            .upsert(&sample_record("b.example", "CA"))
            .await
            .expect("upsert b");

        assert!(store.is_stored("a.example").await.expect("is_stored"));
        assert!(!store.is_stored("c.example").await.expect("is_stored"));

        let domains = store.stored_domains().await.expect("stored_domains");
        assert_eq!(domains.len(), 2);
        assert!(domains.contains("a.example"));
        assert!(domains.contains("b.example"));
    }

    #[tokio::test]
    async fn test_run_id_is_recorded() {
        let (store, _dir) = create_test_store().await;
        let store = store.with_run_id("run_1");
        store
            .upsert(&sample_record("a.example", "CA"))
            .await
            .expect("upsert");

        let stored = store.fetch("a.example").await.expect("fetch").expect("row");
        assert_eq!(stored.run_id.as_deref(), Some("run_1"));
    }

    #[tokio::test]
    async fn test_fetch_missing_domain_returns_none() {
        let (store, _dir) = create_test_store().await;
        assert!(store.fetch("nowhere.example").await.expect("fetch").is_none());
    }

    #[tokio::test]
    async fn test_document_is_queryable_by_json_path() {
        let (store, _dir) = create_test_store().await;
        store
            .upsert(&sample_record("a.example", "Some CA"))
            .await
            .expect("upsert");

        let org: String = sqlx::query_scalar(
            "SELECT json_extract(document, '$.parsed.issuer.organization[0]')
             FROM certificates WHERE domain = 'a.example'",
        )
        .fetch_one(store.pool())
        .await
        .expect("json_extract");
        assert_eq!(org, "Some CA");
    }
}
