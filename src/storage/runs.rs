//! Crawl run bookkeeping.
//!
//! One row per `run_crawl` invocation in `crawl_runs`: inserted at start,
//! completed with the final counts at the end.

use sqlx::{Row, SqlitePool};

use crate::error_handling::DatabaseError;

/// Metadata for a crawl run, recorded at start.
pub struct RunMetadata<'a> {
    pub run_id: &'a str,
    pub start_time_ms: i64,
    pub version: &'a str,
}

/// Counts for a completed crawl run, recorded at end.
pub struct RunStats<'a> {
    pub run_id: &'a str,
    pub total_domains: i64,
    pub dispatched_domains: i64,
    pub stored_domains: i64,
    pub failed_domains: i64,
    pub deferred_domains: i64,
    pub elapsed_seconds: f64,
}

/// A finished run as read back from `crawl_runs`.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub version: String,
    pub start_time_ms: i64,
    pub end_time_ms: Option<i64>,
    pub total_domains: Option<i64>,
    pub dispatched_domains: Option<i64>,
    pub stored_domains: Option<i64>,
    pub failed_domains: Option<i64>,
    pub deferred_domains: Option<i64>,
    pub elapsed_seconds: Option<f64>,
}

pub async fn insert_run_metadata(
    pool: &SqlitePool,
    meta: &RunMetadata<'_>,
) -> Result<(), DatabaseError> {
    sqlx::query(
        "INSERT INTO crawl_runs (run_id, version, start_time_ms)
         VALUES (?, ?, ?)
         ON CONFLICT(run_id) DO UPDATE SET
             version=excluded.version,
             start_time_ms=excluded.start_time_ms",
    )
    .bind(meta.run_id)
    .bind(meta.version)
    .bind(meta.start_time_ms)
    .execute(pool)
    .await?;

    Ok(())
}

pub async fn update_run_stats(pool: &SqlitePool, stats: &RunStats<'_>) -> Result<(), DatabaseError> {
    let end_time_ms = chrono::Utc::now().timestamp_millis();

    sqlx::query(
        "UPDATE crawl_runs
         SET end_time_ms = ?, total_domains = ?, dispatched_domains = ?, stored_domains = ?,
             failed_domains = ?, deferred_domains = ?, elapsed_seconds = ?
         WHERE run_id = ?",
    )
    .bind(end_time_ms)
    .bind(stats.total_domains)
    .bind(stats.dispatched_domains)
    .bind(stats.stored_domains)
    .bind(stats.failed_domains)
    .bind(stats.deferred_domains)
    .bind(stats.elapsed_seconds)
    .bind(stats.run_id)
    .execute(pool)
    .await?;

    Ok(())
}

/// Completed runs, most recent first.
pub async fn query_run_history(
    pool: &SqlitePool,
    limit: Option<i64>,
) -> Result<Vec<RunSummary>, DatabaseError> {
    let rows = sqlx::query(
        "SELECT run_id, version, start_time_ms, end_time_ms, total_domains, dispatched_domains,
                stored_domains, failed_domains, deferred_domains, elapsed_seconds
         FROM crawl_runs
         WHERE end_time_ms IS NOT NULL
         ORDER BY start_time_ms DESC
         LIMIT ?",
    )
    .bind(limit.unwrap_or(-1))
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|row| RunSummary {
            run_id: row.get("run_id"),
            version: row.get("version"),
            start_time_ms: row.get("start_time_ms"),
            end_time_ms: row.get("end_time_ms"),
            total_domains: row.get("total_domains"),
            dispatched_domains: row.get("dispatched_domains"),
            stored_domains: row.get("stored_domains"),
            failed_domains: row.get("failed_domains"),
            deferred_domains: row.get("deferred_domains"),
            elapsed_seconds: row.get("elapsed_seconds"),
        })
        .collect())
}
