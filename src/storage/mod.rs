// storage/mod.rs
// Database operations module

mod certificates;
mod migrations;
mod models;
mod pool;
mod runs;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use certificates::CertificateStore;
pub use migrations::run_migrations;
pub use models::{ParsedCertificateRecord, StoredCertificate};
pub use pool::init_db_pool_with_path;
pub use runs::{insert_run_metadata, query_run_history, update_run_stats, RunMetadata, RunStats, RunSummary};
