//! Storage module for persisting harvested postings
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Idempotent per-posting upserts with enrichment lookups
//! - Statistics queries for reporting

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::llm::EnrichedJob;
use crate::url::PostingId;
use crate::SourcetapError;

use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(SourcetapError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, SourcetapError> {
    SqliteStorage::new(path)
}

/// Whether an upsert created or refreshed the job row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Updated,
}

/// A job as read back from the database
#[derive(Debug, Clone)]
pub struct StoredJob {
    pub id: i64,
    pub posting_id: PostingId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub url: String,
    pub parsed_description: Option<String>,
    pub deadline_date: Option<String>,
    pub min_years_experience: Option<u32>,
    pub domain: Option<String>,
    pub modality: Option<String>,
    pub degree: Option<String>,
    pub enriched_at: Option<String>,
    pub updated_at: String,
}

impl StoredJob {
    pub fn is_enriched(&self) -> bool {
        self.enriched_at.is_some()
    }
}

/// Tally of one persistence pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistSummary {
    pub inserted: usize,
    pub updated: usize,
    pub failed: usize,
}

/// Upserts every job in order, one transaction each
///
/// A failed upsert rolls back only that job; it is logged and counted.
pub fn persist_all<S>(storage: &mut S, jobs: &[EnrichedJob]) -> PersistSummary
where
    S: Storage + ?Sized,
{
    let mut summary = PersistSummary::default();

    for job in jobs {
        match storage.upsert_job(job) {
            Ok(UpsertOutcome::Inserted) => summary.inserted += 1,
            Ok(UpsertOutcome::Updated) => summary.updated += 1,
            Err(e) => {
                tracing::warn!("Failed to store posting {}: {}", job.record.posting_id, e);
                summary.failed += 1;
            }
        }
    }

    tracing::info!(
        "Stored {} postings ({} new, {} updated, {} failed)",
        jobs.len(),
        summary.inserted,
        summary.updated,
        summary.failed
    );

    summary
}
