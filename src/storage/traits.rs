//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::llm::EnrichedJob;
use crate::storage::{StoredJob, UpsertOutcome};
use crate::url::PostingId;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
pub trait Storage {
    // ===== Jobs =====

    /// Inserts or updates one job in a single transaction
    ///
    /// Base fields are always written. Enrichment columns and the language
    /// and framework associations are replaced only when `job` carries an
    /// enrichment; otherwise the stored enrichment is left untouched.
    fn upsert_job(&mut self, job: &EnrichedJob) -> StorageResult<UpsertOutcome>;

    /// Gets a job by posting id
    fn get_job(&self, posting_id: &PostingId) -> StorageResult<Option<StoredJob>>;

    /// Language names associated with a job, alphabetical
    fn job_languages(&self, posting_id: &PostingId) -> StorageResult<Vec<String>>;

    /// Framework names associated with a job, alphabetical
    fn job_frameworks(&self, posting_id: &PostingId) -> StorageResult<Vec<String>>;

    // ===== Statistics =====

    fn count_jobs(&self) -> StorageResult<u64>;

    fn count_enriched_jobs(&self) -> StorageResult<u64>;

    /// Gets job count per domain, largest first
    fn jobs_per_domain(&self) -> StorageResult<Vec<(String, u64)>>;

    /// Gets the most frequently named languages, largest first
    fn top_languages(&self, limit: usize) -> StorageResult<Vec<(String, u64)>>;
}
