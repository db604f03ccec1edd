//! Append-only collection of extracted records

use crate::crawler::monitor::CountSource;
use crate::crawler::JobRecord;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Concurrency-safe, append-only record store
///
/// Performs no deduplication; the frontier guarantees each posting is
/// appended at most once.
#[derive(Debug, Default)]
pub struct Aggregator {
    records: Mutex<Vec<JobRecord>>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<JobRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn append(&self, record: JobRecord) {
        self.lock().push(record);
    }

    /// Point-in-time copy of all records, in append order
    pub fn snapshot(&self) -> Vec<JobRecord> {
        self.lock().clone()
    }

    pub fn count(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }
}

impl CountSource for Aggregator {
    fn count(&self) -> usize {
        Aggregator::count(self)
    }
}
