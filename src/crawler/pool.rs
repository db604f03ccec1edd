//! Detail fetch pool
//!
//! Fetches one listing page's batch of postings with a hard concurrency cap
//! and returns only after every fetch in the batch has finished.

use crate::crawler::extract::{parse_detail, ExtractionRules};
use crate::crawler::fetcher::{FetchResult, PageFetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::Aggregator;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Tally of one drained batch
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Entries handed to the pool
    pub dispatched: usize,
    /// Records appended to the aggregator
    pub succeeded: usize,
    /// Fetches that failed (transport, status, content type, worker panic)
    pub failed: usize,
    /// Entries settled by another worker; no record was appended
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WorkerOutcome {
    Appended,
    Failed,
    Skipped,
}

/// Bounded-concurrency detail fetcher
///
/// The semaphore is sized once at construction, so the cap holds no matter
/// how large a batch is.
#[derive(Clone)]
pub struct DetailPool {
    fetcher: Arc<dyn PageFetcher>,
    rules: Arc<ExtractionRules>,
    frontier: Arc<Frontier>,
    aggregator: Arc<Aggregator>,
    semaphore: Arc<Semaphore>,
    max_concurrent: usize,
    request_delay: Duration,
}

impl DetailPool {
    /// Creates a new pool
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Transport used for detail pages
    /// * `rules` - Field extraction rules
    /// * `frontier` - Shared frontier; workers mark entries in it
    /// * `aggregator` - Destination for successfully parsed records
    /// * `max_concurrent` - Maximum simultaneous fetches (minimum 1)
    /// * `request_delay` - Fixed delay before each request, inside the slot
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        rules: Arc<ExtractionRules>,
        frontier: Arc<Frontier>,
        aggregator: Arc<Aggregator>,
        max_concurrent: usize,
        request_delay: Duration,
    ) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            fetcher,
            rules,
            frontier,
            aggregator,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            request_delay,
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Fetches every entry and waits for the whole batch to drain
    ///
    /// Fetch errors are logged and counted; they never propagate.
    pub async fn fetch_all(&self, entries: Vec<FrontierEntry>) -> BatchOutcome {
        let mut outcome = BatchOutcome {
            dispatched: entries.len(),
            ..BatchOutcome::default()
        };
        if entries.is_empty() {
            return outcome;
        }

        let mut tasks = JoinSet::new();
        for entry in entries {
            let pool = self.clone();
            tasks.spawn(async move { pool.process_entry(entry).await });
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(WorkerOutcome::Appended) => outcome.succeeded += 1,
                Ok(WorkerOutcome::Failed) => outcome.failed += 1,
                Ok(WorkerOutcome::Skipped) => outcome.skipped += 1,
                Err(e) => {
                    tracing::error!("Detail worker ended abnormally: {}", e);
                    outcome.failed += 1;
                }
            }
        }

        outcome
    }

    async fn process_entry(&self, entry: FrontierEntry) -> WorkerOutcome {
        let Ok(_permit) = self.semaphore.acquire().await else {
            tracing::error!("Detail pool closed before {} was fetched", entry.posting_id);
            return WorkerOutcome::Failed;
        };

        if let Err(e) = self.frontier.mark_fetching(&entry.posting_id) {
            tracing::debug!("Not fetching {}: {}", entry.posting_id, e);
            return WorkerOutcome::Skipped;
        }

        if !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }

        tracing::debug!("Fetching posting {} from {}", entry.posting_id, entry.detail_url);

        match self.fetcher.fetch(&entry.detail_url).await {
            FetchResult::Success {
                final_url, body, ..
            } => {
                let record = parse_detail(&body, &final_url, &entry, &self.rules);
                match self
                    .frontier
                    .mark_processed(&entry.posting_id, &record.posting_id)
                {
                    Ok(true) => {}
                    Ok(false) => {
                        tracing::debug!(
                            "Posting {} already recorded; dropping copy fetched via {}",
                            record.posting_id,
                            entry.posting_id
                        );
                        return WorkerOutcome::Skipped;
                    }
                    Err(e) => {
                        tracing::warn!("Dropping record for {}: {}", entry.posting_id, e);
                        return WorkerOutcome::Failed;
                    }
                }
                tracing::info!(
                    "Extracted posting {}: {} ({})",
                    record.posting_id,
                    record.title,
                    record.company
                );
                self.aggregator.append(record);
                WorkerOutcome::Appended
            }
            failure => {
                tracing::warn!(
                    "Detail fetch failed for {}: {}",
                    entry.detail_url,
                    failure.failure_reason().unwrap_or_default()
                );
                match self.frontier.mark_failed(&entry.posting_id) {
                    Ok(()) => WorkerOutcome::Failed,
                    // Another fetch already resolved to this id and kept its record.
                    Err(_) if self.frontier.is_processed(&entry.posting_id) => {
                        WorkerOutcome::Skipped
                    }
                    Err(e) => {
                        tracing::debug!("Could not mark {} failed: {}", entry.posting_id, e);
                        WorkerOutcome::Failed
                    }
                }
            }
        }
    }
}
