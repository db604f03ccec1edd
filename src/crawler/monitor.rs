//! Completion monitor: infers crawl completion from aggregator growth
//!
//! This is a heuristic observer. A slow batch can plateau long enough to look
//! finished, so callers that own a [`CrawlHandle`](crate::crawler::CrawlHandle)
//! should prefer its explicit completion event and use the monitor as a
//! secondary signal only.

use crate::crawler::{Aggregator, JobRecord};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};

/// Anything with a monotonically observed size
pub trait CountSource: Send + Sync {
    fn count(&self) -> usize;
}

/// Polls a [`CountSource`] until its value stops changing
#[derive(Debug, Clone, Copy)]
pub struct CompletionMonitor {
    poll_interval: Duration,
    stability_threshold: u32,
}

impl CompletionMonitor {
    /// # Arguments
    ///
    /// * `poll_interval` - Time between samples
    /// * `stability_threshold` - Consecutive equal samples required (minimum 1)
    pub fn new(poll_interval: Duration, stability_threshold: u32) -> Self {
        Self {
            poll_interval,
            stability_threshold: stability_threshold.max(1),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn stability_threshold(&self) -> u32 {
        self.stability_threshold
    }

    /// Samples `source` every poll interval and returns the count at the
    /// first moment `stability_threshold` consecutive samples were equal
    pub async fn wait_for_stable<S>(&self, source: &S) -> usize
    where
        S: CountSource + ?Sized,
    {
        let mut ticker = interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut last: Option<usize> = None;
        let mut run = 0u32;

        loop {
            ticker.tick().await;
            let sample = source.count();

            if last == Some(sample) {
                run += 1;
            } else {
                last = Some(sample);
                run = 1;
            }

            tracing::trace!(sample, run, "Completion monitor sample");

            if run >= self.stability_threshold {
                tracing::debug!(
                    "Aggregator stable at {} records for {} samples",
                    sample,
                    run
                );
                return sample;
            }
        }
    }

    /// Waits until the aggregator is stable, then returns its snapshot
    pub async fn await_stable(&self, aggregator: &Aggregator) -> Vec<JobRecord> {
        self.wait_for_stable(aggregator).await;
        aggregator.snapshot()
    }
}
