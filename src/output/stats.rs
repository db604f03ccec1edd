//! Statistics from the job database and the current run
//!
//! This module provides functionality for extracting and displaying
//! statistics from the storage layer, plus the end-of-run summary.

use crate::crawler::{CompletionSignal, CrawlOutcome, CrawlStats};
use crate::storage::{PersistSummary, Storage};
use crate::SourcetapError;

/// Number of languages listed by `--stats`
const TOP_LANGUAGES: usize = 10;

/// Database statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredStatistics {
    /// Total number of stored jobs
    pub total_jobs: u64,

    /// Jobs carrying an enrichment
    pub enriched_jobs: u64,

    /// Job count per domain, largest first
    pub jobs_per_domain: Vec<(String, u64)>,

    /// Most frequently named languages, largest first
    pub top_languages: Vec<(String, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoredStatistics)` - Successfully loaded statistics
/// * `Err(SourcetapError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<StoredStatistics, SourcetapError> {
    Ok(StoredStatistics {
        total_jobs: storage.count_jobs()?,
        enriched_jobs: storage.count_enriched_jobs()?,
        jobs_per_domain: storage.jobs_per_domain()?,
        top_languages: storage.top_languages(TOP_LANGUAGES)?,
    })
}

fn percentage(part: u64, whole: u64) -> f64 {
    if whole > 0 {
        (part as f64 / whole as f64) * 100.0
    } else {
        0.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoredStatistics) {
    println!("=== Job Statistics ===\n");

    println!("Overview:");
    println!("  Total jobs: {}", stats.total_jobs);
    println!(
        "  Enriched: {} ({:.1}%)",
        stats.enriched_jobs,
        percentage(stats.enriched_jobs, stats.total_jobs)
    );
    println!();

    if !stats.jobs_per_domain.is_empty() {
        println!("Jobs by Domain:");
        for (domain, count) in &stats.jobs_per_domain {
            println!(
                "  {}: {} ({:.1}%)",
                domain,
                count,
                percentage(*count, stats.enriched_jobs)
            );
        }
        println!();
    }

    if !stats.top_languages.is_empty() {
        println!("Top Languages:");
        for (language, count) in &stats.top_languages {
            println!("  - {} ({})", language, count);
        }
        println!();
    }
}

/// End-of-run numbers gathered by `main`
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub signal: CompletionSignal,
    pub crawl: Option<CrawlStats>,
    pub records: usize,
    pub enriched: Option<usize>,
    pub persisted: Option<PersistSummary>,
}

impl RunSummary {
    pub fn from_outcome(outcome: &CrawlOutcome) -> Self {
        Self {
            signal: outcome.signal,
            crawl: outcome.stats,
            records: outcome.records.len(),
            enriched: None,
            persisted: None,
        }
    }
}

/// Prints the end-of-run summary to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("\n=== Run Summary ===\n");

    match summary.signal {
        CompletionSignal::Event => println!("Completion: walk finished"),
        CompletionSignal::Stability => {
            println!("Completion: record count stabilized (walk aborted early)")
        }
    }

    if let Some(crawl) = &summary.crawl {
        println!("Listing pages walked: {}", crawl.pages_walked);
        println!("  Failed: {}", crawl.listing_failures);
        println!("  Without new postings: {}", crawl.empty_pages);
        println!(
            "Posting links: {} seen, {} new",
            crawl.links_seen, crawl.links_admitted
        );
        println!(
            "Detail pages: {} ok, {} failed",
            crawl.details_succeeded, crawl.details_failed
        );
    }

    println!("Records harvested: {}", summary.records);

    match summary.enriched {
        Some(enriched) => println!("Records enriched: {}/{}", enriched, summary.records),
        None => println!("Records enriched: skipped"),
    }

    match &summary.persisted {
        Some(p) => println!(
            "Stored: {} new, {} updated, {} failed",
            p.inserted, p.updated, p.failed
        ),
        None => println!("Stored: skipped"),
    }
}
