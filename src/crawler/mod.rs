//! Crawler module for listing walks and detail harvesting
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching behind the [`PageFetcher`] seam
//! - Listing link extraction and detail field extraction
//! - Deduplication in the [`Frontier`]
//! - Bounded-concurrency detail fetching in the [`DetailPool`]
//! - Walk coordination and completion signalling

mod aggregator;
mod coordinator;
mod extract;
mod fetcher;
mod frontier;
mod monitor;
mod parser;
mod pool;
mod record;

pub use aggregator::Aggregator;
pub use coordinator::{
    run_crawl, CompletionSignal, Coordinator, CrawlHandle, CrawlOutcome, CrawlStats,
};
pub use extract::{parse_detail, ExtractionRules, Field, FieldRule};
pub use fetcher::{build_http_client, fetch_url, FetchResult, HttpFetcher, PageFetcher};
pub use frontier::{Frontier, FrontierEntry};
pub use monitor::{CompletionMonitor, CountSource};
pub use parser::{extract_listing_links, ListingLink};
pub use pool::{BatchOutcome, DetailPool};
pub use record::JobRecord;
