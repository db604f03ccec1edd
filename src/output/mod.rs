//! Output module for run summaries and exports
//!
//! This module handles:
//! - Exporting harvested postings as JSON
//! - Printing database statistics and the end-of-run summary

pub mod stats;

pub use stats::{
    load_statistics, print_run_summary, print_statistics, RunSummary, StoredStatistics,
};

use crate::llm::EnrichedJob;
use crate::SourcetapError;
use std::path::Path;

/// Writes the postings to `path` as a pretty-printed JSON array
///
/// Parent directories are created as needed.
pub fn write_json(path: &Path, jobs: &[EnrichedJob]) -> Result<(), SourcetapError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(jobs)?;
    std::fs::write(path, json)?;

    tracing::info!("Wrote {} postings to {}", jobs.len(), path.display());
    Ok(())
}
