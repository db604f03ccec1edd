//! LLM enrichment of harvested postings
//!
//! Each record's description is handed to a [`DescriptionParser`]. A failure
//! for one record is logged and that record continues unenriched.

mod openai;
mod schema;

pub use openai::{load_prompt, ChatRequest, Message, OpenAiClient};
pub use schema::{parse_enrichment, Degree, Enrichment, JobDomain, Modality};

use crate::crawler::JobRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from a single enrichment attempt
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Model returned no content")]
    EmptyResponse,

    #[error("Malformed enrichment: {0}")]
    Malformed(String),

    #[error("Failed to read prompt file {path}: {source}")]
    Prompt {
        path: String,
        source: std::io::Error,
    },
}

/// Turns a free-text description into an [`Enrichment`]
#[async_trait]
pub trait DescriptionParser: Send + Sync {
    async fn parse_description(&self, description: &str) -> Result<Enrichment, EnrichmentError>;
}

/// A harvested record plus whatever enrichment succeeded for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedJob {
    #[serde(flatten)]
    pub record: JobRecord,
    pub enrichment: Option<Enrichment>,
}

impl EnrichedJob {
    pub fn unenriched(record: JobRecord) -> Self {
        Self {
            record,
            enrichment: None,
        }
    }

    pub fn is_enriched(&self) -> bool {
        self.enrichment.is_some()
    }
}

/// Enriches records one at a time, in order
///
/// Records with a blank description are passed through without a request.
pub async fn enrich_all<P>(parser: &P, records: Vec<JobRecord>) -> Vec<EnrichedJob>
where
    P: DescriptionParser + ?Sized,
{
    let total = records.len();
    let mut enriched = Vec::with_capacity(total);

    for (i, record) in records.into_iter().enumerate() {
        if record.description.trim().is_empty() {
            tracing::debug!("Posting {} has no description, not enriching", record.posting_id);
            enriched.push(EnrichedJob::unenriched(record));
            continue;
        }

        match parser.parse_description(&record.description).await {
            Ok(enrichment) => {
                tracing::info!(
                    "Enriched posting {} ({}/{}): {}, {}, {} yrs",
                    record.posting_id,
                    i + 1,
                    total,
                    enrichment.domain,
                    enrichment.modality,
                    enrichment.min_years_experience
                );
                enriched.push(EnrichedJob {
                    record,
                    enrichment: Some(enrichment),
                });
            }
            Err(e) => {
                tracing::warn!("Skipping enrichment for posting {}: {}", record.posting_id, e);
                enriched.push(EnrichedJob::unenriched(record));
            }
        }
    }

    enriched
}
