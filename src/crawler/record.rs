use crate::url::PostingId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Structured fields extracted from one detail page
///
/// Fields the page did not provide are empty strings. A record is never
/// modified after it has been appended to the aggregator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub posting_id: PostingId,
    pub title: String,
    pub company: String,
    pub location: String,
    pub posted_date: String,
    pub expires_date: String,
    pub salary: String,
    pub url: String,
    pub description: String,
    pub discovered_on_page: u32,
    pub scraped_at: DateTime<Utc>,
}
