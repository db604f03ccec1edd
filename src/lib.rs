//! Sourcetap: a job-posting harvester
//!
//! This crate walks the paginated search results of a job board, fetches every
//! newly discovered posting with bounded concurrency, and extracts structured
//! records that can be enriched by an LLM and persisted to SQLite.

pub mod config;
pub mod crawler;
pub mod llm;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;

use thiserror::Error;

/// Main error type for Sourcetap operations
#[derive(Debug, Error)]
pub enum SourcetapError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("Invalid CSS selector '{selector}': {message}")]
    InvalidSelector { selector: String, message: String },

    #[error("Invalid entry transition for {posting_id}: {from:?} -> {to:?}")]
    InvalidTransition {
        posting_id: String,
        from: state::EntryState,
        to: state::EntryState,
    },

    #[error("Unknown posting id: {0}")]
    UnknownPosting(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Enrichment error: {0}")]
    Enrichment(#[from] llm::EnrichmentError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Crawl task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Environment variable {0} is not set")]
    MissingEnv(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),

    #[error("No posting id in URL: {0}")]
    MissingPostingId(String),
}

/// Result type alias for Sourcetap operations
pub type Result<T> = std::result::Result<T, SourcetapError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{Aggregator, Coordinator, CrawlHandle, JobRecord};
pub use state::{CrawlState, EntryState};
pub use url::{extract_posting_id, PostingId};
