use serde::Deserialize;
use std::collections::BTreeMap;

/// Main configuration structure for Sourcetap
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub search: SearchConfig,
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub llm: Option<LlmConfig>,
    pub output: OutputConfig,
}

/// What to search for on the listing site
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Free-text query, e.g. "Software Engineer"
    pub query: String,
}

/// Target site description
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Origin that relative links are rooted against; its host is the only allowed domain
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Path of the paginated search results page
    #[serde(rename = "listing-path", default = "default_listing_path")]
    pub listing_path: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Number of listing pages to walk
    #[serde(rename = "max-pages")]
    pub max_pages: u32,

    /// Hard cap on simultaneous detail fetches
    #[serde(rename = "max-concurrent-fetches", default = "default_concurrency")]
    pub max_concurrent_fetches: u32,

    /// Fixed delay applied before every request (milliseconds)
    #[serde(rename = "request-delay-ms", default)]
    pub request_delay_ms: u64,

    /// Stop walking after this many consecutive pages admit no new postings
    #[serde(rename = "max-consecutive-empty-pages", default)]
    pub max_consecutive_empty_pages: Option<u32>,
}

/// How the caller decides that the crawl has finished
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompletionStrategy {
    /// Wait for the coordinator's explicit completion event
    Event,
    /// Poll the aggregator until its size is stable (or the event fires)
    Stable,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_strategy")]
    pub strategy: CompletionStrategy,

    #[serde(rename = "poll-interval-ms", default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    #[serde(rename = "stability-threshold", default = "default_stability_threshold")]
    pub stability_threshold: u32,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            strategy: default_strategy(),
            poll_interval_ms: default_poll_interval(),
            stability_threshold: default_stability_threshold(),
        }
    }
}

/// Request identity sent to the target site
#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Extra headers (e.g. cookies or credentials) sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            headers: BTreeMap::new(),
        }
    }
}

/// Description-parsing LLM settings
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    /// Name of the environment variable holding the API key
    #[serde(rename = "api-key-env", default = "default_api_key_env")]
    pub api_key_env: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// File containing the system prompt
    #[serde(rename = "prompt-path")]
    pub prompt_path: String,

    #[serde(rename = "base-url", default = "default_llm_base_url")]
    pub base_url: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Optional path for a JSON dump of the harvested records
    #[serde(rename = "json-path", default)]
    pub json_path: Option<String>,
}

fn default_listing_path() -> String {
    "/jobsearch/powersearch.aspx".to_string()
}

fn default_concurrency() -> u32 {
    3
}

fn default_strategy() -> CompletionStrategy {
    CompletionStrategy::Event
}

fn default_poll_interval() -> u64 {
    1000
}

fn default_stability_threshold() -> u32 {
    5
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/89.0.4389.82 Safari/537.36".to_string()
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}
