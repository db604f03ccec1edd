//! Configuration module for Sourcetap
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use sourcetap::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("sourcetap.toml")).unwrap();
//! println!("Walking {} listing pages", config.crawler.max_pages);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CompletionConfig, CompletionStrategy, Config, CrawlerConfig, HttpConfig, LlmConfig,
    OutputConfig, SearchConfig, SiteConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
