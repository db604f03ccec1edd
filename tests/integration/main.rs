//! Integration tests for Sourcetap
//!
//! Each module drives the public API against wiremock servers or a
//! temporary database.

mod crawl_tests;
mod llm_tests;
mod storage_tests;
