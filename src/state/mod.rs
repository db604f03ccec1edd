//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `EntryState`: Lifecycle of one admitted posting (pending, fetching, processed, failed)
//! - `CrawlState`: Page counter, page cap, and the shared frontier for one run

mod crawl_state;
mod entry_state;

pub use crawl_state::CrawlState;
pub use entry_state::EntryState;
