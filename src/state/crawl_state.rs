use crate::crawler::Frontier;
use std::sync::Arc;

/// Progress of one crawl run
///
/// Owned by the coordinator. Only the coordinator advances the page counter;
/// pool workers reach the frontier through their own `Arc` handle and only
/// ever mark entries, so the listing phase and the detail phase never contend
/// for the page counter.
#[derive(Debug)]
pub struct CrawlState {
    /// Last listing page that was requested (0 before the first page)
    current_page: u32,

    /// Configured page cap
    max_pages: u32,

    /// Processed ids and the current page's pending links
    frontier: Arc<Frontier>,
}

impl CrawlState {
    pub fn with_frontier(max_pages: u32, frontier: Arc<Frontier>) -> Self {
        Self {
            current_page: 0,
            max_pages,
            frontier,
        }
    }

    /// Moves to the next listing page
    ///
    /// Returns the new page number, or None once `max_pages` was reached.
    /// The counter never exceeds `max_pages`.
    pub fn advance(&mut self) -> Option<u32> {
        if self.current_page >= self.max_pages {
            return None;
        }
        self.current_page += 1;
        Some(self.current_page)
    }

    pub fn current_page(&self) -> u32 {
        self.current_page
    }

    pub fn max_pages(&self) -> u32 {
        self.max_pages
    }

    /// Returns true once every configured page has been requested
    pub fn is_exhausted(&self) -> bool {
        self.current_page >= self.max_pages
    }

    pub fn frontier(&self) -> &Arc<Frontier> {
        &self.frontier
    }
}
