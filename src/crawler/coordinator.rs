//! Crawler coordinator - listing walk and completion signalling
//!
//! The coordinator owns the [`CrawlState`] and alternates two phases per page:
//! one sequential listing request, then a bounded-parallel detail batch that
//! is fully drained before the next listing request is issued.

use crate::config::{CompletionStrategy, Config};
use crate::crawler::fetcher::{FetchResult, HttpFetcher, PageFetcher};
use crate::crawler::frontier::{Frontier, FrontierEntry};
use crate::crawler::monitor::CompletionMonitor;
use crate::crawler::parser::extract_listing_links;
use crate::crawler::pool::{BatchOutcome, DetailPool};
use crate::crawler::{Aggregator, ExtractionRules, JobRecord};
use crate::state::CrawlState;
use crate::url::{extract_domain, ListingUrlBuilder};
use crate::{SourcetapError, UrlError};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Counters accumulated over one walk
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Listing pages requested (successfully or not)
    pub pages_walked: u32,
    /// Listing pages whose request or URL build failed
    pub listing_failures: u32,
    /// Candidate links found across all listing pages, duplicates included
    pub links_seen: usize,
    /// Links admitted to the frontier
    pub links_admitted: usize,
    pub details_succeeded: usize,
    pub details_failed: usize,
    /// Pages that admitted no new postings
    pub empty_pages: u32,
}

impl CrawlStats {
    fn absorb(&mut self, outcome: &BatchOutcome) {
        self.details_succeeded += outcome.succeeded;
        self.details_failed += outcome.failed;
    }
}

/// Which signal ended the wait for a crawl
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionSignal {
    /// The walker finished its pages and drained the final batch
    Event,
    /// The aggregator stopped growing first; the walker was aborted
    Stability,
}

/// What a caller gets back once a crawl is considered done
#[derive(Debug, Clone)]
pub struct CrawlOutcome {
    pub records: Vec<JobRecord>,
    /// Walker statistics; absent when the walker was aborted
    pub stats: Option<CrawlStats>,
    pub signal: CompletionSignal,
}

/// Main crawler coordinator structure
pub struct Coordinator {
    fetcher: Arc<dyn PageFetcher>,
    listing: ListingUrlBuilder,
    allowed_domain: String,
    state: CrawlState,
    pool: DetailPool,
    aggregator: Arc<Aggregator>,
    request_delay: Duration,
    max_consecutive_empty: Option<u32>,
    stats: CrawlStats,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fetcher` - Transport for listing and detail pages
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Ready to walk from page 1
    /// * `Err(SourcetapError)` - The site URL or extraction rules are unusable
    pub fn new(config: &Config, fetcher: Arc<dyn PageFetcher>) -> Result<Self, SourcetapError> {
        let listing = ListingUrlBuilder::new(
            &config.site.base_url,
            &config.site.listing_path,
            &config.search.query,
        )?;
        let allowed_domain = extract_domain(listing.base()).ok_or(UrlError::MissingDomain)?;

        let frontier = Arc::new(Frontier::new());
        let aggregator = Arc::new(Aggregator::new());
        let request_delay = Duration::from_millis(config.crawler.request_delay_ms);

        let pool = DetailPool::new(
            Arc::clone(&fetcher),
            Arc::new(ExtractionRules::worksource()?),
            Arc::clone(&frontier),
            Arc::clone(&aggregator),
            config.crawler.max_concurrent_fetches as usize,
            request_delay,
        );

        Ok(Self {
            fetcher,
            listing,
            allowed_domain,
            state: CrawlState::with_frontier(config.crawler.max_pages, frontier),
            pool,
            aggregator,
            request_delay,
            max_consecutive_empty: config.crawler.max_consecutive_empty_pages,
            stats: CrawlStats::default(),
        })
    }

    /// Creates a coordinator backed by a real HTTP client
    pub fn from_config(config: &Config) -> Result<Self, SourcetapError> {
        let fetcher = HttpFetcher::from_config(&config.http)?;
        Self::new(config, Arc::new(fetcher))
    }

    pub fn aggregator(&self) -> Arc<Aggregator> {
        Arc::clone(&self.aggregator)
    }

    pub fn state(&self) -> &CrawlState {
        &self.state
    }

    pub fn records(&self) -> Vec<JobRecord> {
        self.aggregator.snapshot()
    }

    /// Walks listing pages until the page cap (or the empty-page limit)
    ///
    /// Listing and detail failures are logged and counted; the walk itself
    /// cannot fail.
    pub async fn run(&mut self) -> CrawlStats {
        let start_time = Instant::now();
        let mut consecutive_empty = 0u32;

        tracing::info!(
            "Starting walk of up to {} listing pages on {} ({} concurrent detail fetches)",
            self.state.max_pages(),
            self.allowed_domain,
            self.pool.max_concurrent()
        );

        while let Some(page) = self.state.advance() {
            if page > 1 && !self.request_delay.is_zero() {
                tokio::time::sleep(self.request_delay).await;
            }

            self.stats.pages_walked += 1;
            let admitted = self.walk_page(page).await;

            if admitted > 0 {
                consecutive_empty = 0;
                continue;
            }

            self.stats.empty_pages += 1;
            consecutive_empty += 1;
            if let Some(limit) = self.max_consecutive_empty {
                if consecutive_empty >= limit {
                    tracing::info!(
                        "Stopping after {} consecutive pages without new postings",
                        consecutive_empty
                    );
                    break;
                }
            }
        }

        let frontier = self.state.frontier();
        tracing::info!(
            "Walk completed at page {}/{}{}: {} postings seen, {} processed, {} records in {:?}",
            self.state.current_page(),
            self.state.max_pages(),
            if self.state.is_exhausted() { "" } else { " (stopped early)" },
            frontier.seen_count(),
            frontier.processed_ids().len(),
            self.aggregator.count(),
            start_time.elapsed()
        );

        self.stats
    }

    /// Processes one listing page and its detail batch
    ///
    /// Returns the number of postings admitted from this page.
    async fn walk_page(&mut self, page: u32) -> usize {
        let url = match self.listing.page_url(page) {
            Ok(url) => url,
            Err(e) => {
                tracing::warn!("Could not build listing URL for page {}: {}", page, e);
                self.stats.listing_failures += 1;
                return 0;
            }
        };

        tracing::info!(
            "Fetching listing page {}/{}: {}",
            page,
            self.state.max_pages(),
            url
        );

        let body = match self.fetcher.fetch(&url).await {
            FetchResult::Success { body, .. } => body,
            failure => {
                tracing::warn!(
                    "Listing page {} failed: {}",
                    page,
                    failure.failure_reason().unwrap_or_default()
                );
                self.stats.listing_failures += 1;
                return 0;
            }
        };

        let links = extract_listing_links(&body, self.listing.base(), &self.allowed_domain);
        self.stats.links_seen += links.len();

        let frontier = self.state.frontier();
        let mut admitted = 0;
        for link in links {
            let posting_id = link.posting_id.clone();
            let entry = FrontierEntry {
                posting_id: link.posting_id,
                detail_url: link.url,
                discovered_on_page: page,
            };
            if frontier.admit(entry) {
                admitted += 1;
            } else {
                tracing::debug!("Posting {} already known", posting_id);
            }
        }
        self.stats.links_admitted += admitted;

        let batch = frontier.take_pending();
        let outcome = self.pool.fetch_all(batch).await;
        self.stats.absorb(&outcome);

        tracing::info!(
            "Page {} drained: {} new, {} ok, {} failed, {} skipped",
            page,
            admitted,
            outcome.succeeded,
            outcome.failed,
            outcome.skipped
        );

        admitted
    }

    /// Runs the walk on a tokio task
    ///
    /// The returned handle observes the explicit completion event, which is
    /// sent after the last page's batch has drained.
    pub fn spawn(mut self) -> CrawlHandle {
        let aggregator = Arc::clone(&self.aggregator);
        let (done_tx, done_rx) = watch::channel(false);

        let task = tokio::spawn(async move {
            let stats = self.run().await;
            // No receivers left just means nobody is waiting.
            let _ = done_tx.send(true);
            stats
        });

        CrawlHandle {
            aggregator,
            completed: done_rx,
            task,
        }
    }
}

/// Handle to a crawl running in the background
pub struct CrawlHandle {
    aggregator: Arc<Aggregator>,
    completed: watch::Receiver<bool>,
    task: JoinHandle<CrawlStats>,
}

impl CrawlHandle {
    pub fn aggregator(&self) -> &Arc<Aggregator> {
        &self.aggregator
    }

    pub fn is_complete(&self) -> bool {
        *self.completed.borrow()
    }

    /// Waits for the explicit completion event
    pub async fn wait(mut self) -> Result<(Vec<JobRecord>, CrawlStats), SourcetapError> {
        completion_event(&mut self.completed).await;
        let stats = self
            .task
            .await
            .map_err(|e| SourcetapError::Task(e.to_string()))?;
        Ok((self.aggregator.snapshot(), stats))
    }

    /// Races the stability heuristic against the completion event
    ///
    /// The event wins whenever it has fired. If the aggregator stabilizes
    /// first, the walker is aborted and the current snapshot is returned.
    pub async fn wait_stable_or_complete(
        mut self,
        monitor: &CompletionMonitor,
    ) -> Result<CrawlOutcome, SourcetapError> {
        let aggregator = Arc::clone(&self.aggregator);
        let signal = {
            let completed = &mut self.completed;
            tokio::select! {
                biased;
                _ = completion_event(completed) => CompletionSignal::Event,
                _ = monitor.wait_for_stable(aggregator.as_ref()) => CompletionSignal::Stability,
            }
        };

        if signal == CompletionSignal::Event || self.is_complete() {
            let (records, stats) = self.wait().await?;
            return Ok(CrawlOutcome {
                records,
                stats: Some(stats),
                signal: CompletionSignal::Event,
            });
        }

        tracing::warn!(
            "Aggregator stable at {} records before the walk finished; aborting walker",
            aggregator.count()
        );
        self.task.abort();

        Ok(CrawlOutcome {
            records: aggregator.snapshot(),
            stats: None,
            signal: CompletionSignal::Stability,
        })
    }

    /// Waits according to the configured completion strategy
    pub async fn finish(self, config: &Config) -> Result<CrawlOutcome, SourcetapError> {
        match config.completion.strategy {
            CompletionStrategy::Event => {
                let (records, stats) = self.wait().await?;
                Ok(CrawlOutcome {
                    records,
                    stats: Some(stats),
                    signal: CompletionSignal::Event,
                })
            }
            CompletionStrategy::Stable => {
                let monitor = CompletionMonitor::new(
                    Duration::from_millis(config.completion.poll_interval_ms),
                    config.completion.stability_threshold,
                );
                self.wait_stable_or_complete(&monitor).await
            }
        }
    }
}

/// Resolves once the flag is true; also resolves if the sender is gone
async fn completion_event(completed: &mut watch::Receiver<bool>) {
    while !*completed.borrow_and_update() {
        if completed.changed().await.is_err() {
            return;
        }
    }
}

/// Runs a complete crawl with the configured transport and completion strategy
///
/// # Example
///
/// ```no_run
/// use sourcetap::config::load_config;
/// use sourcetap::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("sourcetap.toml"))?;
/// let outcome = run_crawl(&config).await?;
/// println!("{} postings", outcome.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: &Config) -> Result<CrawlOutcome, SourcetapError> {
    Coordinator::from_config(config)?.spawn().finish(config).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::parse_config;
    use crate::url::PostingId;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use url::Url;

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        ListingStart(u32),
        DetailStart(String),
        DetailEnd(String),
    }

    /// In-process job board: listing pages by number, detail pages by id
    #[derive(Default)]
    struct ScriptedSite {
        listings: HashMap<u32, Vec<&'static str>>,
        failing_listings: HashSet<u32>,
        failing_details: HashSet<&'static str>,
        /// Detail ids whose page is served from another id's URL
        redirects: HashMap<&'static str, &'static str>,
        events: Mutex<Vec<Event>>,
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    impl ScriptedSite {
        fn page(mut self, n: u32, ids: Vec<&'static str>) -> Self {
            self.listings.insert(n, ids);
            self
        }

        fn events(&self) -> Vec<Event> {
            self.events.lock().unwrap().clone()
        }

        fn detail_fetches(&self) -> Vec<String> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::DetailStart(id) => Some(id),
                    _ => None,
                })
                .collect()
        }

        fn listing_requests(&self) -> Vec<u32> {
            self.events()
                .into_iter()
                .filter_map(|e| match e {
                    Event::ListingStart(n) => Some(n),
                    _ => None,
                })
                .collect()
        }
    }

    fn query_value(url: &Url, key: &str) -> Option<String> {
        url.query_pairs()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.into_owned())
    }

    fn html(url: &Url, body: String) -> FetchResult {
        FetchResult::Success {
            final_url: url.clone(),
            status_code: 200,
            content_type: "text/html".to_string(),
            body,
        }
    }

    #[async_trait]
    impl PageFetcher for ScriptedSite {
        async fn fetch(&self, url: &Url) -> FetchResult {
            if let Some(id) = query_value(url, "JobID") {
                self.events
                    .lock()
                    .unwrap()
                    .push(Event::DetailStart(id.clone()));
                let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                self.peak.fetch_max(now, Ordering::SeqCst);

                tokio::time::sleep(Duration::from_millis(5)).await;

                self.in_flight.fetch_sub(1, Ordering::SeqCst);
                self.events.lock().unwrap().push(Event::DetailEnd(id.clone()));

                if self.failing_details.contains(id.as_str()) {
                    return FetchResult::HttpError { status_code: 500 };
                }
                if let Some(target) = self.redirects.get(id.as_str()) {
                    let moved = Url::parse(&format!(
                        "https://seeker.worksourcewa.com/jobsearch/powersearch.aspx?JobID={}",
                        target
                    ))
                    .unwrap();
                    return html(&moved, format!("<h1 class=\"margin-bottom\">Job {}</h1>", target));
                }
                return html(url, format!("<h1 class=\"margin-bottom\">Job {}</h1>", id));
            }

            let page: u32 = query_value(url, "page")
                .and_then(|p| p.parse().ok())
                .unwrap_or(0);
            self.events.lock().unwrap().push(Event::ListingStart(page));

            if self.failing_listings.contains(&page) {
                return FetchResult::NetworkError {
                    error: "connection reset".to_string(),
                };
            }

            let ids = self.listings.get(&page).cloned().unwrap_or_default();
            let body: String = ids
                .iter()
                .map(|id| {
                    format!(
                        r#"<h2 class="with-badge"><a href="/jobsearch/powersearch.aspx?JobID={}">x</a></h2>"#,
                        id
                    )
                })
                .collect();
            html(url, body)
        }
    }

    fn config(max_pages: u32, extra: &str) -> Config {
        parse_config(&format!(
            r#"
[search]
query = "Software Engineer"

[site]
base-url = "https://seeker.worksourcewa.com"

[crawler]
max-pages = {}
max-concurrent-fetches = 2
{}

[output]
database-path = "./unused.db"
"#,
            max_pages, extra
        ))
        .unwrap()
    }

    fn coordinator(site: &Arc<ScriptedSite>, config: &Config) -> Coordinator {
        let fetcher: Arc<dyn PageFetcher> = site.clone();
        Coordinator::new(config, fetcher).unwrap()
    }

    fn record_ids(coordinator: &Coordinator) -> Vec<String> {
        let mut ids: Vec<String> = coordinator
            .records()
            .iter()
            .map(|r| r.posting_id.to_string())
            .collect();
        ids.sort();
        ids
    }

    #[tokio::test]
    async fn test_redirected_posting_is_not_refetched_under_its_own_id() {
        let mut site = ScriptedSite::default()
            .page(1, vec!["100"])
            .page(2, vec!["200", "300"]);
        site.redirects.insert("100", "200");
        let site = Arc::new(site);
        let mut coordinator = coordinator(&site, &config(2, ""));

        let stats = coordinator.run().await;

        let mut fetched = site.detail_fetches();
        fetched.sort();
        assert_eq!(fetched, vec!["100", "300"]);
        assert_eq!(record_ids(&coordinator), vec!["200", "300"]);
        assert_eq!(stats.links_admitted, 2);
    }

    #[tokio::test]
    async fn test_redirect_onto_failed_posting_keeps_records_processed() {
        let mut site = ScriptedSite::default()
            .page(1, vec!["200"])
            .page(2, vec!["100"]);
        site.failing_details.insert("200");
        site.redirects.insert("100", "200");
        let site = Arc::new(site);
        let mut coordinator = coordinator(&site, &config(2, ""));

        let stats = coordinator.run().await;

        assert_eq!(record_ids(&coordinator), vec!["200"]);
        assert_eq!(stats.details_failed, 1);
        assert_eq!(stats.details_succeeded, 1);
        let processed = coordinator.state().frontier().processed_ids();
        for record in coordinator.records() {
            assert!(processed.contains(&record.posting_id));
        }
    }

    #[tokio::test]
    async fn test_same_page_redirect_appends_canonical_posting_once() {
        let mut site = ScriptedSite::default().page(1, vec!["200", "100"]);
        site.redirects.insert("100", "200");
        let site = Arc::new(site);
        let mut coordinator = coordinator(&site, &config(1, ""));

        let stats = coordinator.run().await;

        assert_eq!(record_ids(&coordinator), vec!["200"]);
        assert_eq!(stats.details_succeeded, 1);
        assert_eq!(stats.details_failed, 0);
    }

    #[tokio::test]
    async fn test_overlapping_pages_fetch_each_posting_once() {
        let site = Arc::new(ScriptedSite::default().page(1, vec!["1", "2"]).page(2, vec!["2", "3"]));
        let mut coordinator = coordinator(&site, &config(2, ""));

        let stats = coordinator.run().await;

        let mut fetched = site.detail_fetches();
        fetched.sort();
        assert_eq!(fetched, vec!["1", "2", "3"]);
        assert_eq!(coordinator.records().len(), 3);
        assert_eq!(stats.links_seen, 4);
        assert_eq!(stats.links_admitted, 3);
        assert_eq!(stats.details_succeeded, 3);
    }

    #[tokio::test]
    async fn test_duplicate_on_same_page_fetched_once() {
        let site = Arc::new(ScriptedSite::default().page(1, vec!["7", "7", "8", "7"]));
        let mut coordinator = coordinator(&site, &config(1, ""));

        coordinator.run().await;

        assert_eq!(site.detail_fetches().len(), 2);
    }

    #[tokio::test]
    async fn test_batch_drains_before_next_listing_request() {
        let site = Arc::new(
            ScriptedSite::default()
                .page(1, vec!["1", "2", "3", "4", "5"])
                .page(2, vec!["6", "7", "8"])
                .page(3, vec!["9"]),
        );
        let mut coordinator = coordinator(&site, &config(3, ""));
        coordinator.run().await;

        let events = site.events();
        let listing_at = |n: u32| {
            events
                .iter()
                .position(|e| *e == Event::ListingStart(n))
                .unwrap()
        };
        let end_at = |id: &str| {
            events
                .iter()
                .position(|e| *e == Event::DetailEnd(id.to_string()))
                .unwrap()
        };

        for id in ["1", "2", "3", "4", "5"] {
            assert!(end_at(id) < listing_at(2));
        }
        for id in ["6", "7", "8"] {
            assert!(end_at(id) < listing_at(3));
        }
        assert!(site.peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_page_cap_is_respected() {
        let site = Arc::new(ScriptedSite::default().page(1, vec!["1"]));
        let mut coordinator = coordinator(&site, &config(4, ""));

        let stats = coordinator.run().await;

        assert_eq!(site.listing_requests(), vec![1, 2, 3, 4]);
        assert_eq!(stats.pages_walked, 4);
        assert_eq!(stats.empty_pages, 3);
        assert_eq!(coordinator.state().current_page(), 4);
        assert!(coordinator.state().is_exhausted());
    }

    #[tokio::test]
    async fn test_listing_failure_continues_walk() {
        let mut site = ScriptedSite::default()
            .page(1, vec!["1"])
            .page(2, vec!["2"])
            .page(3, vec!["3"]);
        site.failing_listings.insert(2);
        let site = Arc::new(site);
        let mut coordinator = coordinator(&site, &config(3, ""));

        let stats = coordinator.run().await;

        assert_eq!(stats.listing_failures, 1);
        assert_eq!(site.listing_requests(), vec![1, 2, 3]);
        assert_eq!(coordinator.records().len(), 2);
    }

    #[tokio::test]
    async fn test_detail_failure_does_not_block_pagination() {
        let mut site = ScriptedSite::default()
            .page(1, vec!["1", "2"])
            .page(2, vec!["2", "3"]);
        site.failing_details.insert("2");
        let site = Arc::new(site);
        let mut coordinator = coordinator(&site, &config(2, ""));

        let stats = coordinator.run().await;

        assert_eq!(stats.details_failed, 1);
        assert_eq!(stats.details_succeeded, 2);
        // A failed posting is not retried when it shows up again.
        assert_eq!(site.detail_fetches().iter().filter(|id| *id == "2").count(), 1);
        let processed = coordinator.state().frontier().processed_ids();
        assert!(!processed.contains(&PostingId::from("2")));
        for record in coordinator.records() {
            assert!(processed.contains(&record.posting_id));
        }
    }

    #[tokio::test]
    async fn test_consecutive_empty_pages_stop_walk_early() {
        let site = Arc::new(ScriptedSite::default().page(1, vec!["1"]));
        let mut coordinator = coordinator(&site, &config(10, "max-consecutive-empty-pages = 2"));

        let stats = coordinator.run().await;

        assert_eq!(site.listing_requests(), vec![1, 2, 3]);
        assert_eq!(stats.empty_pages, 2);
    }

    #[tokio::test]
    async fn test_spawned_crawl_signals_completion() {
        let site = Arc::new(ScriptedSite::default().page(1, vec!["1", "2"]).page(2, vec!["3"]));
        let handle = coordinator(&site, &config(2, "")).spawn();

        let (records, stats) = handle.wait().await.unwrap();

        assert_eq!(records.len(), 3);
        assert_eq!(stats.pages_walked, 2);
    }

    #[tokio::test]
    async fn test_event_wins_over_slow_stability() {
        let site = Arc::new(ScriptedSite::default().page(1, vec!["1", "2", "3"]));
        let handle = coordinator(&site, &config(1, "")).spawn();
        let monitor = CompletionMonitor::new(Duration::from_secs(60), 5);

        let outcome = handle.wait_stable_or_complete(&monitor).await.unwrap();

        assert_eq!(outcome.signal, CompletionSignal::Event);
        assert_eq!(outcome.records.len(), 3);
        assert!(outcome.stats.is_some());
    }

    #[tokio::test]
    async fn test_stability_before_event_aborts_walker() {
        // Zero new postings for many pages with a delay: the count sits at 0.
        let site = Arc::new(ScriptedSite::default());
        let handle = coordinator(&site, &config(1000, "request-delay-ms = 20")).spawn();
        let monitor = CompletionMonitor::new(Duration::from_millis(1), 3);

        let outcome = handle.wait_stable_or_complete(&monitor).await.unwrap();

        assert_eq!(outcome.signal, CompletionSignal::Stability);
        assert!(outcome.records.is_empty());
        assert!(outcome.stats.is_none());
    }
}
