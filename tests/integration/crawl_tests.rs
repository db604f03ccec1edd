//! Integration tests for the crawler
//!
//! These tests use wiremock to serve listing and detail pages and run the
//! full walk end-to-end over real HTTP.

use sourcetap::config::{parse_config, Config};
use sourcetap::crawler::{run_crawl, CompletionSignal, Coordinator};
use sourcetap::PostingId;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const LISTING_PATH: &str = "/jobsearch/search";
const DETAIL_PATH: &str = "/jobsearch/detail";

fn test_config(base_url: &str, max_pages: u32) -> Config {
    parse_config(&format!(
        r#"
[search]
query = "Software Engineer"

[site]
base-url = "{base_url}"
listing-path = "{LISTING_PATH}"

[crawler]
max-pages = {max_pages}
max-concurrent-fetches = 2

[output]
database-path = "unused.db"
"#
    ))
    .expect("test config should parse")
}

fn listing_page(ids: &[&str]) -> String {
    let items: String = ids
        .iter()
        .map(|id| {
            format!(
                r#"<h2 class="with-badge"><a href="{DETAIL_PATH}?JobID={id}">Job {id}</a></h2>"#
            )
        })
        .collect();
    format!("<html><body>{}</body></html>", items)
}

fn detail_page(id: &str) -> String {
    format!(
        r#"<html><body>
        <h1 class="margin-bottom">Engineer {id}</h1>
        <h4><span class="capital-letter">Acme {id}</span> <small class="wrappable">Seattle, WA</small></h4>
        <span id="TrackingJobBody">Write Rust for posting {id}.</span>
        </body></html>"#
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body, "text/html; charset=utf-8")
}

async fn mount_listing(server: &MockServer, page: u32, ids: &[&str]) {
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", page.to_string()))
        .respond_with(html(listing_page(ids)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_detail(server: &MockServer, id: &str) {
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("JobID", id))
        .respond_with(html(detail_page(id)))
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_overlapping_pages_fetch_each_posting_once() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["101", "102"]).await;
    mount_listing(&server, 2, &["102", "103"]).await;
    for id in ["101", "102", "103"] {
        mount_detail(&server, id).await;
    }

    let config = test_config(&server.uri(), 2);
    let outcome = run_crawl(&config).await.unwrap();

    assert_eq!(outcome.signal, CompletionSignal::Event);
    let mut ids: Vec<String> = outcome
        .records
        .iter()
        .map(|r| r.posting_id.to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["101", "102", "103"]);

    let first = outcome
        .records
        .iter()
        .find(|r| r.posting_id == PostingId::from("101"))
        .unwrap();
    assert_eq!(first.title, "Engineer 101");
    assert_eq!(first.company, "Acme 101");
    assert_eq!(first.location, "Seattle, WA");
    assert_eq!(first.discovered_on_page, 1);

    let third = outcome
        .records
        .iter()
        .find(|r| r.posting_id == PostingId::from("103"))
        .unwrap();
    assert_eq!(third.discovered_on_page, 2);

    let stats = outcome.stats.unwrap();
    assert_eq!(stats.pages_walked, 2);
    assert_eq!(stats.links_seen, 4);
    assert_eq!(stats.links_admitted, 3);
    assert_eq!(stats.details_succeeded, 3);
    // the `.expect(1)` on every mock is verified when the server drops
}

#[tokio::test]
async fn test_listing_error_does_not_stop_walk() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "1"))
        .respond_with(ResponseTemplate::new(500))
        .expect(1)
        .mount(&server)
        .await;
    mount_listing(&server, 2, &["201"]).await;
    mount_detail(&server, "201").await;

    let config = test_config(&server.uri(), 2);
    let outcome = run_crawl(&config).await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    let stats = outcome.stats.unwrap();
    assert_eq!(stats.listing_failures, 1);
    assert_eq!(stats.empty_pages, 1);
    assert_eq!(stats.pages_walked, 2);
}

#[tokio::test]
async fn test_failed_detail_counts_toward_drain() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["301", "302"]).await;
    mount_listing(&server, 2, &["302", "303"]).await;
    mount_detail(&server, "301").await;
    mount_detail(&server, "303").await;
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("JobID", "302"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;

    let config = test_config(&server.uri(), 2);
    let outcome = run_crawl(&config).await.unwrap();

    let stats = outcome.stats.unwrap();
    assert_eq!(stats.details_succeeded, 2);
    assert_eq!(stats.details_failed, 1);
    assert_eq!(outcome.records.len(), 2);
    assert!(outcome
        .records
        .iter()
        .all(|r| r.posting_id != PostingId::from("302")));
}

#[tokio::test]
async fn test_off_site_links_are_ignored() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(LISTING_PATH))
        .and(query_param("page", "1"))
        .respond_with(html(
            r#"<html><body>
            <h2 class="with-badge"><a href="https://elsewhere.example/detail?JobID=9">Away</a></h2>
            <h2 class="with-badge"><a href="/jobsearch/detail?JobID=401">Home</a></h2>
            </body></html>"#
                .to_string(),
        ))
        .mount(&server)
        .await;
    mount_detail(&server, "401").await;

    let config = test_config(&server.uri(), 1);
    let outcome = run_crawl(&config).await.unwrap();

    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.records[0].posting_id, PostingId::from("401"));
}

#[tokio::test]
async fn test_spawned_crawl_waits_for_completion() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["501", "502", "503"]).await;
    for id in ["501", "502", "503"] {
        mount_detail(&server, id).await;
    }

    let config = test_config(&server.uri(), 1);
    let handle = Coordinator::from_config(&config).unwrap().spawn();
    let aggregator = std::sync::Arc::clone(handle.aggregator());

    let (records, stats) = handle.wait().await.unwrap();

    assert_eq!(records.len(), 3);
    assert_eq!(aggregator.count(), 3);
    assert_eq!(stats.pages_walked, 1);
}

#[tokio::test]
async fn test_redirected_detail_is_recorded_under_final_id() {
    let server = MockServer::start().await;
    mount_listing(&server, 1, &["100"]).await;
    mount_listing(&server, 2, &["200", "601"]).await;
    Mock::given(method("GET"))
        .and(path(DETAIL_PATH))
        .and(query_param("JobID", "100"))
        .respond_with(
            ResponseTemplate::new(302)
                .insert_header("location", format!("{DETAIL_PATH}?JobID=200").as_str()),
        )
        .expect(1)
        .mount(&server)
        .await;
    // Reached only through the redirect; page 2 must not request it again.
    mount_detail(&server, "200").await;
    mount_detail(&server, "601").await;

    let config = test_config(&server.uri(), 2);
    let outcome = run_crawl(&config).await.unwrap();

    let mut ids: Vec<String> = outcome
        .records
        .iter()
        .map(|r| r.posting_id.to_string())
        .collect();
    ids.sort();
    assert_eq!(ids, vec!["200", "601"]);

    let moved = outcome
        .records
        .iter()
        .find(|r| r.posting_id == PostingId::from("200"))
        .unwrap();
    assert_eq!(moved.title, "Engineer 200");
    assert!(moved.url.ends_with("JobID=200"));
    assert_eq!(moved.discovered_on_page, 1);

    let stats = outcome.stats.unwrap();
    assert_eq!(stats.links_admitted, 2);
    assert_eq!(stats.details_succeeded, 2);
}
