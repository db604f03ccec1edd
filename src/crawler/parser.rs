//! Listing page parser
//!
//! Extracts candidate posting links from a search results page.

use crate::url::{extract_posting_id, is_allowed_domain, resolve_link, PostingId};
use scraper::{Html, Selector};
use url::Url;

/// Heading that wraps each result on the listing page
const RESULT_HEADING_SELECTOR: &str = "h2.with-badge";

/// A posting link found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingLink {
    pub posting_id: PostingId,
    pub url: Url,
}

/// Extracts posting links from a listing page
///
/// # Link Extraction Rules
///
/// - Only the first `<a href>` inside each `h2.with-badge` is considered
/// - Relative hrefs are rooted against `base_url`
/// - Links off `allowed_domain` are dropped
/// - Links without a `JobID=<digits>` id are dropped
///
/// Duplicates are kept, in page order; deduplication is the frontier's job.
///
/// # Example
///
/// ```
/// use sourcetap::crawler::extract_listing_links;
/// use url::Url;
///
/// let html = r#"<h2 class="with-badge"><a href="/jobsearch/powersearch.aspx?JobID=7">Dev</a></h2>"#;
/// let base = Url::parse("https://seeker.worksourcewa.com").unwrap();
/// let links = extract_listing_links(html, &base, "seeker.worksourcewa.com");
/// assert_eq!(links[0].posting_id.as_str(), "7");
/// ```
pub fn extract_listing_links(html: &str, base_url: &Url, allowed_domain: &str) -> Vec<ListingLink> {
    let document = Html::parse_document(html);
    let mut links = Vec::new();

    let (Ok(heading_selector), Ok(anchor_selector)) = (
        Selector::parse(RESULT_HEADING_SELECTOR),
        Selector::parse("a[href]"),
    ) else {
        return links;
    };

    for heading in document.select(&heading_selector) {
        let Some(href) = heading
            .select(&anchor_selector)
            .next()
            .and_then(|a| a.value().attr("href"))
        else {
            continue;
        };

        let Some(posting_id) = extract_posting_id(href) else {
            tracing::debug!("No posting id in listing href {}", href);
            continue;
        };

        let Some(url) = resolve_link(href, base_url) else {
            tracing::debug!("Unresolvable listing href {}", href);
            continue;
        };

        if !is_allowed_domain(&url, allowed_domain) {
            tracing::debug!("Skipping off-site posting link {}", url);
            continue;
        }

        links.push(ListingLink { posting_id, url });
    }

    links
}
