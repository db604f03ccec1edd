//! URL handling module for Sourcetap
//!
//! This module provides listing URL construction, posting id extraction,
//! link resolution, and the single-domain check.

mod domain;
mod listing;
mod posting_id;

pub use domain::{extract_domain, is_allowed_domain};
pub use listing::{format_query, ListingUrlBuilder};
pub use posting_id::{extract_posting_id, PostingId};

use url::Url;

/// Resolves a link href to an absolute URL and validates it
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - fragment-only anchors
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
///
/// Relative paths are rooted against `base_url`.
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();

    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    if href.starts_with("javascript:")
        || href.starts_with("mailto:")
        || href.starts_with("tel:")
        || href.starts_with("data:")
    {
        return None;
    }

    match base_url.join(href) {
        Ok(absolute_url) if absolute_url.scheme() == "http" || absolute_url.scheme() == "https" => {
            Some(absolute_url)
        }
        _ => None,
    }
}
