use url::Url;

/// Extracts the domain from a URL
///
/// This function retrieves the host portion of a URL and converts it to lowercase.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use sourcetap::url::extract_domain;
///
/// let url = Url::parse("https://SEEKER.worksourcewa.com/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("seeker.worksourcewa.com".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    url.host_str().map(|h| h.to_lowercase())
}

/// Returns true if `url` is on exactly the allowed domain
///
/// Subdomains are not accepted; the crawl is confined to one host.
pub fn is_allowed_domain(url: &Url, allowed: &str) -> bool {
    extract_domain(url).is_some_and(|domain| domain == allowed.to_lowercase())
}
