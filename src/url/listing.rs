use crate::UrlError;
use crate::UrlResult;
use url::Url;

/// Fixed search parameters appended to every listing request
const LISTING_PARAMS: &str = "rad_units=miles&pp=25&nosal=true&vw=b&setype=2";

/// Normalizes a free-text query for the listing URL
///
/// Trims, lower-cases, and replaces spaces with `+`.
///
/// # Examples
///
/// ```
/// use sourcetap::url::format_query;
///
/// assert_eq!(format_query("  Software Engineer "), "software+engineer");
/// ```
pub fn format_query(query: &str) -> String {
    query.trim().to_lowercase().replace(' ', "+")
}

/// Builds listing page URLs for one query
#[derive(Debug, Clone)]
pub struct ListingUrlBuilder {
    base: Url,
    listing_path: String,
    query: String,
}

impl ListingUrlBuilder {
    /// Creates a builder rooted at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - Site origin, e.g. `https://seeker.worksourcewa.com`
    /// * `listing_path` - Path of the search results page
    /// * `query` - Raw query; it is normalized with [`format_query`]
    pub fn new(base_url: &str, listing_path: &str, query: &str) -> UrlResult<Self> {
        let base = Url::parse(base_url).map_err(|e| UrlError::Parse(e.to_string()))?;

        if base.scheme() != "http" && base.scheme() != "https" {
            return Err(UrlError::InvalidScheme(base.scheme().to_string()));
        }
        if base.host_str().is_none() {
            return Err(UrlError::MissingDomain);
        }

        Ok(Self {
            base,
            listing_path: listing_path.to_string(),
            query: format_query(query),
        })
    }

    /// The site origin listing hrefs are resolved against
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Returns the URL of listing page `page` (1-based)
    pub fn page_url(&self, page: u32) -> UrlResult<Url> {
        let raw = format!(
            "{}://{}{}?q={}&{}&page={}",
            self.base.scheme(),
            self.authority(),
            self.listing_path,
            self.query,
            LISTING_PARAMS,
            page
        );
        Url::parse(&raw).map_err(|e| UrlError::Malformed(format!("{}: {}", raw, e)))
    }

    fn authority(&self) -> String {
        let host = self.base.host_str().unwrap_or_default();
        match self.base.port() {
            Some(port) => format!("{}:{}", host, port),
            None => host.to_string(),
        }
    }
}
