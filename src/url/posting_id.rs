use serde::{Deserialize, Serialize};
use std::fmt;

/// Query key that carries the posting identifier on the target site
const POSTING_ID_KEY: &str = "JobID=";

/// Identifier of a single job posting, unique per site
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostingId(String);

impl PostingId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PostingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for PostingId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Extracts the posting id from a listing href or detail URL
///
/// The id is the run of ASCII digits immediately following the first
/// `JobID=` occurrence. Works on relative hrefs as well as absolute URLs.
///
/// # Examples
///
/// ```
/// use sourcetap::url::extract_posting_id;
///
/// let id = extract_posting_id("/jobsearch/powersearch.aspx?JobID=12345&q=rust").unwrap();
/// assert_eq!(id.as_str(), "12345");
///
/// assert!(extract_posting_id("/jobsearch/powersearch.aspx?JobID=abc").is_none());
/// ```
pub fn extract_posting_id(link: &str) -> Option<PostingId> {
    let start = link.find(POSTING_ID_KEY)? + POSTING_ID_KEY.len();
    let digits: String = link[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();

    if digits.is_empty() {
        None
    } else {
        Some(PostingId(digits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_from_relative_href() {
        let id = extract_posting_id("/jobsearch/powersearch.aspx?JobID=98765").unwrap();
        assert_eq!(id, PostingId::from("98765"));
    }

    #[test]
    fn test_extract_from_absolute_url_with_trailing_params() {
        let id = extract_posting_id(
            "https://seeker.worksourcewa.com/jobsearch/powersearch.aspx?jobid=1&JobID=4242&q=rust",
        )
        .unwrap();
        assert_eq!(id.as_str(), "4242");
    }

    #[test]
    fn test_first_occurrence_wins() {
        let id = extract_posting_id("/a?JobID=11&JobID=22").unwrap();
        assert_eq!(id.as_str(), "11");
    }

    #[test]
    fn test_missing_key() {
        assert!(extract_posting_id("/jobsearch/powersearch.aspx?q=rust").is_none());
    }

    #[test]
    fn test_key_without_digits() {
        assert!(extract_posting_id("/a?JobID=&q=1").is_none());
        assert!(extract_posting_id("/a?JobID=x12").is_none());
    }

    #[test]
    fn test_display() {
        assert_eq!(PostingId::new("77").to_string(), "77");
    }
}
