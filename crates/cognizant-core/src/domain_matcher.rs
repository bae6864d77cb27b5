use cognizant_storage::normalize_watchlist;
use url::Url;

use crate::error::WatchError;

/// Extract the host of `url` without a leading `www.` label.
///
/// Malformed URLs give an empty string, which never matches a watch list entry.
#[must_use]
pub fn extract_domain(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => {
            let host = parsed.host_str().unwrap_or_default();
            host.strip_prefix("www.").unwrap_or(host).to_string()
        }
        Err(e) => {
            let err = WatchError::MalformedUrl {
                url: url.to_string(),
                reason: e.to_string(),
            };
            log::debug!("{err}");
            String::new()
        }
    }
}

/// Decides whether a URL belongs to a watched site.
///
/// Membership is substring containment on the host, so "facebook.com" also
/// matches "notfacebook.com.evil.tld". This is a nudge, not a security boundary.
#[derive(Debug, Clone, Default)]
pub struct DomainMatcher {
    watchlist: Vec<String>,
}

impl DomainMatcher {
    #[must_use]
    pub fn new(watchlist: Vec<String>) -> Self {
        Self {
            watchlist: normalize_watchlist(watchlist),
        }
    }

    /// Replace the watch list wholesale
    pub fn replace(&mut self, watchlist: Vec<String>) {
        self.watchlist = normalize_watchlist(watchlist);
        log::info!("Updated watchlist: {:?}", self.watchlist);
    }

    #[must_use]
    pub fn watchlist(&self) -> &[String] {
        &self.watchlist
    }

    #[must_use]
    pub fn matches(&self, url: &str) -> bool {
        self.matches_domain(&extract_domain(url))
    }

    #[must_use]
    pub fn matches_domain(&self, domain: &str) -> bool {
        !domain.is_empty() && self.watchlist.iter().any(|site| domain.contains(site.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matcher(sites: &[&str]) -> DomainMatcher {
        DomainMatcher::new(sites.iter().map(|s| (*s).to_string()).collect())
    }

    #[test]
    fn test_extract_domain_strips_www() {
        assert_eq!(extract_domain("https://www.example.com/page"), "example.com");
        assert_eq!(extract_domain("https://m.youtube.com/watch?v=1"), "m.youtube.com");
        assert_eq!(extract_domain("http://example.com:8080/"), "example.com");
    }

    #[test]
    fn test_extract_domain_malformed() {
        assert_eq!(extract_domain("not a url"), "");
        assert_eq!(extract_domain(""), "");
    }

    #[test]
    fn test_matches_substring() {
        let m = matcher(&["example.com"]);
        assert!(m.matches("https://www.example.com/page"));
        assert!(m.matches("https://sub.example.com/"));
        assert!(m.matches("https://notexample.com.evil.tld/"));
        assert!(!m.matches("https://example.org/"));
    }

    #[test]
    fn test_malformed_url_never_matches() {
        let m = matcher(&["example.com"]);
        assert!(!m.matches("example.com"));
        assert!(!m.matches("::::"));
    }

    #[test]
    fn test_blank_entries_do_not_match_everything() {
        let m = matcher(&["", "  "]);
        assert!(m.watchlist().is_empty());
        assert!(!m.matches("https://anything.com/"));
    }

    #[test]
    fn test_replace_watchlist() {
        let mut m = matcher(&["example.com"]);
        m.replace(vec!["reddit.com".to_string()]);
        assert!(!m.matches("https://example.com/"));
        assert!(m.matches("https://www.reddit.com/r/rust"));
    }
}
