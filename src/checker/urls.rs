// src/checker/urls.rs
// =============================================================================
// This module pulls candidate URLs out of free text.
//
// Unlike a Markdown parser, a single regex pass also finds URLs sitting in
// plain prose, HTML attributes and front matter. That is what we want for
// liveness checking: every http(s) URL in the file gets probed.
//
// Rules:
// - starts with http:// or https://
// - runs until whitespace or one of , ; ) < > " ]
// - must parse as a URL with a host
// - host must not be on the denylist (exact host or any subdomain of it)
// - duplicates collapse (set semantics)
// =============================================================================

use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;
use url::Url;

const URL_PATTERN: &str = r#"https?://[^\s,;)<>"\]]+"#;

fn url_regex() -> &'static Regex {
    static URL_REGEX: OnceLock<Regex> = OnceLock::new();
    // The pattern is a constant, so compiling it cannot fail at runtime
    URL_REGEX.get_or_init(|| Regex::new(URL_PATTERN).expect("URL pattern compiles"))
}

/// Host suffixes excluded from extraction.
#[derive(Debug, Clone, Default)]
pub struct Denylist {
    suffixes: Vec<String>,
}

impl Denylist {
    pub fn new<I, S>(suffixes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let suffixes = suffixes
            .into_iter()
            .map(|s| s.as_ref().trim().trim_start_matches('.').to_ascii_lowercase())
            .filter(|s| !s.is_empty())
            .collect();
        Self { suffixes }
    }

    /// True if the URL's host is a listed suffix or a subdomain of one.
    pub fn blocks(&self, url: &Url) -> bool {
        let Some(host) = url.host_str() else {
            return false;
        };
        let host = host.to_ascii_lowercase();

        self.suffixes.iter().any(|suffix| {
            host == *suffix
                || (host.ends_with(suffix.as_str())
                    && host[..host.len() - suffix.len()].ends_with('.'))
        })
    }
}

/// Extracts the distinct, non-denylisted http(s) URLs in `text`.
///
/// URLs are returned exactly as written so they can be matched against link
/// targets later.
pub fn extract_urls(text: &str, denylist: &Denylist) -> BTreeSet<String> {
    url_regex()
        .find_iter(text)
        .map(|m| m.as_str())
        .filter(|candidate| is_checkable(candidate, denylist))
        .map(str::to_string)
        .collect()
}

fn is_checkable(candidate: &str, denylist: &Denylist) -> bool {
    match Url::parse(candidate) {
        Ok(url) => url.host_str().is_some_and(|h| !h.is_empty()) && !denylist.blocks(&url),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_denylist() -> Denylist {
        Denylist::new(["denylisted-host", "example3.org"])
    }

    #[test]
    fn denylisted_hosts_are_excluded() {
        let text = "Read https://denylisted-host/x and https://good-host/y today.";
        let urls = extract_urls(text, &sample_denylist());
        assert_eq!(urls.into_iter().collect::<Vec<_>>(), vec!["https://good-host/y"]);
    }

    #[test]
    fn subdomains_of_denylisted_hosts_are_excluded() {
        let text = "https://cdn.example3.org/a https://notexample3.org/b";
        let urls = extract_urls(text, &sample_denylist());
        assert_eq!(urls.into_iter().collect::<Vec<_>>(), vec!["https://notexample3.org/b"]);
    }

    #[test]
    fn trailing_delimiters_are_not_part_of_the_url() {
        let text = "See (https://a.example/one), https://b.example/two; and [x](https://c.example/three)";
        let urls = extract_urls(text, &Denylist::default());
        let expected: BTreeSet<String> = [
            "https://a.example/one",
            "https://b.example/two",
            "https://c.example/three",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(urls, expected);
    }

    #[test]
    fn link_text_that_is_a_url_does_not_swallow_the_target() {
        let text = "[https://a.example](https://a.example) <https://b.example/x>";
        let urls = extract_urls(text, &Denylist::default());
        let expected: BTreeSet<String> = ["https://a.example", "https://b.example/x"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(urls, expected);
    }

    #[test]
    fn duplicates_collapse() {
        let text = "http://dup.example/p http://dup.example/p http://dup.example/p";
        assert_eq!(extract_urls(text, &Denylist::default()).len(), 1);
    }

    #[test]
    fn hostless_candidates_are_dropped() {
        let text = "broken http:// and ftp://files.example/x";
        assert!(extract_urls(text, &Denylist::default()).is_empty());
    }
}
