//! `METHOD /path` and `METHOD https://host/path` mentions in prose.

use super::{Candidate, Extractor, Page};
use crate::endpoint::HttpMethod;
use regex::Regex;
use std::sync::LazyLock;

/// Upper-case method token followed by a path or absolute URL.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static METHOD_TARGET: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"\b(GET|POST|PUT|PATCH|DELETE|HEAD|OPTIONS|TRACE)\s+((?:https?://[^\s<>]+)|(?:/[A-Za-z0-9\-._~/{}:$@%+=]*))",
    )
    .unwrap()
});

/// Scans the rendered text of a page.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExtractor;

impl Extractor for TextExtractor {
    fn name(&self) -> &'static str {
        "text"
    }

    fn extract(&self, page: &Page) -> Vec<Candidate> {
        scan(page.text())
    }
}

/// Every `METHOD target` mention in `text`.
#[must_use]
pub fn scan(text: &str) -> Vec<Candidate> {
    METHOD_TARGET
        .captures_iter(text)
        .filter_map(|caps| {
            let method = HttpMethod::parse(&caps[1])?;
            Candidate::new(method, &caps[2])
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;

    fn keys(text: &str) -> Vec<String> {
        scan(text)
            .into_iter()
            .map(|c| format!("{}:{}", c.method, c.path))
            .collect()
    }

    #[test]
    fn test_relative_and_absolute_mentions() {
        assert_eq!(
            keys("Send GET /users/:id, then PATCH https://api.x.com/users/{id}."),
            vec!["GET:/users/{id}", "PATCH:/users/{id}"]
        );
    }

    #[test]
    fn test_lowercase_prose_is_ignored() {
        assert!(keys("you can get /users or post things").is_empty());
    }

    #[test]
    fn test_bare_root_is_ignored() {
        assert!(keys("GET / returns the index").is_empty());
    }

    #[test]
    fn test_absolute_mentions_record_origin() {
        let found = scan("DELETE https://api.x.com/v2/items/{id}");
        assert_eq!(found[0].origin.as_deref(), Some("https://api.x.com"));
        assert_eq!(found[0].path, "/v2/items/{id}");
    }

    #[test]
    fn test_extractor_reads_rendered_text() {
        let page = Page::parse("<ul><li><b>POST</b> <code>/orders</code></li></ul>");
        let found = TextExtractor.extract(&page);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].method, HttpMethod::Post);
    }
}
