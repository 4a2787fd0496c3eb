//! Heuristic endpoint extraction from HTML and plain text.
//!
//! Each heuristic is an independent [`Extractor`] producing [`Candidate`]s
//! from a parsed [`Page`]. [`extract_page`] runs them in order and unions the
//! results into one endpoint per `(method, path)`. When the Swagger UI
//! extractor finds anything, its results replace the generic heuristics for
//! that page.
//!
//! Everything here is synchronous and does no I/O. [`Page`] holds a
//! `scraper::Html`, which is not `Send`, so pages are built and dropped
//! between awaits.

pub mod code;
pub mod schema;
pub mod swagger_ui;
pub mod table;
pub mod text;

use crate::endpoint::{BodySchema, Endpoint, EndpointSet, HttpMethod};
use scraper::Html;

/// One `(method, path)` sighting with whatever detail came with it.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// HTTP method.
    pub method: HttpMethod,
    /// Cleaned path starting with `/`.
    pub path: String,
    /// `scheme://host` when the sighting was an absolute URL.
    pub origin: Option<String>,
    /// Summary text shown next to the sighting.
    pub summary: Option<String>,
    /// Request body inferred from an example payload.
    pub request_body: Option<BodySchema>,
}

impl Candidate {
    /// Candidate from a method and a raw path or absolute URL.
    /// Returns `None` when the target does not clean up into a path.
    #[must_use]
    pub fn new(method: HttpMethod, target: &str) -> Option<Self> {
        let (origin, path) = split_target(target)?;
        Some(Self {
            method,
            path,
            origin,
            summary: None,
            request_body: None,
        })
    }
}

/// A parsed document plus its rendered text.
pub struct Page {
    raw: String,
    document: Html,
    text: String,
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("raw_len", &self.raw.len())
            .field("text_len", &self.text.len())
            .finish_non_exhaustive()
    }
}

impl Page {
    /// Parse markup or plain text.
    #[must_use]
    pub fn parse(markup: &str) -> Self {
        let document = Html::parse_document(markup);
        let text = rendered_text(&document);
        Self {
            raw: markup.to_string(),
            document,
            text,
        }
    }

    /// Original input.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Parsed DOM.
    #[must_use]
    pub const fn document(&self) -> &Html {
        &self.document
    }

    /// Visible text, one space between text nodes. Script and style bodies are excluded.
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }
}

fn rendered_text(document: &Html) -> String {
    let mut out = String::new();
    for node in document.tree.root().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node
            .parent()
            .and_then(|p| p.value().as_element().map(scraper::node::Element::name))
            .is_some_and(|name| matches!(name, "script" | "style" | "noscript" | "template"));
        let text = text.trim();
        if hidden || text.is_empty() {
            continue;
        }
        if !out.is_empty() {
            out.push(' ');
        }
        out.push_str(text);
    }
    out
}

/// One heuristic scan.
pub trait Extractor: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Candidates found on `page`. May contain duplicates.
    fn extract(&self, page: &Page) -> Vec<Candidate>;
}

/// The generic heuristics, in the order their results are merged.
#[must_use]
pub fn default_extractors() -> Vec<Box<dyn Extractor>> {
    vec![
        Box::new(table::TableExtractor),
        Box::new(code::CodeExtractor),
        Box::new(text::TextExtractor),
    ]
}

/// Endpoints found on one page, plus the API origins its absolute URLs point at.
#[derive(Debug, Default, Clone)]
pub struct Extraction {
    /// Unique endpoints in first-sighting order.
    pub endpoints: Vec<Endpoint>,
    /// Origins of absolute URLs, one entry per sighting.
    pub origins: Vec<String>,
    /// Name of the extractor that produced the first endpoint of each key.
    pub sources: Vec<&'static str>,
}

/// Run every extractor over `page`.
#[must_use]
pub fn extract_page(page: &Page) -> Extraction {
    let swagger = swagger_ui::SwaggerUiExtractor;
    let found = swagger.extract(page);
    if !found.is_empty() {
        return merge(vec![(swagger.name(), found)]);
    }
    let batches = default_extractors()
        .iter()
        .map(|extractor| (extractor.name(), extractor.extract(page)))
        .collect();
    merge(batches)
}

fn merge(batches: Vec<(&'static str, Vec<Candidate>)>) -> Extraction {
    let mut set = EndpointSet::new();
    let mut origins = Vec::new();
    let mut sources = Vec::new();
    for (name, candidates) in batches {
        for candidate in candidates {
            if let Some(origin) = candidate.origin {
                origins.push(origin);
            }
            let mut endpoint = Endpoint::synthesize(candidate.method, &candidate.path);
            if candidate.summary.is_some() {
                endpoint.summary = candidate.summary;
            }
            endpoint.request_body = candidate.request_body;
            if set.insert(endpoint) {
                sources.push(name);
            }
        }
    }
    Extraction {
        endpoints: set.into_vec(),
        origins,
        sources,
    }
}

/// Extract endpoints from markup or text.
///
/// Absolute URLs under `base_url` are reduced to the part after it, so
/// `https://api.x.com/v1/users` with base `https://api.x.com/v1` yields
/// `/users`. Other absolute URLs keep their full path.
///
/// ```rust
/// use docmcp_core::extract::extract;
///
/// let endpoints = extract("<p>Call GET /users to list users.</p>", "https://x.com");
/// assert_eq!(endpoints[0].path, "/users");
/// ```
#[must_use]
pub fn extract(markup: &str, base_url: &str) -> Vec<Endpoint> {
    let page = Page::parse(markup);
    let base = base_url.trim_end_matches('/');
    let base_path = base
        .split_once("://")
        .and_then(|(_, rest)| rest.find('/').map(|i| &rest[i..]))
        .unwrap_or_default();

    let mut endpoints = extract_page(&page).endpoints;
    if base_path.len() > 1 {
        let mut rebased = EndpointSet::new();
        for mut endpoint in endpoints {
            if let Some(rest) = endpoint.path.strip_prefix(base_path) {
                if rest.starts_with('/') {
                    let mut moved = Endpoint::synthesize(endpoint.method, rest);
                    moved.summary = endpoint.summary.take();
                    moved.request_body = endpoint.request_body.take();
                    endpoint = moved;
                }
            }
            rebased.insert(endpoint);
        }
        endpoints = rebased.into_vec();
    }
    endpoints
}

/// Split a path or absolute URL into `(origin, cleaned path)`.
///
/// Absolute URLs are split by hand so `{param}` braces survive unencoded.
#[must_use]
pub fn split_target(target: &str) -> Option<(Option<String>, String)> {
    let target = target.trim().trim_matches(|c| c == '\'' || c == '"' || c == '`');
    if let Some((scheme, rest)) = target.split_once("://") {
        if !matches!(scheme, "http" | "https") {
            return None;
        }
        let (host, path) = rest.find('/').map_or((rest, "/"), |i| (&rest[..i], &rest[i..]));
        let host = host.split(['?', '#']).next().unwrap_or_default();
        if host.is_empty() || host.contains("{{") {
            return clean_path(path).map(|p| (None, p));
        }
        return clean_path(path).map(|p| (Some(format!("{scheme}://{host}")), p));
    }
    if let Some(rest) = target.strip_prefix("{{") {
        // Postman-style `{{baseUrl}}/path`.
        let path = rest.split_once("}}").map(|(_, p)| p)?;
        return clean_path(path).map(|p| (None, p));
    }
    clean_path(target).map(|p| (None, p))
}

/// Normalize a documented path.
///
/// Drops query and fragment, trims trailing punctuation, rewrites `:id`
/// segments to `{id}` and collapses empty segments. The root path alone is
/// rejected.
#[must_use]
pub fn clean_path(raw: &str) -> Option<String> {
    let raw = raw.split(['?', '#']).next().unwrap_or_default();
    let mut path = raw.trim_end_matches(['.', ',', ';', ':', ')', ']', '\'', '"', '`', '>']);
    // A closing brace is punctuation only when unbalanced.
    while path.ends_with('}') && path.matches('}').count() > path.matches('{').count() {
        path = &path[..path.len() - 1];
    }
    if !path.starts_with('/') {
        return None;
    }
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|segment| match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => format!("{{{name}}}"),
            _ => segment.to_string(),
        })
        .collect();
    if segments.is_empty() {
        return None;
    }
    let cleaned = format!("/{}", segments.join("/"));
    let valid = cleaned
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || "/-_.~{}$@%+=".contains(c));
    valid.then_some(cleaned)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_path() {
        assert_eq!(clean_path("/users/{id}.").as_deref(), Some("/users/{id}"));
        assert_eq!(clean_path("/users/:id?x=1").as_deref(), Some("/users/{id}"));
        assert_eq!(clean_path("/a//b/").as_deref(), Some("/a/b"));
        assert_eq!(clean_path("/items)").as_deref(), Some("/items"));
        assert_eq!(clean_path("/items}").as_deref(), Some("/items"));
        assert_eq!(clean_path("/").as_deref(), None);
        assert_eq!(clean_path("users").as_deref(), None);
        assert_eq!(clean_path("/a b").as_deref(), None);
    }

    #[test]
    fn test_split_target() {
        assert_eq!(
            split_target("'https://api.x.com/v1/items/{id}'").unwrap(),
            (Some("https://api.x.com".to_string()), "/v1/items/{id}".to_string())
        );
        assert_eq!(
            split_target("{{baseUrl}}/orders").unwrap(),
            (None, "/orders".to_string())
        );
        assert!(split_target("ftp://x/y").is_none());
        assert!(split_target("https://x.com").is_none());
    }

    #[test]
    fn test_rendered_text_skips_scripts() {
        let page = Page::parse(
            "<html><head><script>var GET = '/secret';</script></head><body><p>GET</p><p>/users</p></body></html>",
        );
        assert_eq!(page.text(), "GET /users");
    }

    #[test]
    fn test_extract_is_idempotent() {
        let markup = r#"
            <table><tr><td>POST</td><td>/orders</td></tr></table>
            <pre>curl -X DELETE https://api.x.com/orders/{id}</pre>
            <p>Use GET /orders to page through orders.</p>
        "#;
        let mut first: Vec<String> = extract(markup, "").iter().map(Endpoint::key).collect();
        let mut second: Vec<String> = extract(markup, "").iter().map(Endpoint::key).collect();
        first.sort();
        second.sort();
        assert_eq!(first, second);
        assert_eq!(first.len(), 3);
    }

    #[test]
    fn test_extract_rebases_under_base_url() {
        let endpoints = extract(
            "<pre>curl https://api.x.com/v1/users</pre>",
            "https://api.x.com/v1/",
        );
        assert_eq!(endpoints[0].path, "/users");
    }

    #[test]
    fn test_swagger_ui_markers_take_precedence() {
        let markup = r#"
            <div class="opblock opblock-get">
              <span class="opblock-summary-method">GET</span>
              <span class="opblock-summary-path" data-path="/pets"><a>/pets</a></span>
            </div>
            <p>POST /ignored-when-swagger-present</p>
        "#;
        let extraction = extract_page(&Page::parse(markup));
        assert_eq!(extraction.endpoints.len(), 1);
        assert_eq!(extraction.endpoints[0].path, "/pets");
        assert_eq!(extraction.sources, vec!["swagger-ui"]);
    }

    #[test]
    fn test_origins_are_collected() {
        let extraction = extract_page(&Page::parse(
            "<pre>curl https://api.x.com/a\ncurl https://api.x.com/b</pre>",
        ));
        assert_eq!(extraction.origins, vec!["https://api.x.com", "https://api.x.com"]);
    }
}
