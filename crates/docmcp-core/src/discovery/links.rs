//! Candidate URL discovery on fetched HTML pages.
//!
//! Two kinds of URLs come out of a page:
//!
//! - **Spec URLs** referenced by embedded viewers (Swagger UI `url:`
//!   initializers, Redoc `spec-url`, `data-url`/`data-spec-url` attributes)
//!   or linked directly as `.json`/`.yaml`/`.yml` files whose path mentions
//!   openapi, swagger, api-docs or spec. These are queued ahead of pages.
//! - **Page links** from `<a href>` that look like API reference material.
//!
//! Both lists are resolved against the page URL, stripped of fragments,
//! deduplicated and restricted to the crawl's origin scope.
//!
//! ```rust
//! use docmcp_core::discovery::links::discover_links;
//! use docmcp_core::extract::Page;
//!
//! let page = Page::parse(r#"<a href="/docs/users">Users</a><a href="/openapi.json">Spec</a>"#);
//! let links = discover_links(&page, "https://example.com/docs", "example.com", &[]);
//! assert_eq!(links.spec_urls, vec!["https://example.com/openapi.json"]);
//! assert_eq!(links.page_urls, vec!["https://example.com/docs/users"]);
//! ```

use super::filter::{has_spec_extension, is_likely_docs_path, is_same_origin, is_static_asset};
use crate::extract::Page;
use regex::Regex;
use scraper::Selector;
use std::collections::HashSet;
use std::sync::LazyLock;
use url::Url;

/// Swagger UI initializer: `SwaggerUIBundle({ url: "..." })`.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static SWAGGER_UI_URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\burl\s*:\s*["']([^"']+)["']"#).unwrap());

/// Redoc initializer: `Redoc.init("...")`.
///
/// SAFETY: Pattern is a compile-time constant that is known to be valid.
#[allow(clippy::unwrap_used)]
static REDOC_INIT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"Redoc\.init\(\s*["']([^"']+)["']"#).unwrap());

/// Words that mark a `.json`/`.yaml` link as an API description.
const SPEC_HINTS: &[&str] = &["openapi", "swagger", "api-docs", "spec"];

/// URLs proposed by one page.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DiscoveredLinks {
    /// Likely spec documents, in discovery order.
    pub spec_urls: Vec<String>,
    /// Likely documentation pages, in document order.
    pub page_urls: Vec<String>,
}

/// Find spec and documentation links on `page`.
///
/// `seed_host` and `allowed_domains` bound the result to the crawl's scope.
#[must_use]
pub fn discover_links(
    page: &Page,
    page_url: &str,
    seed_host: &str,
    allowed_domains: &[String],
) -> DiscoveredLinks {
    let Ok(base) = Url::parse(page_url) else {
        return DiscoveredLinks::default();
    };
    let in_scope = |url: &String| is_same_origin(url, seed_host, allowed_domains);

    let mut seen = HashSet::new();
    seen.insert(normalize_and_resolve(page_url, &base).unwrap_or_default());

    let spec_urls: Vec<String> = embedded_spec_refs(page)
        .into_iter()
        .filter_map(|raw| normalize_and_resolve(&raw, &base))
        .filter(in_scope)
        .filter(|url| seen.insert(url.clone()))
        .collect();

    let mut page_urls = Vec::new();
    for href in anchor_hrefs(page) {
        let Some(url) = normalize_and_resolve(&href, &base) else {
            continue;
        };
        if !in_scope(&url) || is_static_asset(&url) || seen.contains(&url) {
            continue;
        }
        let path = Url::parse(&url).map(|u| u.path().to_string()).unwrap_or_default();
        if is_likely_docs_path(&path) {
            seen.insert(url.clone());
            page_urls.push(url);
        }
    }

    DiscoveredLinks {
        spec_urls,
        page_urls,
    }
}

/// Raw spec references in viewer markup and spec-looking links.
fn embedded_spec_refs(page: &Page) -> Vec<String> {
    let mut refs = Vec::new();
    let raw = page.raw();

    if raw.contains("SwaggerUIBundle") || raw.contains("SwaggerUi") || raw.contains("swagger-ui") {
        refs.extend(
            SWAGGER_UI_URL_RE
                .captures_iter(raw)
                .map(|cap| cap[1].to_string()),
        );
    }
    refs.extend(REDOC_INIT_RE.captures_iter(raw).map(|cap| cap[1].to_string()));

    if let Ok(selector) = Selector::parse("[spec-url], [data-url], [data-spec-url]") {
        for element in page.document().select(&selector) {
            let value = element.value();
            refs.extend(
                ["spec-url", "data-spec-url", "data-url"]
                    .iter()
                    .filter_map(|attr| value.attr(attr))
                    .map(str::to_string),
            );
        }
    }

    refs.extend(
        link_hrefs(page)
            .into_iter()
            .filter(|href| is_spec_link(href)),
    );
    refs
}

fn is_spec_link(href: &str) -> bool {
    if !has_spec_extension(href) {
        return false;
    }
    let lower = href.to_ascii_lowercase();
    SPEC_HINTS.iter().any(|hint| lower.contains(hint))
}

fn anchor_hrefs(page: &Page) -> Vec<String> {
    select_attr(page, "a[href]", "href")
}

fn link_hrefs(page: &Page) -> Vec<String> {
    select_attr(page, "a[href], link[href]", "href")
}

fn select_attr(page: &Page, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    page.document()
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(str::to_string)
        .collect()
}

/// Resolve against `base`, drop fragments and non-http schemes.
fn normalize_and_resolve(raw: &str, base: &Url) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() || raw.starts_with('#') {
        return None;
    }
    let mut resolved = base.join(raw).ok()?;
    if !matches!(resolved.scheme(), "http" | "https") {
        return None;
    }
    resolved.set_fragment(None);
    Some(resolved.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;

    fn discover(markup: &str) -> DiscoveredLinks {
        discover_links(&Page::parse(markup), "https://example.com/docs/", "example.com", &[])
    }

    #[test]
    fn test_swagger_ui_initializer() {
        let links = discover(
            r#"<div id="swagger-ui"></div>
            <script>window.ui = SwaggerUIBundle({ url: "/v3/api-docs", dom_id: '#swagger-ui' });</script>"#,
        );
        assert_eq!(links.spec_urls, vec!["https://example.com/v3/api-docs"]);
    }

    #[test]
    fn test_redoc_and_data_attributes() {
        let links = discover(
            r#"<redoc spec-url="openapi.yaml"></redoc>
            <div data-spec-url="/specs/v2.json"></div>
            <script>Redoc.init('/redoc.json', {}, el)</script>"#,
        );
        assert_eq!(
            links.spec_urls,
            vec![
                "https://example.com/redoc.json",
                "https://example.com/docs/openapi.yaml",
                "https://example.com/specs/v2.json",
            ]
        );
    }

    #[test]
    fn test_spec_links_need_a_hint() {
        let links = discover(
            r#"<a href="/swagger.json">spec</a><a href="/data/prices.json">prices</a>"#,
        );
        assert_eq!(links.spec_urls, vec!["https://example.com/swagger.json"]);
    }

    #[test]
    fn test_page_links_filtered() {
        let links = discover(
            r##"
            <a href="users">Users</a>
            <a href="/docs/users#list">Users again</a>
            <a href="/blog/launch">Blog</a>
            <a href="/docs/logo.png">Logo</a>
            <a href="https://other.com/docs/x">Elsewhere</a>
            <a href="mailto:a@example.com">Mail</a>
            <a href="#top">Top</a>
            <a href="/api/reference">Reference</a>
            "##,
        );
        assert_eq!(
            links.page_urls,
            vec![
                "https://example.com/docs/users",
                "https://example.com/api/reference",
            ]
        );
    }

    #[test]
    fn test_cross_origin_spec_is_dropped() {
        let links = discover(
            r#"<script>SwaggerUIBundle({url: "https://petstore.swagger.io/v2/swagger.json"})</script>"#,
        );
        assert!(links.spec_urls.is_empty());
    }

    #[test]
    fn test_allowed_domains_widen_scope() {
        let page = Page::parse(r#"<a href="https://api.example.org/openapi.json">spec</a>"#);
        let allowed = vec!["example.org".to_string()];
        let links = discover_links(&page, "https://example.com/docs", "example.com", &allowed);
        assert_eq!(links.spec_urls, vec!["https://api.example.org/openapi.json"]);
    }
}
