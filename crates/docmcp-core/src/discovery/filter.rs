//! URL gatekeeping for the crawl frontier.
//!
//! Three independent predicates decide whether a URL may be fetched:
//!
//! - [`is_acceptable`]: scheme and host safety. The private-network check is
//!   a hostname prefix match (`127.`, `10.`, `192.168.`, `169.254.`), not CIDR
//!   matching, and is not a production security boundary.
//! - [`is_same_origin`]: the crawl never leaves the seed's hostname unless the
//!   host is on an explicit allow-list.
//! - [`is_static_asset`]: known asset extensions and `static/`/`assets/`
//!   segments are never worth a request.
//!
//! ```rust
//! use docmcp_core::discovery::filter::{is_acceptable, is_same_origin};
//!
//! assert!(is_acceptable("https://api.example.com/docs"));
//! assert!(!is_acceptable("http://127.0.0.1/"));
//! assert!(is_same_origin("https://example.com/b", "example.com", &[]));
//! ```

use url::Url;

const PRIVATE_PREFIXES: &[&str] = &["127.", "10.", "192.168.", "169.254."];

/// Path segments that indicate reference documentation.
const DOCS_PATH_INDICATORS: &[&str] = &[
    "/docs",
    "/doc",
    "/api",
    "/apis",
    "/reference",
    "/api-reference",
    "/developers",
    "/developer",
    "/endpoints",
    "/rest",
    "/v1",
    "/v2",
    "/v3",
    "/guide",
    "/swagger",
    "/openapi",
    "/redoc",
];

/// Path segments that never lead to API documentation.
const NON_DOCS_PATH_INDICATORS: &[&str] = &[
    "/blog",
    "/about",
    "/careers",
    "/pricing",
    "/login",
    "/signup",
    "/sign-up",
    "/signin",
    "/sign-in",
    "/register",
    "/_next",
    "/cdn-cgi",
    "/wp-content",
    "/wp-admin",
    "/feed",
    "/rss",
    "/contact",
    "/privacy",
    "/terms",
    "/legal",
    "/jobs",
    "/press",
    "/news",
];

const STATIC_EXTENSIONS: &[&str] = &[
    ".png", ".jpg", ".jpeg", ".gif", ".svg", ".webp", ".ico", ".bmp", ".css", ".js", ".mjs",
    ".map", ".woff", ".woff2", ".ttf", ".eot", ".otf", ".pdf", ".zip", ".gz", ".tar", ".mp3",
    ".mp4", ".webm", ".wav",
];

const STATIC_SEGMENTS: &[&str] = &["static", "assets"];

/// Scheme and host safety check. Pure; no DNS lookups.
#[must_use]
pub fn is_acceptable(url: &str) -> bool {
    is_acceptable_with(url, false)
}

/// [`is_acceptable`] with the private-network block optionally lifted.
///
/// Scheme checks always apply; only the host check is skipped.
#[must_use]
pub fn is_acceptable_with(url: &str, allow_private_network: bool) -> bool {
    let Ok(parsed) = Url::parse(url) else {
        return false;
    };
    if !matches!(parsed.scheme(), "http" | "https") {
        return false;
    }
    let Some(host) = parsed.host_str() else {
        return false;
    };
    allow_private_network || !is_private_host(host)
}

fn is_private_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host == "localhost"
        || host == "[::1]"
        || PRIVATE_PREFIXES.iter().any(|prefix| host.starts_with(prefix))
}

/// Hostname of a URL, lowercased.
#[must_use]
pub fn hostname(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .host_str()
        .map(str::to_ascii_lowercase)
}

/// Whether `url` is on the seed host, or on (a subdomain of) an allowed domain.
#[must_use]
pub fn is_same_origin(url: &str, seed_host: &str, allowed_domains: &[String]) -> bool {
    let Some(host) = hostname(url) else {
        return false;
    };
    if host.eq_ignore_ascii_case(seed_host) {
        return true;
    }
    allowed_domains.iter().any(|domain| {
        let domain = domain.trim().to_ascii_lowercase();
        !domain.is_empty() && (host == domain || host.ends_with(&format!(".{domain}")))
    })
}

/// Whether the URL points at a static asset.
#[must_use]
pub fn is_static_asset(url: &str) -> bool {
    let path = Url::parse(url).map_or_else(
        |_| url.split(['?', '#']).next().unwrap_or_default().to_string(),
        |u| u.path().to_string(),
    );
    let lower = path.to_ascii_lowercase();
    if STATIC_EXTENSIONS.iter().any(|ext| lower.ends_with(ext)) {
        return true;
    }
    lower
        .split('/')
        .any(|segment| STATIC_SEGMENTS.contains(&segment))
}

/// Whether the URL names a spec document by extension.
#[must_use]
pub fn has_spec_extension(url: &str) -> bool {
    let path = Url::parse(url).map_or_else(|_| url.to_string(), |u| u.path().to_string());
    let lower = path.to_ascii_lowercase();
    [".json", ".yaml", ".yml"]
        .iter()
        .any(|ext| lower.ends_with(ext))
}

/// Whether a path looks like API reference material worth crawling.
///
/// Non-docs segments win over docs segments; unknown paths are rejected.
#[must_use]
pub fn is_likely_docs_path(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    if NON_DOCS_PATH_INDICATORS
        .iter()
        .any(|indicator| contains_path_segment(&lower, indicator))
    {
        return false;
    }
    DOCS_PATH_INDICATORS
        .iter()
        .any(|indicator| contains_path_segment(&lower, indicator))
}

/// Segment-bounded containment: `/doc` matches `/doc/x` but not `/doc-builder`.
fn contains_path_segment(path: &str, indicator: &str) -> bool {
    path.match_indices(indicator).any(|(pos, _)| {
        let rest = &path[pos + indicator.len()..];
        rest.is_empty() || rest.starts_with(['/', '?', '#', '.'])
    })
}

/// Canonical frontier form: fragment removed.
#[must_use]
pub fn normalize_url(url: &str) -> Option<String> {
    let mut parsed = Url::parse(url).ok()?;
    parsed.set_fragment(None);
    Some(parsed.to_string())
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::panic,
    clippy::disallowed_macros,
    clippy::unnecessary_wraps
)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_rejects_loopback_and_private_hosts() {
        assert!(!is_acceptable("http://localhost/x"));
        assert!(!is_acceptable("http://127.0.0.1/"));
        assert!(!is_acceptable("http://192.168.1.1/a"));
        assert!(!is_acceptable("http://10.0.0.8/docs"));
        assert!(!is_acceptable("http://169.254.169.254/latest/meta-data"));
        assert!(!is_acceptable("http://LOCALHOST:8080/"));
    }

    #[test]
    fn test_accepts_public_https() {
        assert!(is_acceptable("https://api.example.com/docs"));
        assert!(is_acceptable("http://docs.example.org/v1/reference"));
    }

    #[test]
    fn test_rejects_bad_schemes_and_garbage() {
        assert!(!is_acceptable("ftp://example.com/spec.json"));
        assert!(!is_acceptable("file:///etc/passwd"));
        assert!(!is_acceptable("javascript:alert(1)"));
        assert!(!is_acceptable("not a url"));
        assert!(!is_acceptable(""));
    }

    #[test]
    fn test_private_override_keeps_scheme_check() {
        assert!(is_acceptable_with("http://127.0.0.1:8080/", true));
        assert!(!is_acceptable_with("ftp://127.0.0.1/", true));
    }

    #[test]
    fn test_prefix_check_is_not_cidr() {
        // 172.16/12 is private but outside the prefix list.
        assert!(is_acceptable("http://172.16.0.1/"));
        // Public hostnames that merely start with digits look private.
        assert!(!is_acceptable("http://10.example.com/"));
    }

    #[test]
    fn test_same_origin_exact_host() {
        assert!(is_same_origin("https://example.com/a", "example.com", &[]));
        assert!(!is_same_origin("https://docs.example.com/a", "example.com", &[]));
        assert!(!is_same_origin("https://evil.com/a", "example.com", &[]));
    }

    #[test]
    fn test_same_origin_allow_list_includes_subdomains() {
        let allowed = vec!["example.org".to_string()];
        assert!(is_same_origin("https://api.example.org/x", "example.com", &allowed));
        assert!(is_same_origin("https://example.org/x", "example.com", &allowed));
        assert!(!is_same_origin("https://notexample.org/x", "example.com", &allowed));
    }

    #[test]
    fn test_static_assets() {
        assert!(is_static_asset("https://x.com/logo.png"));
        assert!(is_static_asset("https://x.com/static/page"));
        assert!(is_static_asset("https://x.com/a/assets/docs.html"));
        assert!(is_static_asset("https://x.com/app.js?v=2"));
        assert!(!is_static_asset("https://x.com/docs/assets-guide"));
        assert!(!is_static_asset("https://x.com/openapi.json"));
    }

    #[test]
    fn test_docs_path_heuristics() {
        assert!(is_likely_docs_path("/docs/getting-started"));
        assert!(is_likely_docs_path("/api/reference"));
        assert!(is_likely_docs_path("/v1/users"));
        assert!(!is_likely_docs_path("/blog/api-launch"));
        assert!(!is_likely_docs_path("/doc-builder"));
        assert!(!is_likely_docs_path("/company"));
    }

    #[test]
    fn test_normalize_strips_fragment() {
        assert_eq!(
            normalize_url("https://x.com/docs#auth").unwrap(),
            "https://x.com/docs"
        );
        assert!(normalize_url("::").is_none());
    }

    proptest! {
        #[test]
        fn test_non_http_schemes_always_rejected(scheme in "(ftp|file|data|ws|mailto)", host in "[a-z]{1,10}") {
            let url = format!("{scheme}://{host}.com/");
            prop_assert!(!is_acceptable(&url));
        }

        #[test]
        fn test_loopback_octets_always_rejected(a in 0u8..=255, b in 0u8..=255, c in 0u8..=255) {
            let url = format!("http://127.{a}.{b}.{c}/");
            prop_assert!(!is_acceptable(&url));
        }
    }
}
