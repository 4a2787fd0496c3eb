//! Well-known locations tried when crawling finds too little.
//!
//! Two probes run against the seed origin, in order:
//!
//! 1. **Spec paths**: common OpenAPI/Swagger document locations, fetched with
//!    `GET` and handed to the spec parsers by the orchestrator.
//! 2. **REST prefixes**: `HEAD` requests to `/api`, `/api/v1`, `/v1` and
//!    `/v2`. Each prefix answering 2xx becomes a placeholder `GET` endpoint.

use crate::endpoint::{Endpoint, HttpMethod};
use crate::fetcher::Fetcher;
use crate::session::CrawlSession;
use futures::future::join_all;
use tracing::{debug, instrument};
use url::Url;

/// Common spec document locations, most likely first.
pub const SPEC_PATHS: &[&str] = &[
    "/openapi.json",
    "/swagger.json",
    "/api-docs",
    "/v3/api-docs",
    "/v2/api-docs",
    "/swagger/v1/swagger.json",
    "/openapi.yaml",
    "/swagger.yaml",
    "/api/openapi.json",
    "/api/swagger.json",
    "/docs/openapi.json",
];

/// REST roots checked with `HEAD`.
pub const REST_PREFIXES: &[&str] = &["/api", "/api/v1", "/v1", "/v2"];

/// `scheme://host[:port]` of `url`.
#[must_use]
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?;
    Some(parsed.port().map_or_else(
        || format!("{}://{host}", parsed.scheme()),
        |port| format!("{}://{host}:{port}", parsed.scheme()),
    ))
}

/// Absolute spec probe URLs under the origin of `seed`.
///
/// ```rust
/// use docmcp_core::discovery::probe::spec_probe_urls;
///
/// let urls = spec_probe_urls("https://example.com/docs/intro");
/// assert_eq!(urls[0], "https://example.com/openapi.json");
/// ```
#[must_use]
pub fn spec_probe_urls(seed: &str) -> Vec<String> {
    origin_of(seed).map_or_else(Vec::new, |origin| {
        SPEC_PATHS.iter().map(|path| format!("{origin}{path}")).collect()
    })
}

/// `HEAD` each REST prefix concurrently; successful ones become placeholder endpoints.
///
/// Failures and non-2xx answers are logged and skipped.
#[instrument(skip(fetcher, session))]
pub async fn probe_rest_prefixes(
    fetcher: &Fetcher,
    session: &CrawlSession,
    seed: &str,
) -> Vec<Endpoint> {
    let Some(origin) = origin_of(seed) else {
        return Vec::new();
    };

    let probes = REST_PREFIXES.iter().map(|prefix| {
        let url = format!("{origin}{prefix}");
        async move { (*prefix, fetcher.head(session, &url).await) }
    });

    let mut found = Vec::new();
    for (prefix, outcome) in join_all(probes).await {
        match outcome {
            Ok(status) if status.is_success() => {
                session.log("Fallback", format!("REST prefix {prefix} answered {status}"));
                found.push(placeholder(prefix));
            },
            Ok(status) => debug!(prefix, %status, "REST prefix not available"),
            Err(e) => debug!(prefix, error = %e, "REST prefix probe failed"),
        }
    }
    found
}

fn placeholder(prefix: &str) -> Endpoint {
    let mut endpoint = Endpoint::synthesize(HttpMethod::Get, prefix);
    endpoint.summary = Some(format!("API root at {prefix}"));
    endpoint.description = Some(format!(
        "Placeholder for the API root at {prefix}; documented operations were not found."
    ));
    endpoint
}
