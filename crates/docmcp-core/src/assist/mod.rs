//! Optional model-backed helpers.
//!
//! Neither seam affects parsing correctness. Both default to no-ops, and every
//! failure falls back to the unassisted result.
//!
//! - [`Enhancer`] rewrites endpoint summaries and descriptions.
//! - [`LinkSuggester`] proposes extra documentation links for a page.

pub mod openai;

use crate::endpoint::Endpoint;
use crate::session::CrawlSession;
use crate::{Error, Result};
use std::collections::HashMap;

pub use openai::{OpenAiClient, OpenAiEnhancer, OpenAiLinkSuggester};

/// Improves endpoint prose.
#[async_trait::async_trait]
pub trait Enhancer: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Return the same endpoints with better `summary`/`description`.
    async fn enhance(&self, endpoints: &[Endpoint]) -> Result<Vec<Endpoint>>;
}

/// Proposes documentation links the static heuristics missed.
#[async_trait::async_trait]
pub trait LinkSuggester: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Absolute or relative URLs worth crawling from `page_url`.
    async fn suggest_links(&self, html: &str, page_url: &str) -> Result<Vec<String>>;
}

/// Returns endpoints unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEnhancer;

#[async_trait::async_trait]
impl Enhancer for NoopEnhancer {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn enhance(&self, endpoints: &[Endpoint]) -> Result<Vec<Endpoint>> {
        Ok(endpoints.to_vec())
    }
}

/// Suggests nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLinkSuggester;

#[async_trait::async_trait]
impl LinkSuggester for NoopLinkSuggester {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn suggest_links(&self, _html: &str, _page_url: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

/// Run `enhancer` over the first `max_endpoints` endpoints.
///
/// Only non-empty `summary` and `description` values are adopted, and only
/// for endpoints whose `(method, path)` key was sent. Any error leaves every
/// endpoint exactly as it was.
pub async fn enhance_endpoints(
    enhancer: &dyn Enhancer,
    session: &CrawlSession,
    mut endpoints: Vec<Endpoint>,
    max_endpoints: usize,
) -> Vec<Endpoint> {
    let count = endpoints.len().min(max_endpoints);
    if count == 0 {
        return endpoints;
    }
    let batch = &endpoints[..count];
    let enhanced = match enhancer.enhance(batch).await {
        Ok(enhanced) => enhanced,
        Err(e) => {
            session.log(
                "Enhancer",
                format!("{} enhancement failed, keeping originals: {e}", enhancer.name()),
            );
            return endpoints;
        },
    };

    let mut by_key: HashMap<String, Endpoint> =
        enhanced.into_iter().map(|e| (e.key(), e)).collect();
    let mut adopted = 0usize;
    for endpoint in &mut endpoints[..count] {
        let Some(better) = by_key.remove(&endpoint.key()) else {
            continue;
        };
        let mut changed = false;
        if let Some(summary) = better.summary.filter(|s| !s.trim().is_empty()) {
            changed |= endpoint.summary.as_deref() != Some(summary.as_str());
            endpoint.summary = Some(summary);
        }
        if let Some(description) = better.description.filter(|s| !s.trim().is_empty()) {
            changed |= endpoint.description.as_deref() != Some(description.as_str());
            endpoint.description = Some(description);
        }
        adopted += usize::from(changed);
    }
    session.log(
        "Enhancer",
        format!("{} improved {adopted} of {count} endpoints", enhancer.name()),
    );
    endpoints
}

/// Pull the first JSON array out of a model reply, tolerating code fences and prose.
pub(crate) fn json_array_in(reply: &str) -> Result<serde_json::Value> {
    let start = reply.find('[');
    let end = reply.rfind(']');
    let (Some(start), Some(end)) = (start, end) else {
        return Err(Error::Enhancement("reply contains no JSON array".to_string()));
    };
    if end < start {
        return Err(Error::Enhancement("reply contains no JSON array".to_string()));
    }
    serde_json::from_str(&reply[start..=end])
        .map_err(|e| Error::Enhancement(format!("reply is not valid JSON: {e}")))
}
