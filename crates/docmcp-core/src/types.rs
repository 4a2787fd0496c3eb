//! Crawl inputs and outputs.

use crate::endpoint::Endpoint;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the caller supplies the documentation to analyse.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CrawlInput {
    /// Seed URL to crawl.
    Url(String),
    /// Pasted content (spec text, HTML, or plain text).
    Paste(String),
    /// Uploaded file; the name's extension hints at the content type.
    Upload {
        /// Original file name.
        file_name: String,
        /// File content.
        content: String,
    },
}

impl CrawlInput {
    /// Mode tag as used in logs (`url`, `paste`, `upload`).
    #[must_use]
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::Url(_) => "url",
            Self::Paste(_) => "paste",
            Self::Upload { .. } => "upload",
        }
    }

    /// Whether the caller gave nothing to work with.
    #[must_use]
    pub fn is_blank(&self) -> bool {
        match self {
            Self::Url(s) | Self::Paste(s) => s.trim().is_empty(),
            Self::Upload { content, .. } => content.trim().is_empty(),
        }
    }
}

/// Heuristically detected authentication style of the target API.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthType {
    /// `Authorization: Bearer <token>`.
    #[default]
    Bearer,
    /// Static key in a header or query parameter.
    #[serde(rename = "apikey")]
    ApiKey,
    /// OAuth 2 flows.
    #[serde(rename = "oauth")]
    OAuth,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Bearer => "bearer",
            Self::ApiKey => "apikey",
            Self::OAuth => "oauth",
        })
    }
}

/// Aggregate produced by one crawl or parse session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrawlResult {
    /// Unique endpoints in discovery order.
    pub endpoints: Vec<Endpoint>,
    /// Every URL actually fetched or used, in first-use order.
    pub source_urls: Vec<String>,
    /// Best-effort inferred API origin.
    pub base_url: String,
    /// Detected authentication style.
    pub auth_type: AuthType,
    /// `[Component] message` trace lines.
    pub logs: Vec<String>,
    /// Set when the time budget ran out before the crawl finished.
    #[serde(default)]
    pub timed_out: bool,
    /// When the session finished.
    pub crawled_at: DateTime<Utc>,
}

/// Details attached to [`crate::Error::NoEndpointsFound`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoEndpointsReport {
    /// Actionable hints for the caller.
    pub suggestions: Vec<String>,
    /// Accumulated session log.
    pub logs: Vec<String>,
    /// URLs that were fetched before giving up.
    pub source_urls: Vec<String>,
}

impl NoEndpointsReport {
    /// Standard suggestions for an empty result.
    #[must_use]
    pub fn standard_suggestions(input: &CrawlInput) -> Vec<String> {
        let mut suggestions = vec![
            "Point the crawler at the API reference page rather than a landing page".to_string(),
            "If the API publishes an OpenAPI/Swagger file, pass its URL directly".to_string(),
            "Paste the spec or a Postman collection export instead of crawling".to_string(),
        ];
        if matches!(input, CrawlInput::Url(_)) {
            suggestions.push(
                "Pages that render their content with JavaScript need a deep-crawl API key"
                    .to_string(),
            );
        }
        suggestions
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;

    #[test]
    fn test_auth_type_wire_names() {
        assert_eq!(serde_json::to_string(&AuthType::Bearer).unwrap(), "\"bearer\"");
        assert_eq!(serde_json::to_string(&AuthType::ApiKey).unwrap(), "\"apikey\"");
        assert_eq!(serde_json::to_string(&AuthType::OAuth).unwrap(), "\"oauth\"");
        assert_eq!(AuthType::ApiKey.to_string(), "apikey");
    }

    #[test]
    fn test_blank_inputs() {
        assert!(CrawlInput::Url("  ".into()).is_blank());
        assert!(CrawlInput::Paste(String::new()).is_blank());
        assert!(
            !CrawlInput::Upload {
                file_name: "a.json".into(),
                content: "{}".into()
            }
            .is_blank()
        );
    }

    #[test]
    fn test_url_suggestions_mention_deep_crawl() {
        let url = NoEndpointsReport::standard_suggestions(&CrawlInput::Url("https://x".into()));
        let paste = NoEndpointsReport::standard_suggestions(&CrawlInput::Paste("x".into()));
        assert_eq!(url.len(), paste.len() + 1);
    }
}
