//! Error types and handling for docmcp-core operations.
//!
//! This module provides a single error type covering every failure in the
//! discovery pipeline. Most of these never reach a caller: the crawl
//! orchestrator catches per-URL and per-document errors at the smallest
//! possible scope, records a log line, and moves on. Only precondition
//! violations and [`Error::NoEndpointsFound`] surface from [`crate::Crawler::crawl`].
//!
//! ## Error Categories
//!
//! - **Network Errors**: HTTP requests, connectivity, non-success statuses
//! - **Safety Errors**: URLs rejected before any fetch (`InvalidUrl`, `UnsafeUrl`)
//! - **Resource Errors**: per-fetch timeouts, oversized bodies, the crawl time budget
//! - **Parse Errors**: spec documents, YAML, JSON
//! - **Collaborator Errors**: description enhancement and deep-crawl jobs
//! - **Terminal Outcome**: `NoEndpointsFound`, carrying suggestions and logs
//!
//! ## Recovery Hints
//!
//! ```rust
//! use docmcp_core::Error;
//!
//! let err = Error::Timeout("GET https://example.com/docs".to_string());
//! assert!(err.is_recoverable());
//! assert_eq!(err.category(), "timeout");
//! ```

use crate::types::NoEndpointsReport;
use thiserror::Error;

/// The main error type for docmcp-core operations.
///
/// All public functions in docmcp-core return `Result<T, Error>`.
///
/// ## Display vs Debug
///
/// - `Display` provides user-friendly error messages
/// - `Debug` includes full error details and source chain information
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation failed.
    ///
    /// Covers reading configuration files and uploaded documents.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Network operation failed.
    ///
    /// Covers connection failures and non-success HTTP statuses other than 404.
    /// The underlying `reqwest::Error` is preserved for detailed connection information.
    ///
    /// ## Recoverability
    ///
    /// Connection and timeout errors are typically recoverable, while
    /// status errors are permanent for the duration of a crawl.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Parsing operation failed.
    ///
    /// Occurs when a document is not a recognizable spec, or JSON/YAML
    /// content cannot be read. Inside a crawl this only means the document
    /// yields zero endpoints.
    #[error("Parse error: {0}")]
    Parse(String),

    /// Configuration is invalid or inaccessible.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource was not found (HTTP 404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// URL is malformed or uses a scheme other than http/https.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// URL points at a loopback, private or link-local host.
    ///
    /// The check is a hostname prefix match (`localhost`, `127.`, `10.`,
    /// `192.168.`, `169.254.`), not CIDR matching.
    #[error("Unsafe URL: {0}")]
    UnsafeUrl(String),

    /// A single fetch exceeded its timeout.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// The declared or streamed body size exceeded the configured ceiling.
    #[error("Content too large at '{url}': {size} bytes exceeds limit of {limit} bytes")]
    OversizedContent {
        /// URL that produced the oversized body.
        url: String,
        /// Declared or observed size in bytes.
        size: u64,
        /// Configured ceiling in bytes.
        limit: u64,
    },

    /// The crawl-wide time budget is spent; no further network I/O is issued.
    #[error("Crawl time budget exhausted")]
    BudgetExhausted,

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Caller supplied no usable input.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The description-enhancement collaborator failed.
    ///
    /// Never fatal: the crawl keeps the original endpoints.
    #[error("Enhancement failed: {0}")]
    Enhancement(String),

    /// The external deep-crawl job failed or did not finish in time.
    #[error("Deep crawl failed: {0}")]
    DeepCrawl(String),

    /// A full crawl, including every fallback, produced zero endpoints.
    ///
    /// The report carries actionable suggestions and the accumulated logs.
    #[error("No API endpoints found ({} log lines, {} suggestions)", .0.logs.len(), .0.suggestions.len())]
    NoEndpointsFound(Box<NoEndpointsReport>),

    /// Generic error for uncategorized failures.
    #[error("{0}")]
    Other(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for Error {
    fn from(err: serde_yaml::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl Error {
    /// Check if the error might be recoverable through a later attempt.
    ///
    /// The crawler itself never retries a URL; this is a hint for callers
    /// deciding whether re-running a whole crawl may help.
    ///
    /// ```rust
    /// use docmcp_core::Error;
    ///
    /// assert!(Error::Timeout("slow".to_string()).is_recoverable());
    /// assert!(!Error::UnsafeUrl("http://localhost".to_string()).is_recoverable());
    /// ```
    #[must_use]
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Network(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout(_) | Self::BudgetExhausted | Self::DeepCrawl(_) | Self::Enhancement(_) => {
                true
            },
            Self::Io(e) => matches!(
                e.kind(),
                std::io::ErrorKind::TimedOut | std::io::ErrorKind::Interrupted
            ),
            _ => false,
        }
    }

    /// Get the error category as a string identifier.
    ///
    /// Used as a stable key in log lines and CLI output.
    #[must_use]
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Io(_) => "io",
            Self::Network(_) => "network",
            Self::Parse(_) => "parse",
            Self::Config(_) => "config",
            Self::NotFound(_) => "not_found",
            Self::InvalidUrl(_) => "invalid_url",
            Self::UnsafeUrl(_) => "unsafe_url",
            Self::Timeout(_) => "timeout",
            Self::OversizedContent { .. } => "oversized_content",
            Self::BudgetExhausted => "budget_exhausted",
            Self::Serialization(_) => "serialization",
            Self::InvalidInput(_) => "invalid_input",
            Self::Enhancement(_) => "enhancement",
            Self::DeepCrawl(_) => "deep_crawl",
            Self::NoEndpointsFound(_) => "no_endpoints",
            Self::Other(_) => "other",
        }
    }
}

/// Convenience type alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::disallowed_macros,
    clippy::unwrap_used,
    clippy::unnecessary_wraps
)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::io;

    #[test]
    fn test_error_display_formatting() {
        let errors = vec![
            (Error::Parse("invalid syntax".to_string()), "Parse error"),
            (Error::Config("missing field".to_string()), "Configuration error"),
            (Error::NotFound("document".to_string()), "Not found"),
            (Error::InvalidUrl("not a url".to_string()), "Invalid URL"),
            (Error::UnsafeUrl("http://10.0.0.1".to_string()), "Unsafe URL"),
            (Error::Timeout("operation timed out".to_string()), "Timeout"),
            (Error::InvalidInput("empty".to_string()), "Invalid input"),
            (Error::Enhancement("bad key".to_string()), "Enhancement failed"),
            (Error::DeepCrawl("job failed".to_string()), "Deep crawl failed"),
        ];

        for (error, prefix) in errors {
            let error_string = error.to_string();
            assert!(
                error_string.contains(prefix),
                "'{error_string}' should contain '{prefix}'"
            );
        }
    }

    #[test]
    fn test_oversized_content_display() {
        let error = Error::OversizedContent {
            url: "https://example.com/big".to_string(),
            size: 10_000,
            limit: 5_000,
        };
        let s = error.to_string();
        assert!(s.contains("https://example.com/big"));
        assert!(s.contains("10000"));
        assert!(s.contains("5000"));
    }

    #[test]
    fn test_no_endpoints_display_mentions_counts() {
        let report = NoEndpointsReport {
            suggestions: vec!["Try the OpenAPI URL directly".to_string()],
            logs: vec!["[Crawler] a".to_string(), "[Crawler] b".to_string()],
            source_urls: Vec::new(),
        };
        let error = Error::NoEndpointsFound(Box::new(report));
        let s = error.to_string();
        assert!(s.contains("2 log lines"));
        assert!(s.contains("1 suggestions"));
        assert_eq!(error.category(), "no_endpoints");
    }

    #[test]
    fn test_error_from_io_error() {
        let error: Error = io::Error::new(io::ErrorKind::NotFound, "file not found").into();
        match error {
            Error::Io(inner) => assert!(inner.to_string().contains("file not found")),
            _ => panic!("Expected IO error variant"),
        }
    }

    #[test]
    fn test_error_from_serde_json() {
        let parse_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let error: Error = parse_err.into();
        assert_eq!(error.category(), "serialization");
    }

    #[test]
    fn test_error_categories() {
        let error_categories = vec![
            (Error::Io(io::Error::other("test")), "io"),
            (Error::Parse("test".to_string()), "parse"),
            (Error::Config("test".to_string()), "config"),
            (Error::NotFound("test".to_string()), "not_found"),
            (Error::InvalidUrl("test".to_string()), "invalid_url"),
            (Error::UnsafeUrl("test".to_string()), "unsafe_url"),
            (Error::Timeout("test".to_string()), "timeout"),
            (Error::BudgetExhausted, "budget_exhausted"),
            (Error::Serialization("test".to_string()), "serialization"),
            (Error::InvalidInput("test".to_string()), "invalid_input"),
            (Error::Enhancement("test".to_string()), "enhancement"),
            (Error::DeepCrawl("test".to_string()), "deep_crawl"),
            (Error::Other("test".to_string()), "other"),
        ];

        for (error, expected_category) in error_categories {
            assert_eq!(error.category(), expected_category);
        }
    }

    #[test]
    fn test_error_recoverability() {
        let recoverable_errors = vec![
            Error::Io(io::Error::new(io::ErrorKind::TimedOut, "timeout")),
            Error::Timeout("request timeout".to_string()),
            Error::BudgetExhausted,
            Error::Enhancement("rate limited".to_string()),
        ];

        let non_recoverable_errors = vec![
            Error::Io(io::Error::new(io::ErrorKind::NotFound, "not found")),
            Error::Parse("bad syntax".to_string()),
            Error::Config("invalid config".to_string()),
            Error::InvalidUrl("bad url".to_string()),
            Error::UnsafeUrl("http://127.0.0.1".to_string()),
            Error::OversizedContent {
                url: "u".to_string(),
                size: 2,
                limit: 1,
            },
            Error::Other("generic error".to_string()),
        ];

        for error in recoverable_errors {
            assert!(
                error.is_recoverable(),
                "Expected {error:?} to be recoverable"
            );
        }

        for error in non_recoverable_errors {
            assert!(
                !error.is_recoverable(),
                "Expected {error:?} to be non-recoverable"
            );
        }
    }

    #[test]
    fn test_error_size() {
        let error_size = std::mem::size_of::<Error>();
        assert!(error_size <= 64, "Error type too large: {error_size} bytes");
    }

    proptest! {
        #[test]
        fn test_parse_error_with_arbitrary_messages(msg in r".{0,500}") {
            let error = Error::Parse(msg.clone());
            let error_string = error.to_string();

            prop_assert!(error_string.contains("Parse error"));
            prop_assert!(error_string.contains(&msg));
            prop_assert_eq!(error.category(), "parse");
            prop_assert!(!error.is_recoverable());
        }

        #[test]
        fn test_other_error_with_arbitrary_messages(msg in r".{0,500}") {
            let error = Error::Other(msg.clone());
            prop_assert_eq!(error.to_string(), msg);
            prop_assert_eq!(error.category(), "other");
        }
    }
}
