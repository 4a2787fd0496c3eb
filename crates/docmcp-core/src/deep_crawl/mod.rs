//! Hand-off to an external crawling service as the last fallback.
//!
//! The service is an opaque async job: submit a seed, poll at a fixed
//! interval for a bounded number of attempts, then feed the returned pages
//! through the same HTML extractor as locally fetched ones.
//!
//! ```rust,no_run
//! use docmcp_core::deep_crawl::{DeepCrawler, FirecrawlDeepCrawler};
//! use docmcp_core::{CrawlConfig, CrawlSession};
//!
//! # async fn example() -> docmcp_core::Result<()> {
//! let mut config = CrawlConfig::default();
//! config.deep_crawl.api_key = Some("fc-...".to_string());
//! let crawler = FirecrawlDeepCrawler::new(&config.deep_crawl)?;
//! let session = CrawlSession::new(config.total_budget());
//! let pages = crawler.crawl(&session, "https://example.com/docs").await?;
//! println!("{} pages", pages.len());
//! # Ok(())
//! # }
//! ```

pub mod firecrawl;

use crate::Result;
use crate::session::CrawlSession;
use serde::{Deserialize, Serialize};

pub use firecrawl::FirecrawlDeepCrawler;

/// One page returned by the service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeepCrawlPage {
    /// Page URL as reported by the service.
    pub url: String,
    /// HTML when available, otherwise markdown.
    pub content: String,
}

/// External crawling service.
#[async_trait::async_trait]
pub trait DeepCrawler: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Crawl from `seed` and return the pages the service collected.
    async fn crawl(&self, session: &CrawlSession, seed: &str) -> Result<Vec<DeepCrawlPage>>;
}

/// Never crawls anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopDeepCrawler;

#[async_trait::async_trait]
impl DeepCrawler for NoopDeepCrawler {
    fn name(&self) -> &'static str {
        "noop"
    }

    async fn crawl(&self, _session: &CrawlSession, _seed: &str) -> Result<Vec<DeepCrawlPage>> {
        Ok(Vec::new())
    }
}
