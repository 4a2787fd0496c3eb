use anyhow::Result;
use docmcp_core::{CrawlConfig, CrawlInput, Crawler};
use tracing::warn;

use crate::cli::OutputArgs;
use crate::output;

/// Crawl `url` and emit the result.
pub async fn crawl(config: CrawlConfig, url: &str, out: &OutputArgs) -> Result<()> {
    let crawler = Crawler::from_config(config)?;
    let result = crawler.crawl(CrawlInput::Url(url.to_string())).await?;
    if result.timed_out {
        warn!(
            endpoints = result.endpoints.len(),
            "time budget ran out; emitting partial result"
        );
    }
    output::emit(&result, out)
}
