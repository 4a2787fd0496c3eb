//! Firecrawl crawl jobs over the HTTP API.
//!
//! `POST {api_base}/v1/crawl` starts a job and returns its id; the job is then
//! polled with `GET {api_base}/v1/crawl/{id}` until it reports `completed`,
//! reports `failed`, or the attempt budget runs out.

use super::{DeepCrawlPage, DeepCrawler};
use crate::config::DeepCrawlConfig;
use crate::session::CrawlSession;
use crate::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Timeout for each individual API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

/// Firecrawl-backed [`DeepCrawler`].
#[derive(Debug, Clone)]
pub struct FirecrawlDeepCrawler {
    client: Client,
    api_key: String,
    api_base: String,
    poll_interval: Duration,
    max_attempts: u32,
    page_limit: usize,
}

#[derive(Debug, Deserialize)]
struct StartResponse {
    #[serde(default)]
    success: bool,
    id: Option<String>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusResponse {
    status: String,
    #[serde(default)]
    data: Vec<CrawledDocument>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrawledDocument {
    html: Option<String>,
    markdown: Option<String>,
    #[serde(default)]
    metadata: DocumentMetadata,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct DocumentMetadata {
    #[serde(rename = "sourceURL")]
    source_url: Option<String>,
    url: Option<String>,
}

impl CrawledDocument {
    fn into_page(self) -> Option<DeepCrawlPage> {
        let url = self
            .metadata
            .source_url
            .or(self.metadata.url)
            .unwrap_or_default();
        let content = self
            .html
            .filter(|h| !h.trim().is_empty())
            .or(self.markdown)
            .filter(|c| !c.trim().is_empty())?;
        Some(DeepCrawlPage { url, content })
    }
}

impl FirecrawlDeepCrawler {
    /// Crawler from `config`.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] without an API key.
    pub fn new(config: &DeepCrawlConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::Config("deep_crawl.api_key is not set".to_string()))?;
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            client,
            api_key,
            api_base: config.api_base.trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            max_attempts: config.max_attempts,
            page_limit: config.page_limit,
        })
    }

    async fn start(&self, session: &CrawlSession, seed: &str) -> Result<String> {
        let response = self
            .client
            .post(format!("{}/v1/crawl", self.api_base))
            .bearer_auth(&self.api_key)
            .timeout(request_timeout(session)?)
            .json(&json!({
                "url": seed,
                "limit": self.page_limit,
                "scrapeOptions": {"formats": ["html", "markdown"]}
            }))
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::DeepCrawl(format!("crawl submit returned {status}")));
        }
        let body: StartResponse = response.json().await?;
        match body.id {
            Some(id) if body.success => Ok(id),
            _ => Err(Error::DeepCrawl(
                body.error
                    .unwrap_or_else(|| "crawl submit returned no job id".to_string()),
            )),
        }
    }

    async fn poll(&self, session: &CrawlSession, id: &str) -> Result<StatusResponse> {
        let response = self
            .client
            .get(format!("{}/v1/crawl/{id}", self.api_base))
            .bearer_auth(&self.api_key)
            .timeout(request_timeout(session)?)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::DeepCrawl(format!("crawl status returned {status}")));
        }
        Ok(response.json().await?)
    }
}

/// Per-call timeout: [`REQUEST_TIMEOUT`] or whatever budget is left, if less.
fn request_timeout(session: &CrawlSession) -> Result<Duration> {
    let remaining = session.remaining();
    if remaining.is_zero() {
        return Err(Error::BudgetExhausted);
    }
    Ok(REQUEST_TIMEOUT.min(remaining))
}

#[async_trait::async_trait]
impl DeepCrawler for FirecrawlDeepCrawler {
    fn name(&self) -> &'static str {
        "firecrawl"
    }

    #[instrument(skip(self, session))]
    async fn crawl(&self, session: &CrawlSession, seed: &str) -> Result<Vec<DeepCrawlPage>> {
        if session.budget_exhausted() {
            return Err(Error::BudgetExhausted);
        }
        let id = self.start(session, seed).await?;
        session.log("DeepCrawl", format!("Submitted firecrawl job {id} for {seed}"));

        for attempt in 1..=self.max_attempts {
            let wait = self.poll_interval.min(session.remaining());
            if wait.is_zero() && session.budget_exhausted() {
                session.log("DeepCrawl", format!("Budget spent while waiting on job {id}"));
                return Err(Error::BudgetExhausted);
            }
            tokio::time::sleep(wait).await;

            let status = match self.poll(session, &id).await {
                Ok(status) => status,
                Err(Error::BudgetExhausted) => return Err(Error::BudgetExhausted),
                Err(e) => {
                    warn!(attempt, error = %e, "firecrawl status poll failed");
                    continue;
                },
            };
            debug!(attempt, status = %status.status, pages = status.data.len(), "firecrawl poll");
            match status.status.as_str() {
                "completed" => {
                    let pages: Vec<DeepCrawlPage> = status
                        .data
                        .into_iter()
                        .filter_map(CrawledDocument::into_page)
                        .collect();
                    session.log(
                        "DeepCrawl",
                        format!("Job {id} completed with {} pages", pages.len()),
                    );
                    return Ok(pages);
                },
                "failed" | "cancelled" => {
                    let reason = status.error.unwrap_or_else(|| status.status.clone());
                    session.log("DeepCrawl", format!("Job {id} ended: {reason}"));
                    return Err(Error::DeepCrawl(reason));
                },
                _ => {},
            }
        }

        session.log(
            "DeepCrawl",
            format!("Job {id} still running after {} polls, giving up", self.max_attempts),
        );
        Err(Error::Timeout(format!(
            "firecrawl job {id} after {} polls",
            self.max_attempts
        )))
    }
}
