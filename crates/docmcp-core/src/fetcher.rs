use crate::discovery::filter::is_acceptable_with;
use crate::session::CrawlSession;
use crate::{CrawlConfig, Error, Result};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode, redirect};
use std::time::Duration;
use tracing::{debug, instrument};

/// Identifying user agent sent with every request.
pub const USER_AGENT: &str = concat!(
    "docmcp/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/docmcp/docmcp; API documentation crawler)"
);

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: usize = 5;

/// A fully read HTTP response.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// Response status.
    pub status: StatusCode,
    /// Response headers.
    pub headers: HeaderMap,
    /// Body decoded as UTF-8 (lossy).
    pub body: String,
    /// URL after redirects.
    pub final_url: String,
}

impl FetchResponse {
    /// `Content-Type` without parameters, lowercased.
    #[must_use]
    pub fn content_type(&self) -> Option<String> {
        self.headers
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
    }
}

/// Per-call overrides.
#[derive(Debug, Clone, Default)]
pub struct FetchOptions {
    /// Extra headers, applied on top of the defaults.
    pub headers: Vec<(String, String)>,
    /// Overrides the fetcher's per-page timeout.
    pub timeout: Option<Duration>,
}

/// HTTP client enforcing the crawl's safety, time and size limits.
///
/// Every call checks the session budget first and fails with
/// [`Error::BudgetExhausted`] without touching the network once it is spent.
/// The effective timeout is the smaller of the per-page timeout and the
/// remaining budget.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    page_timeout: Duration,
    max_body_bytes: u64,
    allow_private_network: bool,
}

impl Fetcher {
    /// Fetcher with the limits from `config`.
    pub fn new(config: &CrawlConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .gzip(true)
            .brotli(true)
            .redirect(same_host_redirects())
            .build()
            .map_err(Error::Network)?;
        Ok(Self {
            client,
            page_timeout: config.page_timeout(),
            max_body_bytes: config.max_body_bytes,
            allow_private_network: config.allow_private_network,
        })
    }

    /// `GET` with default options.
    pub async fn get(&self, session: &CrawlSession, url: &str) -> Result<FetchResponse> {
        self.fetch(session, url, &FetchOptions::default()).await
    }

    /// `GET` returning the status and fully read body.
    #[instrument(skip(self, session, options))]
    pub async fn fetch(
        &self,
        session: &CrawlSession,
        url: &str,
        options: &FetchOptions,
    ) -> Result<FetchResponse> {
        let limit = self.effective_timeout(session, url, options)?;
        let request = self.request(Method::GET, url, options)?;

        let max_bytes = self.max_body_bytes;
        let outcome = tokio::time::timeout(limit, async move {
            let response = check_status(url, request.send().await?)?;
            read_bounded(url, response, max_bytes).await
        })
        .await;

        match outcome {
            Ok(Ok(response)) => {
                session.log(
                    "Fetcher",
                    format!("GET {url} -> {} ({} bytes)", response.status, response.body.len()),
                );
                Ok(response)
            },
            Ok(Err(e)) => {
                session.log("Fetcher", format!("GET {url} failed: {e}"));
                Err(e)
            },
            Err(_) => {
                session.log("Fetcher", format!("GET {url} timed out after {limit:?}"));
                Err(Error::Timeout(format!("{url} after {}ms", limit.as_millis())))
            },
        }
    }

    /// `HEAD` returning the status code. Non-2xx statuses are not errors here.
    #[instrument(skip(self, session))]
    pub async fn head(&self, session: &CrawlSession, url: &str) -> Result<StatusCode> {
        let options = FetchOptions::default();
        let limit = self.effective_timeout(session, url, &options)?;
        let request = self.request(Method::HEAD, url, &options)?;
        match tokio::time::timeout(limit, request.send()).await {
            Ok(Ok(response)) => {
                let status = response.status();
                session.log("Fetcher", format!("HEAD {url} -> {status}"));
                Ok(status)
            },
            Ok(Err(e)) => {
                session.log("Fetcher", format!("HEAD {url} failed: {e}"));
                Err(Error::Network(e))
            },
            Err(_) => {
                session.log("Fetcher", format!("HEAD {url} timed out after {limit:?}"));
                Err(Error::Timeout(format!("{url} after {}ms", limit.as_millis())))
            },
        }
    }

    fn effective_timeout(
        &self,
        session: &CrawlSession,
        url: &str,
        options: &FetchOptions,
    ) -> Result<Duration> {
        if session.budget_exhausted() {
            debug!("budget exhausted, not fetching {url}");
            return Err(Error::BudgetExhausted);
        }
        if !is_acceptable_with(url, self.allow_private_network) {
            session.log("Safety", format!("Rejected unsafe URL {url}"));
            return Err(Error::UnsafeUrl(url.to_string()));
        }
        Ok(options
            .timeout
            .unwrap_or(self.page_timeout)
            .min(session.remaining()))
    }

    fn request(
        &self,
        method: Method,
        url: &str,
        options: &FetchOptions,
    ) -> Result<reqwest::RequestBuilder> {
        let mut headers = HeaderMap::new();
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| Error::InvalidInput(format!("header name '{name}': {e}")))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| Error::InvalidInput(format!("header value for '{name}': {e}")))?;
            headers.insert(name, value);
        }
        Ok(self.client.request(method, url).headers(headers))
    }
}

fn same_host_redirects() -> redirect::Policy {
    redirect::Policy::custom(|attempt| {
        let same_host = attempt
            .previous()
            .first()
            .is_some_and(|origin| origin.host_str() == attempt.url().host_str());
        if attempt.previous().len() > MAX_REDIRECTS {
            attempt.error("too many redirects")
        } else if same_host {
            attempt.follow()
        } else {
            attempt.stop()
        }
    })
}

fn check_status(url: &str, response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status.is_redirection() {
        // Only cross-host redirects are left unfollowed.
        return Err(Error::UnsafeUrl(format!("{url} redirects off-origin")));
    }
    if status == StatusCode::NOT_FOUND {
        return Err(Error::NotFound(format!("Nothing at '{url}'")));
    }
    match response.error_for_status() {
        Ok(response) => Ok(response),
        Err(err) => Err(Error::Network(err)),
    }
}

async fn read_bounded(url: &str, mut response: Response, limit: u64) -> Result<FetchResponse> {
    let declared = response
        .headers()
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok());
    if let Some(size) = declared.filter(|&size| size > limit) {
        return Err(Error::OversizedContent {
            url: url.to_string(),
            size,
            limit,
        });
    }

    let status = response.status();
    let headers = response.headers().clone();
    let final_url = response.url().to_string();

    let mut bytes: Vec<u8> = Vec::new();
    while let Some(chunk) = response.chunk().await? {
        bytes.extend_from_slice(&chunk);
        let read = bytes.len() as u64;
        if read > limit {
            return Err(Error::OversizedContent {
                url: url.to_string(),
                size: read,
                limit,
            });
        }
    }

    Ok(FetchResponse {
        status,
        headers,
        body: String::from_utf8_lossy(&bytes).into_owned(),
        final_url,
    })
}
