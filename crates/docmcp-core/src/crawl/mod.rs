//! Crawl orchestration.
//!
//! A crawl moves through `Seeded → Fetching → Parsing → Discovering`, looping
//! until the frontier drains or a budget runs out, then runs the fallback
//! stage and finishes:
//!
//! 1. Pop up to `max_parallel` URLs. Static assets, cross-origin and unsafe
//!    URLs are dropped without a request.
//! 2. Fetch the batch concurrently and wait for every fetch to settle.
//! 3. Route each body by content type, extension or shape to the spec
//!    parsers, falling back to the HTML extractor and link discovery.
//! 4. Merge results into the shared endpoint set and frontier. Only the
//!    orchestrating task touches them, strictly between batches.
//!
//! Per-URL failures become log lines. The only errors a crawl returns are a
//! blank or malformed seed and [`Error::NoEndpointsFound`] for a crawl that
//! finished within budget with nothing to show. A crawl cut short by its time
//! budget returns its partial result with `timed_out` set.

mod fallback;
pub mod frontier;
pub mod infer;

use crate::assist::{Enhancer, LinkSuggester, OpenAiEnhancer, OpenAiLinkSuggester, enhance_endpoints};
use crate::config::CrawlConfig;
use crate::deep_crawl::{DeepCrawler, FirecrawlDeepCrawler};
use crate::discovery::filter::{
    has_spec_extension, hostname, is_acceptable_with, is_same_origin, is_static_asset,
};
use crate::discovery::links::{DiscoveredLinks, discover_links};
use crate::discovery::probe::origin_of;
use crate::endpoint::EndpointSet;
use crate::extract::{Extraction, Page, extract_page};
use crate::fetcher::Fetcher;
use crate::session::{Clock, CrawlSession};
use crate::spec::{self, ParsedSpec, SpecKind, looks_like_document};
use crate::types::{AuthType, CrawlInput, CrawlResult, NoEndpointsReport};
use crate::{Error, Result};
use chrono::Utc;
use frontier::Frontier;
use futures::future::join_all;
use infer::{AuthScores, most_frequent_origin};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

/// Hosts a crawl may visit: the seed host plus the configured allow-list.
#[derive(Debug, Clone)]
struct Scope {
    seed_host: String,
    allowed_domains: Vec<String>,
}

impl Scope {
    fn admits(&self, url: &str) -> bool {
        is_same_origin(url, &self.seed_host, &self.allowed_domains)
    }
}

/// What one document turned out to be.
enum Analysis {
    Spec(ParsedSpec),
    Page {
        extraction: Extraction,
        links: DiscoveredLinks,
        auth: AuthScores,
    },
}

/// Outcome of fetching and analysing one URL.
enum Visit {
    Done {
        url: String,
        final_url: String,
        depth: usize,
        analysis: Analysis,
        suggested: Vec<String>,
    },
    Failed {
        budget: bool,
    },
}

/// Everything learned so far. Merged strictly between batches.
#[derive(Debug, Default)]
struct Harvest {
    endpoints: EndpointSet,
    source_urls: Vec<String>,
    spec_base_url: Option<String>,
    spec_auth: Option<AuthType>,
    origins: Vec<String>,
    auth_scores: AuthScores,
    structured_spec: bool,
    timed_out: bool,
}

impl Harvest {
    fn record_source(&mut self, url: &str) {
        if !url.is_empty() && !self.source_urls.iter().any(|u| u == url) {
            self.source_urls.push(url.to_string());
        }
    }

    fn absorb_spec(&mut self, session: &CrawlSession, source: &str, parsed: ParsedSpec) -> usize {
        let ParsedSpec {
            kind,
            endpoints,
            base_url,
            auth_type,
            title,
            ..
        } = parsed;
        let found = endpoints.len();
        let added = self.endpoints.extend(endpoints);
        let title = title.map(|t| format!(" \"{t}\"")).unwrap_or_default();
        session.log(
            kind.component(),
            format!("Parsed {found} endpoints from {source}{title} ({added} new)"),
        );
        if found > 0 {
            if self.spec_base_url.is_none() {
                self.spec_base_url = base_url;
            }
            if self.spec_auth.is_none() {
                self.spec_auth = auth_type;
            }
            if kind != SpecKind::Generic {
                self.structured_spec = true;
            }
        }
        added
    }

    fn absorb_extraction(
        &mut self,
        session: &CrawlSession,
        source: &str,
        extraction: Extraction,
        auth: AuthScores,
    ) -> usize {
        let Extraction {
            endpoints,
            origins,
            sources,
        } = extraction;
        let found = endpoints.len();
        let added = self.endpoints.extend(endpoints);
        self.origins.extend(origins);
        self.auth_scores.add(auth);
        let mut names: Vec<&str> = Vec::new();
        for name in sources {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        let via = if names.is_empty() {
            String::new()
        } else {
            format!(" via {}", names.join(", "))
        };
        session.log(
            "Extractor",
            format!("Found {found} endpoints on {source}{via} ({added} new)"),
        );
        added
    }

    /// Merge a non-HTTP analysis (pasted content, deep-crawl pages).
    fn absorb(&mut self, session: &CrawlSession, source: &str, analysis: Analysis) -> usize {
        match analysis {
            Analysis::Spec(parsed) => self.absorb_spec(session, source, parsed),
            Analysis::Page {
                extraction, auth, ..
            } => self.absorb_extraction(session, source, extraction, auth),
        }
    }
}

/// Route `body` to the spec parsers or the HTML extractor.
///
/// Synchronous so the parsed DOM never lives across an await.
fn analyze(
    session: &CrawlSession,
    source: &str,
    body: &str,
    spec_hint: bool,
    scope: Option<&Scope>,
) -> Analysis {
    let markup = body.trim_start().starts_with('<');
    if (spec_hint && !markup) || looks_like_document(body) {
        match spec::parse_document(body) {
            Ok(parsed) => return Analysis::Spec(parsed),
            Err(e) => session.log(
                "Parser",
                format!("{source} is not a usable spec ({e}); using HTML extraction"),
            ),
        }
    }
    let page = Page::parse(body);
    let extraction = extract_page(&page);
    let auth = AuthScores::from_text(page.text());
    let links = scope
        .map(|s| discover_links(&page, source, &s.seed_host, &s.allowed_domains))
        .unwrap_or_default();
    Analysis::Page {
        extraction,
        links,
        auth,
    }
}

/// Whether a response's metadata marks it as a spec document.
fn spec_hint(url: &str, content_type: Option<&str>) -> bool {
    content_type.is_some_and(|ct| ct.contains("json") || ct.contains("yaml"))
        || has_spec_extension(url)
}

/// Accept `example.com/docs` as `https://example.com/docs`.
fn normalize_seed(seed: &str) -> String {
    let seed = seed.trim();
    if seed.contains("://") {
        seed.to_string()
    } else {
        format!("https://{seed}")
    }
}

/// Documentation crawler.
///
/// ```rust,no_run
/// use docmcp_core::{CrawlConfig, CrawlInput, Crawler};
///
/// # async fn example() -> docmcp_core::Result<()> {
/// let crawler = Crawler::from_config(CrawlConfig::default())?;
/// let result = crawler
///     .crawl(CrawlInput::Url("https://petstore.swagger.io".to_string()))
///     .await?;
/// println!("{} endpoints, base {}", result.endpoints.len(), result.base_url);
/// # Ok(())
/// # }
/// ```
pub struct Crawler {
    config: CrawlConfig,
    fetcher: Fetcher,
    enhancer: Option<Arc<dyn Enhancer>>,
    link_suggester: Option<Arc<dyn LinkSuggester>>,
    deep_crawler: Option<Arc<dyn DeepCrawler>>,
    clock: Option<Arc<dyn Clock>>,
}

impl std::fmt::Debug for Crawler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crawler")
            .field("config", &self.config)
            .field("enhancer", &self.enhancer.as_ref().map(|e| e.name()))
            .field("link_suggester", &self.link_suggester.as_ref().map(|s| s.name()))
            .field("deep_crawler", &self.deep_crawler.as_ref().map(|d| d.name()))
            .finish_non_exhaustive()
    }
}

impl Crawler {
    /// Crawler with no collaborators attached.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] for an invalid configuration, [`Error::Network`] if
    /// the HTTP client cannot be built.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        config.validate()?;
        let fetcher = Fetcher::new(&config)?;
        Ok(Self {
            config,
            fetcher,
            enhancer: None,
            link_suggester: None,
            deep_crawler: None,
            clock: None,
        })
    }

    /// Crawler with the OpenAI and Firecrawl collaborators attached whenever
    /// their API keys are configured.
    ///
    /// # Errors
    ///
    /// See [`Crawler::new`].
    pub fn from_config(config: CrawlConfig) -> Result<Self> {
        let mut crawler = Self::new(config)?;
        if crawler.config.enhance.api_key.is_some() {
            match OpenAiEnhancer::new(&crawler.config.enhance) {
                Ok(enhancer) => crawler.enhancer = Some(Arc::new(enhancer)),
                Err(e) => warn!(error = %e, "description enhancement disabled"),
            }
            if crawler.config.suggest_links {
                match OpenAiLinkSuggester::new(&crawler.config.enhance) {
                    Ok(suggester) => crawler.link_suggester = Some(Arc::new(suggester)),
                    Err(e) => warn!(error = %e, "link suggestion disabled"),
                }
            }
        }
        if crawler.config.deep_crawl.api_key.is_some() {
            match FirecrawlDeepCrawler::new(&crawler.config.deep_crawl) {
                Ok(deep) => crawler.deep_crawler = Some(Arc::new(deep)),
                Err(e) => warn!(error = %e, "deep crawl disabled"),
            }
        }
        Ok(crawler)
    }

    /// Attach a description enhancer.
    #[must_use]
    pub fn with_enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Attach a link suggester. It is only consulted when `suggest_links` is on.
    #[must_use]
    pub fn with_link_suggester(mut self, suggester: Arc<dyn LinkSuggester>) -> Self {
        self.link_suggester = Some(suggester);
        self
    }

    /// Attach a deep-crawl service for the last fallback step.
    #[must_use]
    pub fn with_deep_crawler(mut self, deep_crawler: Arc<dyn DeepCrawler>) -> Self {
        self.deep_crawler = Some(deep_crawler);
        self
    }

    /// Measure the time budget on `clock` instead of the wall clock.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &CrawlConfig {
        &self.config
    }

    /// Fresh session for one invocation.
    #[must_use]
    pub fn new_session(&self) -> CrawlSession {
        let budget = self.config.total_budget();
        self.clock.as_ref().map_or_else(
            || CrawlSession::new(budget),
            |clock| CrawlSession::with_clock(budget, Arc::clone(clock)),
        )
    }

    /// Crawl or parse `input` in a fresh session.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] for blank input, [`Error::InvalidUrl`] for a seed
    /// that is not a URL, and [`Error::NoEndpointsFound`] when a crawl that
    /// finished within budget found nothing.
    #[instrument(skip(self, input), fields(mode = input.mode()))]
    pub async fn crawl(&self, input: CrawlInput) -> Result<CrawlResult> {
        let session = self.new_session();
        self.crawl_in(&session, &input).await
    }

    /// Crawl or parse `input` inside an existing session.
    ///
    /// # Errors
    ///
    /// See [`Crawler::crawl`].
    pub async fn crawl_in(&self, session: &CrawlSession, input: &CrawlInput) -> Result<CrawlResult> {
        if input.is_blank() {
            return Err(Error::InvalidInput(format!("{} input is empty", input.mode())));
        }
        session.log("Crawler", format!("Starting {} session", input.mode()));

        let (harvest, seed) = match input {
            CrawlInput::Url(raw) => {
                let seed = normalize_seed(raw);
                let parsed = Url::parse(&seed).map_err(|e| Error::InvalidUrl(format!("{seed}: {e}")))?;
                if parsed.host_str().is_none() {
                    return Err(Error::InvalidUrl(seed));
                }
                (self.crawl_url(session, &seed).await, Some(seed))
            },
            CrawlInput::Paste(content) => (Self::analyze_content(session, "pasted content", content, false), None),
            CrawlInput::Upload { file_name, content } => {
                let hint = has_spec_extension(file_name);
                (Self::analyze_content(session, file_name, content, hint), None)
            },
        };
        self.finish(session, input, seed.as_deref(), harvest).await
    }

    /// Paste and upload: no network I/O, no link discovery, no fallbacks.
    fn analyze_content(session: &CrawlSession, label: &str, content: &str, hint: bool) -> Harvest {
        let mut harvest = Harvest::default();
        let analysis = analyze(session, label, content, hint, None);
        harvest.absorb(session, label, analysis);
        debug!(endpoints = harvest.endpoints.len(), "content analysed");
        harvest
    }

    async fn crawl_url(&self, session: &CrawlSession, seed: &str) -> Harvest {
        let mut harvest = Harvest::default();
        let mut frontier = Frontier::new(seed, self.config.max_depth);
        let scope = Scope {
            seed_host: hostname(seed).unwrap_or_default(),
            allowed_domains: self.config.allowed_domains.clone(),
        };

        if !is_acceptable_with(seed, self.config.allow_private_network) {
            session.log("Safety", format!("Rejected unsafe seed URL {seed}"));
            return harvest;
        }
        if self.config.respect_robots {
            session.log("Crawler", "respect_robots is set; robots.txt is not fetched");
        }

        let max_pages = self.config.effective_max_pages();
        let mut pages = 0usize;
        loop {
            if session.budget_exhausted() || harvest.timed_out {
                harvest.timed_out = true;
                session.log(
                    "Crawler",
                    format!("Time budget of {}ms exhausted; returning partial results", session.budget().as_millis()),
                );
                break;
            }
            if frontier.is_empty() {
                debug!(pages, "frontier drained");
                break;
            }
            if pages >= max_pages {
                session.log("Crawler", format!("Page budget of {max_pages} reached"));
                break;
            }

            let batch = frontier.pop_batch(self.config.max_parallel.min(max_pages - pages));
            let runnable: Vec<(String, usize)> = batch
                .into_iter()
                .filter(|(url, _)| self.admit(session, &scope, url))
                .collect();
            if runnable.is_empty() {
                continue;
            }
            pages += runnable.len();
            debug!(batch = runnable.len(), pages, queued = frontier.len(), "fetching batch");

            let visits = join_all(
                runnable
                    .iter()
                    .map(|(url, depth)| self.visit(session, &scope, url, *depth)),
            )
            .await;
            for visit in visits {
                Self::merge(session, &scope, visit, &mut frontier, &mut harvest);
            }

            if self.config.stop_on_spec && harvest.structured_spec {
                session.log("Crawler", "Found an API spec; stopping the crawl");
                break;
            }
        }

        self.run_fallbacks(session, seed, &mut frontier, &mut harvest).await;
        harvest
    }

    /// Gate applied to a popped URL before any request is made.
    fn admit(&self, session: &CrawlSession, scope: &Scope, url: &str) -> bool {
        if is_static_asset(url) {
            session.log("Crawler", format!("Skipping static asset {url}"));
            return false;
        }
        if !is_acceptable_with(url, self.config.allow_private_network) {
            session.log("Safety", format!("Rejected unsafe URL {url}"));
            return false;
        }
        if !scope.admits(url) {
            session.log("Crawler", format!("Skipping cross-origin URL {url}"));
            return false;
        }
        true
    }

    async fn visit(&self, session: &CrawlSession, scope: &Scope, url: &str, depth: usize) -> Visit {
        let response = match self.fetcher.get(session, url).await {
            Ok(response) => response,
            Err(e) => {
                return Visit::Failed {
                    budget: matches!(e, Error::BudgetExhausted),
                };
            },
        };
        let content_type = response.content_type();
        let hint = spec_hint(url, content_type.as_deref());
        let analysis = analyze(session, &response.final_url, &response.body, hint, Some(scope));
        let suggested = if matches!(analysis, Analysis::Page { .. }) {
            self.suggest(session, &response.body, &response.final_url).await
        } else {
            Vec::new()
        };
        Visit::Done {
            url: url.to_string(),
            final_url: response.final_url,
            depth,
            analysis,
            suggested,
        }
    }

    fn merge(
        session: &CrawlSession,
        scope: &Scope,
        visit: Visit,
        frontier: &mut Frontier,
        harvest: &mut Harvest,
    ) {
        let (url, final_url, depth, analysis, suggested) = match visit {
            Visit::Done {
                url,
                final_url,
                depth,
                analysis,
                suggested,
            } => (url, final_url, depth, analysis, suggested),
            Visit::Failed { budget } => {
                harvest.timed_out |= budget;
                return;
            },
        };

        harvest.record_source(&url);
        if final_url != url {
            frontier.mark_seen(&final_url);
        }
        match analysis {
            Analysis::Spec(parsed) => {
                harvest.absorb_spec(session, &url, parsed);
            },
            Analysis::Page {
                extraction,
                links,
                auth,
            } => {
                harvest.absorb_extraction(session, &url, extraction, auth);
                let specs = frontier.push_priority(&links.spec_urls, depth + 1);
                let pages = links
                    .page_urls
                    .iter()
                    .filter(|link| frontier.push(link, depth + 1))
                    .count();
                let extra = suggested
                    .iter()
                    .filter(|link| scope.admits(link) && !is_static_asset(link))
                    .filter(|link| frontier.push(link, depth + 1))
                    .count();
                if specs + pages + extra > 0 {
                    session.log(
                        "Discovery",
                        format!("Queued {specs} spec links and {} page links from {url}", pages + extra),
                    );
                }
            },
        }
    }

    /// Ask the link suggester, if enabled. Failures cost nothing but a log line.
    async fn suggest(&self, session: &CrawlSession, html: &str, page_url: &str) -> Vec<String> {
        if !self.config.suggest_links {
            return Vec::new();
        }
        let Some(suggester) = self.link_suggester.as_ref() else {
            return Vec::new();
        };
        let Ok(base) = Url::parse(page_url) else {
            return Vec::new();
        };
        match tokio::time::timeout(session.remaining(), suggester.suggest_links(html, page_url)).await {
            Ok(Ok(links)) => {
                let resolved: Vec<String> = links
                    .iter()
                    .filter_map(|link| base.join(link.trim()).ok())
                    .filter(|u| matches!(u.scheme(), "http" | "https"))
                    .map(|mut u| {
                        u.set_fragment(None);
                        u.to_string()
                    })
                    .collect();
                session.log(
                    "Discovery",
                    format!("{} suggested {} links for {page_url}", suggester.name(), resolved.len()),
                );
                resolved
            },
            Ok(Err(e)) => {
                session.log("Discovery", format!("Link suggestion failed for {page_url}: {e}"));
                Vec::new()
            },
            Err(_) => {
                session.log("Discovery", format!("Link suggestion timed out for {page_url}"));
                Vec::new()
            },
        }
    }

    async fn finish(
        &self,
        session: &CrawlSession,
        input: &CrawlInput,
        seed: Option<&str>,
        harvest: Harvest,
    ) -> Result<CrawlResult> {
        let Harvest {
            endpoints,
            source_urls,
            spec_base_url,
            spec_auth,
            origins,
            auth_scores,
            timed_out,
            ..
        } = harvest;
        let mut endpoints = endpoints.into_vec();

        if endpoints.is_empty() && !timed_out {
            session.log("Crawler", "No endpoints found after all strategies");
            return Err(Error::NoEndpointsFound(Box::new(NoEndpointsReport {
                suggestions: NoEndpointsReport::standard_suggestions(input),
                logs: session.logs(),
                source_urls,
            })));
        }

        if let Some(enhancer) = self.enhancer.as_ref() {
            if session.budget_exhausted() {
                session.log("Enhancer", "Skipped: time budget exhausted");
            } else if !endpoints.is_empty() {
                let run = enhance_endpoints(
                    enhancer.as_ref(),
                    session,
                    endpoints.clone(),
                    self.config.enhance.max_endpoints,
                );
                match tokio::time::timeout(session.remaining(), run).await {
                    Ok(enhanced) => endpoints = enhanced,
                    Err(_) => session.log("Enhancer", "Timed out; keeping original descriptions"),
                }
            }
        }

        let auth_type = spec_auth.or_else(|| auth_scores.best()).unwrap_or_default();
        let base_url = spec_base_url
            .or_else(|| most_frequent_origin(&origins))
            .or_else(|| seed.and_then(origin_of))
            .unwrap_or_default();

        session.log(
            "Crawler",
            format!(
                "Finished with {} endpoints from {} sources{}",
                endpoints.len(),
                source_urls.len(),
                if timed_out { " (timed out)" } else { "" }
            ),
        );
        info!(
            endpoints = endpoints.len(),
            sources = source_urls.len(),
            timed_out,
            elapsed_ms = u64::try_from(session.elapsed().as_millis()).unwrap_or(u64::MAX),
            "crawl finished"
        );

        Ok(CrawlResult {
            endpoints,
            source_urls,
            base_url,
            auth_type,
            logs: session.logs(),
            timed_out,
            crawled_at: Utc::now(),
        })
    }
}
