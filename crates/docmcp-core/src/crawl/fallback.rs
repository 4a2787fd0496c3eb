//! Fallback stage for crawls that found fewer endpoints than the threshold.
//!
//! Steps run in order and each is skipped once the threshold is met or the
//! time budget is gone: well-known spec locations, REST root probes, then
//! the optional deep-crawl service.

use super::{Crawler, Harvest, analyze, spec_hint};
use crate::Error;
use crate::crawl::frontier::Frontier;
use crate::discovery::probe::{probe_rest_prefixes, spec_probe_urls};
use crate::fetcher::FetchOptions;
use crate::session::CrawlSession;
use crate::spec::{self, looks_like_document};
use futures::future::join_all;
use tracing::debug;

/// `Accept` sent with spec probes so content-negotiating servers answer with the document.
const SPEC_ACCEPT: &str = "application/json, application/yaml;q=0.9, */*;q=0.5";

impl Crawler {
    pub(super) async fn run_fallbacks(
        &self,
        session: &CrawlSession,
        seed: &str,
        frontier: &mut Frontier,
        harvest: &mut Harvest,
    ) {
        if self.satisfied(harvest) {
            return;
        }
        session.log(
            "Fallback",
            format!(
                "{} endpoints is below the threshold of {}; probing common spec locations",
                harvest.endpoints.len(),
                self.config.fallback_threshold
            ),
        );
        self.probe_spec_locations(session, seed, frontier, harvest).await;

        if self.satisfied(harvest) || out_of_time(session, harvest) {
            return;
        }
        session.log("Fallback", "Probing common REST prefixes");
        let placeholders = probe_rest_prefixes(&self.fetcher, session, seed).await;
        if !placeholders.is_empty() {
            harvest.record_source(seed);
        }
        let added = harvest.endpoints.extend(placeholders);
        if added > 0 {
            session.log("Fallback", format!("Added {added} placeholder endpoints"));
        }

        if self.satisfied(harvest) || out_of_time(session, harvest) {
            return;
        }
        self.deep_crawl(session, seed, harvest).await;
        out_of_time(session, harvest);
    }

    fn satisfied(&self, harvest: &Harvest) -> bool {
        harvest.timed_out || harvest.endpoints.len() >= self.config.fallback_threshold
    }

    /// Fetch well-known spec paths in parallel chunks; stop at the first chunk with a spec.
    async fn probe_spec_locations(
        &self,
        session: &CrawlSession,
        seed: &str,
        frontier: &mut Frontier,
        harvest: &mut Harvest,
    ) {
        let candidates: Vec<String> = spec_probe_urls(seed)
            .into_iter()
            .filter(|url| frontier.mark_seen(url))
            .collect();

        let options = FetchOptions {
            headers: vec![("accept".to_string(), SPEC_ACCEPT.to_string())],
            timeout: None,
        };
        for chunk in candidates.chunks(self.config.max_parallel) {
            if out_of_time(session, harvest) {
                return;
            }
            let responses =
                join_all(chunk.iter().map(|url| self.fetcher.fetch(session, url, &options))).await;

            let mut found = false;
            for (url, response) in chunk.iter().zip(responses) {
                let response = match response {
                    Ok(response) => response,
                    Err(Error::BudgetExhausted) => {
                        harvest.timed_out = true;
                        continue;
                    },
                    Err(e) => {
                        debug!(url, error = %e, "spec probe failed");
                        continue;
                    },
                };
                let hint = spec_hint(url, response.content_type().as_deref());
                let markup = response.body.trim_start().starts_with('<');
                if markup || !(hint || looks_like_document(&response.body)) {
                    continue;
                }
                match spec::parse_document(&response.body) {
                    Ok(parsed) if !parsed.endpoints.is_empty() => {
                        harvest.record_source(url);
                        harvest.absorb_spec(session, url, parsed);
                        found = true;
                    },
                    Ok(_) => debug!(url, "spec probe returned an empty document"),
                    Err(e) => debug!(url, error = %e, "spec probe returned an unusable document"),
                }
            }
            if found {
                return;
            }
        }
        session.log("Fallback", "No spec document at common locations");
    }

    async fn deep_crawl(&self, session: &CrawlSession, seed: &str, harvest: &mut Harvest) {
        let Some(deep) = self.deep_crawler.as_ref() else {
            debug!("no deep crawler configured");
            return;
        };
        session.log("DeepCrawl", format!("Handing {seed} to {}", deep.name()));
        let Ok(outcome) = tokio::time::timeout(session.remaining(), deep.crawl(session, seed)).await else {
            harvest.timed_out = true;
            session.log(
                "DeepCrawl",
                format!("{} did not finish within the time budget", deep.name()),
            );
            return;
        };
        match outcome {
            Ok(pages) => {
                let before = harvest.endpoints.len();
                for page in pages {
                    let analysis = analyze(session, &page.url, &page.content, false, None);
                    harvest.record_source(&page.url);
                    harvest.absorb(session, &page.url, analysis);
                }
                session.log(
                    "DeepCrawl",
                    format!("{} added {} endpoints", deep.name(), harvest.endpoints.len() - before),
                );
            },
            Err(Error::BudgetExhausted) => harvest.timed_out = true,
            Err(e) => session.log("DeepCrawl", format!("{} failed: {e}", deep.name())),
        }
    }
}

/// Mark the harvest timed out once the budget is gone.
fn out_of_time(session: &CrawlSession, harvest: &mut Harvest) -> bool {
    if session.budget_exhausted() && !harvest.timed_out {
        harvest.timed_out = true;
        session.log("Fallback", "Time budget exhausted; skipping remaining fallbacks");
    }
    harvest.timed_out
}
