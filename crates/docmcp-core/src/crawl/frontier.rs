//! Breadth-first crawl frontier with depth tracking.

use crate::discovery::filter::normalize_url;
use std::collections::{HashSet, VecDeque};

/// URLs waiting to be fetched, each tagged with its link depth.
///
/// Every URL is accepted at most once over the frontier's lifetime, so a
/// popped URL can never come back.
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<(String, usize)>,
    seen: HashSet<String>,
    max_depth: usize,
}

impl Frontier {
    /// Frontier holding only `seed` at depth 0.
    #[must_use]
    pub fn new(seed: &str, max_depth: usize) -> Self {
        let mut frontier = Self {
            queue: VecDeque::new(),
            seen: HashSet::new(),
            max_depth,
        };
        frontier.push(seed, 0);
        frontier
    }

    /// Queue `url` at `depth` unless seen before or deeper than allowed.
    pub fn push(&mut self, url: &str, depth: usize) -> bool {
        if depth > self.max_depth {
            return false;
        }
        let Some(url) = self.admit(url) else {
            return false;
        };
        self.queue.push_back((url, depth));
        true
    }

    /// Queue spec documents ahead of everything else, keeping their order.
    ///
    /// Spec documents are leaves, so they are not depth-capped.
    pub fn push_priority(&mut self, urls: &[String], depth: usize) -> usize {
        let admitted: Vec<String> = urls.iter().filter_map(|url| self.admit(url)).collect();
        let count = admitted.len();
        for url in admitted.into_iter().rev() {
            self.queue.push_front((url, depth));
        }
        count
    }

    /// Record a URL as handled without queueing it (redirect targets, probe URLs).
    pub fn mark_seen(&mut self, url: &str) -> bool {
        self.admit(url).is_some()
    }

    /// Take up to `n` URLs from the front.
    pub fn pop_batch(&mut self, n: usize) -> Vec<(String, usize)> {
        let take = n.min(self.queue.len());
        self.queue.drain(..take).collect()
    }

    /// Nothing left to fetch.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// URLs still queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    fn admit(&mut self, url: &str) -> Option<String> {
        let url = normalize_url(url)?;
        self.seen.insert(url.clone()).then_some(url)
    }
}
