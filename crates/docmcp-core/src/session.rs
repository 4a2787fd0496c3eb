//! Per-invocation crawl state: elapsed-time budget and the human-readable log.
//!
//! A fresh [`CrawlSession`] is created for every crawl call and threaded through
//! the fetcher and the orchestrator, so nothing leaks between invocations. The
//! clock is injectable; tests use [`ManualClock`] to exhaust a budget without
//! sleeping.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

/// Source of elapsed time since the session started.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock's origin.
    fn elapsed(&self) -> Duration;
}

/// Wall clock anchored at construction.
#[derive(Debug)]
pub struct SystemClock {
    start: Instant,
}

impl SystemClock {
    /// Start counting now.
    #[must_use]
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    /// Clock at zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward.
    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn elapsed(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

/// State shared by every component taking part in one crawl.
pub struct CrawlSession {
    clock: Arc<dyn Clock>,
    budget: Duration,
    logs: Mutex<Vec<String>>,
}

impl std::fmt::Debug for CrawlSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CrawlSession")
            .field("elapsed", &self.clock.elapsed())
            .field("budget", &self.budget)
            .finish_non_exhaustive()
    }
}

impl CrawlSession {
    /// Session on the wall clock, starting now.
    #[must_use]
    pub fn new(budget: Duration) -> Self {
        Self::with_clock(budget, Arc::new(SystemClock::start()))
    }

    /// Session on a caller-supplied clock.
    #[must_use]
    pub fn with_clock(budget: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            budget,
            logs: Mutex::new(Vec::new()),
        }
    }

    /// Total time allowed.
    #[must_use]
    pub const fn budget(&self) -> Duration {
        self.budget
    }

    /// Time spent so far.
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    /// Time left; zero once exhausted.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.budget.saturating_sub(self.clock.elapsed())
    }

    /// Whether no more network work may start.
    #[must_use]
    pub fn budget_exhausted(&self) -> bool {
        self.clock.elapsed() >= self.budget
    }

    /// Append a `[component] message` line and mirror it to tracing.
    pub fn log(&self, component: &str, message: impl AsRef<str>) {
        let line = format!("[{component}] {}", message.as_ref());
        debug!(target: "docmcp::session", "{line}");
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(line);
    }

    /// Copy of the log so far.
    #[must_use]
    pub fn logs(&self) -> Vec<String> {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
