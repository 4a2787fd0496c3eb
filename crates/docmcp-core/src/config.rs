//! Crawl configuration.
//!
//! Settings come from three layers, later ones winning:
//!
//! 1. Built-in defaults ([`CrawlConfig::default`])
//! 2. A TOML file: an explicit path, or `config.toml` in the platform config
//!    directory (see [`CrawlConfig::default_path`])
//! 3. Environment variables for API keys (`DOCMCP_OPENAI_API_KEY`,
//!    `DOCMCP_FIRECRAWL_API_KEY`, with the vendor-standard names as fallbacks)
//!
//! ## Example configuration file
//!
//! ```toml
//! max_pages = 30
//! total_budget_ms = 20000
//! allowed_domains = ["developer.example.com"]
//!
//! [enhance]
//! model = "gpt-4o-mini"
//!
//! [deep_crawl]
//! poll_interval_ms = 3000
//! max_attempts = 8
//! ```
//!
//! ```rust
//! use docmcp_core::CrawlConfig;
//!
//! let config = CrawlConfig::from_toml_str("max_pages = 500\nmax_parallel = 3")?;
//! assert_eq!(config.effective_max_pages(), 100);
//! assert_eq!(config.max_parallel, 3);
//! # Ok::<(), docmcp_core::Error>(())
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Upper bound on pages per crawl, whatever the caller asks for.
pub const MAX_PAGES_CEILING: usize = 100;

/// Options for one crawl invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlConfig {
    /// Page budget. Clamped to [`MAX_PAGES_CEILING`].
    pub max_pages: usize,
    /// Per-page fetch timeout in milliseconds.
    pub page_timeout_ms: u64,
    /// Wall-clock budget for the whole crawl in milliseconds.
    pub total_budget_ms: u64,
    /// Fetches issued per batch.
    pub max_parallel: usize,
    /// Link-following depth below the seed.
    pub max_depth: usize,
    /// Response bodies larger than this are abandoned.
    pub max_body_bytes: u64,
    /// Extra hosts (and their subdomains) the crawl may visit besides the seed host.
    pub allowed_domains: Vec<String>,
    /// Noted in the crawl log when set; robots.txt is never fetched.
    pub respect_robots: bool,
    /// Stop crawling once a spec document yields endpoints.
    pub stop_on_spec: bool,
    /// Fallbacks run while fewer endpoints than this have been found.
    pub fallback_threshold: usize,
    /// Lift the private-network block. Intended for local testing.
    pub allow_private_network: bool,
    /// Ask the link-suggestion collaborator for extra frontier URLs.
    pub suggest_links: bool,
    /// Description enhancement collaborator.
    pub enhance: EnhanceConfig,
    /// Deep-crawl collaborator.
    pub deep_crawl: DeepCrawlConfig,
}

/// OpenAI-compatible chat-completions settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnhanceConfig {
    /// API key; enhancement and link suggestion are skipped without one.
    pub api_key: Option<String>,
    /// Model name.
    pub model: String,
    /// API base, up to and including the version segment.
    pub base_url: String,
    /// At most this many endpoints are sent per enhancement request.
    pub max_endpoints: usize,
    /// Request timeout in milliseconds.
    pub timeout_ms: u64,
}

/// Firecrawl crawl-job settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeepCrawlConfig {
    /// API key; the deep crawl is skipped without one.
    pub api_key: Option<String>,
    /// API base URL.
    pub api_base: String,
    /// Delay between status polls in milliseconds.
    pub poll_interval_ms: u64,
    /// Status polls before the job is abandoned.
    pub max_attempts: u32,
    /// Page limit requested from the service.
    pub page_limit: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            page_timeout_ms: 10_000,
            total_budget_ms: 25_000,
            max_parallel: 5,
            max_depth: 2,
            max_body_bytes: 5 * 1024 * 1024,
            allowed_domains: Vec::new(),
            respect_robots: true,
            stop_on_spec: true,
            fallback_threshold: 1,
            allow_private_network: false,
            suggest_links: false,
            enhance: EnhanceConfig::default(),
            deep_crawl: DeepCrawlConfig::default(),
        }
    }
}

impl Default for EnhanceConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_endpoints: 20,
            timeout_ms: 20_000,
        }
    }
}

impl Default for DeepCrawlConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: "https://api.firecrawl.dev".to_string(),
            poll_interval_ms: 2_000,
            max_attempts: 10,
            page_limit: 10,
        }
    }
}

impl CrawlConfig {
    /// Page budget after applying the hard ceiling.
    #[must_use]
    pub fn effective_max_pages(&self) -> usize {
        self.max_pages.min(MAX_PAGES_CEILING)
    }

    /// Per-page timeout.
    #[must_use]
    pub const fn page_timeout(&self) -> Duration {
        Duration::from_millis(self.page_timeout_ms)
    }

    /// Whole-crawl budget.
    #[must_use]
    pub const fn total_budget(&self) -> Duration {
        Duration::from_millis(self.total_budget_ms)
    }

    /// Parse TOML text on top of the defaults.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("Failed to parse config: {e}")))
    }

    /// Load configuration.
    ///
    /// With an explicit path the file must exist. Without one, the platform
    /// config file is used when present and defaults otherwise. Environment
    /// overrides are applied last.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::load_file(path)?,
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::load_file(&path)?,
                _ => Self::default(),
            },
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        tracing::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// `config.toml` in the platform config directory:
    /// - Linux: `~/.config/docmcp/config.toml`
    /// - macOS: `~/Library/Application Support/dev.docmcp.docmcp/config.toml`
    /// - Windows: `%APPDATA%\docmcp\docmcp\config\config.toml`
    #[must_use]
    pub fn default_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("dev", "docmcp", "docmcp")
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }

    /// Fill API keys from the environment. Keys already set in the file are
    /// replaced only by the `DOCMCP_*` variables.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = non_empty("DOCMCP_OPENAI_API_KEY") {
            self.enhance.api_key = Some(key);
        } else if self.enhance.api_key.is_none() {
            self.enhance.api_key = non_empty("OPENAI_API_KEY");
        }

        if let Some(key) = non_empty("DOCMCP_FIRECRAWL_API_KEY") {
            self.deep_crawl.api_key = Some(key);
        } else if self.deep_crawl.api_key.is_none() {
            self.deep_crawl.api_key = non_empty("FIRECRAWL_API_KEY");
        }
    }

    /// Reject settings that would make a crawl unable to do anything.
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(Error::Config("max_pages must be at least 1".into()));
        }
        if self.max_parallel == 0 {
            return Err(Error::Config("max_parallel must be at least 1".into()));
        }
        if self.page_timeout_ms == 0 || self.total_budget_ms == 0 {
            return Err(Error::Config("timeouts must be greater than zero".into()));
        }
        if self.enhance.max_endpoints == 0 {
            return Err(Error::Config("enhance.max_endpoints must be at least 1".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config_values() {
        let config = CrawlConfig::default();
        assert_eq!(config.max_pages, 50);
        assert_eq!(config.page_timeout_ms, 10_000);
        assert_eq!(config.total_budget_ms, 25_000);
        assert_eq!(config.max_parallel, 5);
        assert_eq!(config.max_depth, 2);
        assert_eq!(config.max_body_bytes, 5 * 1024 * 1024);
        assert!(config.stop_on_spec);
        assert!(!config.allow_private_network);
        assert_eq!(config.enhance.max_endpoints, 20);
        assert!(config.enhance.api_key.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CrawlConfig::from_toml_str(
            r#"
            max_parallel = 2
            allowed_domains = ["example.org"]

            [deep_crawl]
            max_attempts = 3
            "#,
        )
        .unwrap();
        assert_eq!(config.max_parallel, 2);
        assert_eq!(config.allowed_domains, vec!["example.org"]);
        assert_eq!(config.deep_crawl.max_attempts, 3);
        assert_eq!(config.deep_crawl.poll_interval_ms, 2_000);
        assert_eq!(config.max_pages, 50);
    }

    #[test]
    fn test_page_ceiling_is_enforced() {
        let config = CrawlConfig {
            max_pages: 10_000,
            ..CrawlConfig::default()
        };
        assert_eq!(config.effective_max_pages(), MAX_PAGES_CEILING);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = CrawlConfig::from_toml_str("this is not valid toml [[[").unwrap_err();
        match err {
            Error::Config(msg) => assert!(msg.contains("Failed to parse config")),
            other => panic!("Expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn test_load_explicit_file() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_depth = 4\n")?;
        let config = CrawlConfig::load(Some(&path))?;
        assert_eq!(config.max_depth, 4);
        Ok(())
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = CrawlConfig::load(Some(Path::new("/definitely/does/not/exist.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_load_rejects_zero_parallelism() -> anyhow::Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.toml");
        fs::write(&path, "max_parallel = 0\n")?;
        assert!(CrawlConfig::load(Some(&path)).is_err());
        Ok(())
    }

    #[test]
    fn test_env_overrides() {
        let mut config = CrawlConfig::default();
        config.apply_env(env(&[
            ("OPENAI_API_KEY", "sk-fallback"),
            ("DOCMCP_FIRECRAWL_API_KEY", "fc-primary"),
            ("FIRECRAWL_API_KEY", "fc-fallback"),
        ]));
        assert_eq!(config.enhance.api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(config.deep_crawl.api_key.as_deref(), Some("fc-primary"));
    }

    #[test]
    fn test_file_key_beats_generic_env_but_not_prefixed() {
        let mut config = CrawlConfig::default();
        config.enhance.api_key = Some("from-file".into());
        config.apply_env(env(&[("OPENAI_API_KEY", "generic")]));
        assert_eq!(config.enhance.api_key.as_deref(), Some("from-file"));

        config.apply_env(env(&[("DOCMCP_OPENAI_API_KEY", "prefixed")]));
        assert_eq!(config.enhance.api_key.as_deref(), Some("prefixed"));
    }

    #[test]
    fn test_blank_env_values_ignored() {
        let mut config = CrawlConfig::default();
        config.apply_env(env(&[("OPENAI_API_KEY", "  ")]));
        assert!(config.enhance.api_key.is_none());
    }

    #[test]
    fn test_toml_roundtrip() -> anyhow::Result<()> {
        let mut config = CrawlConfig::default();
        config.allowed_domains = vec!["docs.example.com".into()];
        config.enhance.api_key = Some("sk-test".into());
        let text = toml::to_string_pretty(&config)?;
        let back = CrawlConfig::from_toml_str(&text)?;
        assert_eq!(config, back);
        Ok(())
    }

    proptest! {
        #[test]
        fn test_effective_pages_never_exceed_ceiling(max_pages in 0usize..100_000) {
            let config = CrawlConfig { max_pages, ..CrawlConfig::default() };
            prop_assert!(config.effective_max_pages() <= MAX_PAGES_CEILING);
            prop_assert!(config.effective_max_pages() <= max_pages);
        }
    }
}
