//! # CLI Structure and Argument Parsing
//!
//! ```bash
//! # Crawl a documentation site and print the crawl result
//! docmcp crawl https://developer.example.com/docs
//!
//! # Emit the MCP manifest instead, into a file
//! docmcp crawl https://developer.example.com/docs --mcp --output example.mcp.json
//!
//! # Parse a local spec, Postman export or saved HTML page (or stdin with `-`)
//! docmcp parse openapi.yaml --mcp
//! curl -s https://example.com/openapi.json | docmcp parse -
//! ```
//!
//! Crawl flags override the matching config-file values for one run.

use clap::{Args, Parser, Subcommand};
use docmcp_core::CrawlConfig;
use std::path::PathBuf;

/// Main CLI structure for the `docmcp` command
#[derive(Parser, Clone, Debug)]
#[command(name = "docmcp")]
#[command(version)]
#[command(about = "Discover API endpoints in documentation and build MCP tool manifests", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable verbose logging, including the crawl trace
    #[arg(short = 'v', long, global = true, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short = 'q', long, global = true)]
    pub quiet: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "DOCMCP_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Available subcommands
#[derive(Subcommand, Clone, Debug)]
pub enum Commands {
    /// Crawl a documentation URL
    Crawl(CrawlArgs),

    /// Parse a local file, or stdin with `-`
    Parse(ParseArgs),
}

/// Arguments for `docmcp crawl`
#[derive(Args, Clone, Debug)]
pub struct CrawlArgs {
    /// Documentation URL to start from
    pub url: String,

    /// Maximum pages to fetch (capped at 100)
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Maximum concurrent fetches per batch
    #[arg(long)]
    pub max_parallel: Option<usize>,

    /// Maximum link depth from the seed page
    #[arg(long)]
    pub max_depth: Option<usize>,

    /// Per-page timeout in milliseconds
    #[arg(long, value_name = "MS")]
    pub page_timeout: Option<u64>,

    /// Whole-crawl time budget in milliseconds
    #[arg(long, value_name = "MS")]
    pub budget: Option<u64>,

    /// Additional host to treat as in scope (repeatable)
    #[arg(long = "allow-domain", value_name = "HOST")]
    pub allow_domains: Vec<String>,

    /// Keep crawling after a spec document is found
    #[arg(long)]
    pub keep_going: bool,

    /// Ask the configured LLM for extra documentation links
    #[arg(long)]
    pub suggest_links: bool,

    /// Never hand the site to the deep-crawl service
    #[arg(long)]
    pub no_deep_crawl: bool,

    /// Permit loopback and private-network targets (local testing)
    #[arg(long, hide = true)]
    pub allow_private_network: bool,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Arguments for `docmcp parse`
#[derive(Args, Clone, Debug)]
pub struct ParseArgs {
    /// File to parse, or `-` for stdin
    pub file: String,

    #[command(flatten)]
    pub output: OutputArgs,
}

/// Output options shared by every subcommand
#[derive(Args, Clone, Debug, Default)]
pub struct OutputArgs {
    /// Emit the MCP manifest instead of the crawl result
    #[arg(long)]
    pub mcp: bool,

    /// Write JSON to this file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip LLM description enhancement
    #[arg(long)]
    pub no_enhance: bool,
}

impl CrawlArgs {
    /// Layer these flags over `config`.
    pub fn apply(&self, config: &mut CrawlConfig) {
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if let Some(max_parallel) = self.max_parallel {
            config.max_parallel = max_parallel;
        }
        if let Some(max_depth) = self.max_depth {
            config.max_depth = max_depth;
        }
        if let Some(ms) = self.page_timeout {
            config.page_timeout_ms = ms;
        }
        if let Some(ms) = self.budget {
            config.total_budget_ms = ms;
        }
        config
            .allowed_domains
            .extend(self.allow_domains.iter().cloned());
        if self.keep_going {
            config.stop_on_spec = false;
        }
        if self.suggest_links {
            config.suggest_links = true;
        }
        if self.no_deep_crawl {
            config.deep_crawl.api_key = None;
        }
        if self.allow_private_network {
            config.allow_private_network = true;
        }
        self.output.apply(config);
    }
}

impl OutputArgs {
    /// Layer the output-side switches over `config`.
    pub fn apply(&self, config: &mut CrawlConfig) {
        if self.no_enhance {
            config.enhance.api_key = None;
        }
    }
}
