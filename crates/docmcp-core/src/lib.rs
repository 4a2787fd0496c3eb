//! # docmcp-core
//!
//! Discover the HTTP endpoints an API exposes from its documentation, and turn
//! them into a Model Context Protocol tool manifest.
//!
//! Input is a documentation URL, pasted content or an uploaded file. URL
//! crawls stay on the seed's host, run under a page budget and a wall-clock
//! budget, and never contact private network addresses.
//!
//! ## Architecture
//!
//! - **Crawling**: [`Crawler`] walks documentation pages breadth-first in
//!   bounded parallel batches, with fallbacks for sparse sites
//! - **Parsing**: OpenAPI 3, Swagger 2 and Postman documents, with a generic
//!   scan for anything else that is JSON or YAML
//! - **Extraction**: Swagger UI markup, method/path tables, curl commands
//!   and `GET /path` prose
//! - **Assist**: optional LLM description enhancement, LLM link suggestion
//!   and a hosted deep-crawl service, each behind a trait
//! - **MCP**: [`McpSpec`] builds one tool per endpoint
//!
//! ## Quick Start
//!
//! ```rust
//! use docmcp_core::{AuthType, CrawlInput, Crawler, CrawlConfig, McpSpec};
//!
//! # #[tokio::main]
//! # async fn main() -> docmcp_core::Result<()> {
//! let spec = r#"{"swagger": "2.0", "host": "api.example.com",
//!     "paths": {"/pets": {"get": {"summary": "List pets"}}}}"#;
//! let crawler = Crawler::new(CrawlConfig::default())?;
//! let result = crawler.crawl(CrawlInput::Paste(spec.to_string())).await?;
//!
//! assert_eq!(result.endpoints[0].path, "/pets");
//! assert_eq!(result.auth_type, AuthType::Bearer);
//!
//! let manifest = McpSpec::from_result(&result);
//! assert_eq!(manifest.tools.len(), 1);
//! # Ok(())
//! # }
//! ```

/// LLM-backed description enhancement and link suggestion
pub mod assist;
/// Crawl configuration and config-file loading
pub mod config;
/// Crawl orchestration, frontier and result inference
pub mod crawl;
/// Hosted deep-crawl services for JavaScript-rendered sites
pub mod deep_crawl;
/// Link discovery, URL safety and scope filters
pub mod discovery;
/// Endpoint model and derivation helpers
pub mod endpoint;
/// Error types and result aliases
pub mod error;
/// HTML endpoint extractors
pub mod extract;
/// Budget-aware HTTP fetching
pub mod fetcher;
/// MCP manifest generation
pub mod mcp;
/// Per-crawl session state: clock, budget and log
pub mod session;
/// OpenAPI, Swagger, Postman and generic JSON parsers
pub mod spec;
/// Crawl inputs and outputs
pub mod types;

// Re-export commonly used types
pub use config::{CrawlConfig, DeepCrawlConfig, EnhanceConfig};
pub use crawl::Crawler;
pub use endpoint::{Endpoint, EndpointSet, HttpMethod, ParamLocation, Parameter};
pub use error::{Error, Result};
pub use fetcher::{FetchResponse, Fetcher};
pub use mcp::{McpSpec, McpTool};
pub use session::{Clock, CrawlSession, ManualClock, SystemClock};
pub use types::*;
