//! Command implementations.

mod crawl;
mod parse;

pub use crawl::crawl;
pub use parse::parse;

use anyhow::Result;
use docmcp_core::CrawlConfig;

use crate::cli::{Cli, Commands};

/// Dispatch the parsed command line.
pub async fn execute(cli: Cli) -> Result<()> {
    let mut config = CrawlConfig::load(cli.config.as_deref())?;
    match cli.command {
        Commands::Crawl(args) => {
            args.apply(&mut config);
            crawl(config, &args.url, &args.output).await
        },
        Commands::Parse(args) => {
            args.output.apply(&mut config);
            parse(config, &args.file, &args.output).await
        },
    }
}
