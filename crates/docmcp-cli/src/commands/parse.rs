use anyhow::{Context, Result};
use docmcp_core::{CrawlConfig, CrawlInput, Crawler};
use std::io::Read;
use std::path::Path;

use crate::cli::OutputArgs;
use crate::output;

/// Parse a local file (or stdin for `-`) without touching the network.
pub async fn parse(config: CrawlConfig, file: &str, out: &OutputArgs) -> Result<()> {
    let input = read_input(file)?;
    let crawler = Crawler::from_config(config)?;
    let result = crawler.crawl(input).await?;
    output::emit(&result, out)
}

fn read_input(file: &str) -> Result<CrawlInput> {
    if file == "-" {
        let mut content = String::new();
        std::io::stdin()
            .read_to_string(&mut content)
            .context("Failed to read stdin")?;
        return Ok(CrawlInput::Paste(content));
    }
    let path = Path::new(file);
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map_or_else(|| file.to_string(), |name| name.to_string_lossy().into_owned());
    Ok(CrawlInput::Upload { file_name, content })
}
