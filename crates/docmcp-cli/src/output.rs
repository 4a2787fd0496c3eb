//! JSON output and failure reports.

use anyhow::{Context, Result};
use docmcp_core::{CrawlResult, McpSpec, NoEndpointsReport};
use std::io::Write;

use crate::cli::OutputArgs;

/// Write the crawl result, or its MCP manifest with `--mcp`, as pretty JSON.
pub fn emit(result: &CrawlResult, out: &OutputArgs) -> Result<()> {
    let json = if out.mcp {
        serde_json::to_string_pretty(&McpSpec::from_result(result))?
    } else {
        serde_json::to_string_pretty(result)?
    };

    match &out.output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!(
                "Wrote {} endpoints to {}",
                result.endpoints.len(),
                path.display()
            );
        },
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
        },
    }
    Ok(())
}

/// Human-readable explanation for an empty crawl, on stderr.
pub fn print_no_endpoints(report: &NoEndpointsReport) {
    eprintln!("No API endpoints found.");
    if !report.source_urls.is_empty() {
        eprintln!("\nSearched:");
        for url in &report.source_urls {
            eprintln!("  {url}");
        }
    }
    eprintln!("\nSuggestions:");
    for suggestion in &report.suggestions {
        eprintln!("  - {suggestion}");
    }
    if !report.logs.is_empty() {
        eprintln!("\nLog:");
        for line in &report.logs {
            eprintln!("  {line}");
        }
    }
}
