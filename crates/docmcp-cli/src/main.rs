//! docmcp CLI - discover API endpoints in documentation and emit MCP manifests
//!
//! Exit codes: `0` on success, `2` when no endpoints were found, `1` for
//! every other failure.

use clap::Parser;
use std::process::ExitCode;

mod cli;
mod commands;
mod logging;
mod output;

use cli::Cli;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logging::initialize_logging(&cli) {
        eprintln!("Error: {e:#}");
        return ExitCode::FAILURE;
    }

    match commands::execute(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn report(err: &anyhow::Error) -> ExitCode {
    if let Some(docmcp_core::Error::NoEndpointsFound(report)) = err.downcast_ref() {
        output::print_no_endpoints(report);
        return ExitCode::from(2);
    }
    eprintln!("Error: {err:#}");
    ExitCode::FAILURE
}
