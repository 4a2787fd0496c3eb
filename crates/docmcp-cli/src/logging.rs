//! Logging initialization.

use anyhow::Result;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use crate::cli::Cli;

/// Install the global subscriber. Everything goes to stderr so stdout stays valid JSON.
///
/// `--verbose` shows the crawl trace (session log lines are debug events),
/// `--quiet` limits output to errors.
///
/// # Errors
///
/// Returns an error if the global tracing subscriber cannot be set.
pub fn initialize_logging(cli: &Cli) -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level_for(cli))
        .with_target(false)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

fn level_for(cli: &Cli) -> Level {
    if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::WARN
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::disallowed_macros)]
mod tests {
    use super::*;
    use clap::Parser;

    fn level(args: &[&str]) -> Level {
        level_for(&Cli::try_parse_from(args).unwrap())
    }

    #[test]
    fn test_level_from_flags() {
        assert_eq!(level(&["docmcp", "parse", "-"]), Level::WARN);
        assert_eq!(level(&["docmcp", "-v", "parse", "-"]), Level::DEBUG);
        assert_eq!(level(&["docmcp", "parse", "-", "--quiet"]), Level::ERROR);
    }
}
