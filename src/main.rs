//! nft-prefix-import - AS prefixes into nftables sets
//!
//! Fetches the bgp.tools routing table (cached for two hours), keeps the
//! prefixes announced by the given AS numbers and adds them to an IPv4 and
//! an IPv6 nftables set.

use clap::Parser;
use std::process::ExitCode;
use tracing::{error, Level};
use tracing_subscriber::FmtSubscriber;

use nft_prefix_import::cli::Cli;
use nft_prefix_import::commands::import::{self, ImportRequest};
use nft_prefix_import::config::Config;

/// Exit status for fatal errors (fetch, cache, parse, configuration)
const EXIT_FATAL: u8 = 1;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    let log_level = if cli.verbose {
        Level::DEBUG
    } else if cli.quiet {
        Level::ERROR
    } else {
        Level::INFO
    };

    // stdout is reserved for dry-run output and the summary
    let subscriber = FmtSubscriber::builder()
        .with_max_level(log_level)
        .with_target(false)
        .with_thread_ids(false)
        .without_time()
        .with_writer(std::io::stderr)
        .finish();
    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match run(&cli).await {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<u8> {
    let config = Config::resolve(cli.config.as_deref(), &cli.overrides())?;

    let request = ImportRequest {
        autnums: cli.autnums.clone(),
        user_agent: cli.user_agent.clone(),
        dry_run: cli.dry_run,
        quiet: cli.quiet,
    };

    import::run(&request, &config).await
}
