//! Plume-Harvest main entry point
//!
//! This is the command-line interface for the Plume-Harvest article crawler.

use clap::Parser;
use plume_harvest::config::load_config_with_hash;
use plume_harvest::frontier::{FrontierStore, SqliteFrontier};
use plume_harvest::stats::{load_statistics, print_statistics};
use plume_harvest::{run_crawl, Config, EndReason};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// Plume-Harvest: a targeted single-site article crawler
///
/// Plume-Harvest crawls one publication, extracting article metadata and
/// body text into a local SQLite database while folding every on-site
/// link it discovers back into its work queue.
#[derive(Parser, Debug)]
#[command(name = "plume-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A targeted single-site article crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Additional seed URL (repeatable, merged with the configured seeds)
    #[arg(long, value_name = "URL")]
    seed: Vec<String>,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with_all = ["retry_failed", "reclaim_stale"])]
    stats: bool,

    /// Reset all failed URLs to unclaimed and exit
    #[arg(long, conflicts_with_all = ["stats", "reclaim_stale"])]
    retry_failed: bool,

    /// Reset stale claimed URLs to unclaimed and exit
    #[arg(long, conflicts_with_all = ["stats", "retry_failed"])]
    reclaim_stale: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("Fatal error: {}", e);
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, Box<dyn std::error::Error>> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    for seed in cli.seed {
        if !config.seed_urls.contains(&seed) {
            config.seed_urls.push(seed);
        }
    }

    if cli.stats {
        handle_stats(&config)?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.retry_failed {
        handle_retry_failed(&config)?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.reclaim_stale {
        handle_reclaim_stale(&config)?;
        return Ok(ExitCode::SUCCESS);
    }

    let report = run_crawl(config, &config_hash).await?;

    // An interrupted run exits distinctly so wrapper scripts can tell a
    // deliberate stop from a finished one
    let code = match report.end_reason {
        EndReason::BudgetExhausted | EndReason::FrontierDrained => ExitCode::SUCCESS,
        EndReason::Cancelled => ExitCode::from(2),
    };
    Ok(code)
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("plume_harvest=info,warn"),
            1 => EnvFilter::new("plume_harvest=debug,info"),
            2 => EnvFilter::new("plume_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --stats mode: prints frontier statistics
fn handle_stats(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let store = SqliteFrontier::new(Path::new(&config.frontier.database_path))?;
    let stats = load_statistics(&store)?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the --retry-failed mode: requeues failed URLs
fn handle_retry_failed(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteFrontier::new(Path::new(&config.frontier.database_path))?;
    let reset = store.reset_failed()?;
    println!("Reset {} failed URL(s) to unclaimed", reset);
    Ok(())
}

/// Handles the --reclaim-stale mode: frees claims from dead runs
fn handle_reclaim_stale(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut store = SqliteFrontier::new(Path::new(&config.frontier.database_path))?;
    let cutoff = Duration::from_secs(config.frontier.stale_claim_minutes * 60);
    let reclaimed = store.reclaim_stale(cutoff)?;
    println!("Reclaimed {} stale claim(s)", reclaimed);
    Ok(())
}
