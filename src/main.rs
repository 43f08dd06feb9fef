//! Timeline-Trawler main entry point
//!
//! This is the command-line interface for the Timeline-Trawler collector.

use anyhow::Context;
use clap::{Parser, ValueEnum};
use std::path::{Path, PathBuf};
use timeline_trawler::config::{load_config_with_hash, Config, SeedGroup, SeedJob};
use timeline_trawler::output::print_summary;
use timeline_trawler::runner::{plan_jobs, plan_legs, run_collection, RunOptions};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Timeline-Trawler: An infinite-scroll timeline collector
///
/// Timeline-Trawler collects posts for hashtags and user timelines, and
/// follower/following edges for user networks, from a rendered timeline.
/// Records are streamed into CSV files or a SQLite database as they arrive.
#[derive(Parser, Debug)]
#[command(name = "timeline-trawler")]
#[command(version = "1.0.0")]
#[command(about = "An infinite-scroll timeline collector", long_about = None)]
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

    /// Validate config and show the pages each seed would visit without collecting
    #[arg(long)]
    dry_run: bool,

    /// Collect only seeds of one group
    #[arg(long, value_enum)]
    only: Option<GroupArg>,

    /// Stop each seed after this many records, overriding the configuration
    #[arg(long, value_name = "N")]
    max_records: Option<u64>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum GroupArg {
    Hashtag,
    Timeline,
    Network,
}

impl From<GroupArg> for SeedGroup {
    fn from(arg: GroupArg) -> Self {
        match arg {
            GroupArg::Hashtag => SeedGroup::Hashtag,
            GroupArg::Timeline => SeedGroup::Timeline,
            GroupArg::Network => SeedGroup::Network,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let config_dir = cli
        .config
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_default();

    let options = RunOptions {
        only: cli.only.map(SeedGroup::from),
        max_records: cli.max_records,
    };
    let jobs = plan_jobs(&config, &config_dir, &options)?;

    if cli.dry_run {
        return handle_dry_run(&config, &jobs);
    }

    if jobs.is_empty() {
        tracing::warn!("No seeds to collect");
        return Ok(());
    }

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current cycle");
            signal_token.cancel();
        }
    });

    tracing::info!("Collecting {} seed(s)", jobs.len());
    let summaries = run_collection(&config, &config_dir, &config_hash, &jobs, cancel).await?;

    if !cli.quiet {
        print_summary(&summaries);
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("timeline_trawler=info,warn"),
            1 => EnvFilter::new("timeline_trawler=debug,info"),
            2 => EnvFilter::new("timeline_trawler=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the planned pages
fn handle_dry_run(config: &Config, jobs: &[SeedJob]) -> anyhow::Result<()> {
    println!("=== Timeline-Trawler Dry Run ===\n");

    println!("Collector Configuration:");
    println!("  Stall threshold: {}", config.collector.stall_threshold);
    println!(
        "  Scroll wait: {}ms - {}ms (x{})",
        config.collector.base_wait_ms, config.collector.max_wait_ms, config.collector.wait_growth
    );
    println!("  Jitter: {}ms", config.collector.jitter_ms);
    println!("  Retry attempts: {}", config.retry.max_attempts);

    println!("\nBrowser:");
    println!("  Backend: {:?}", config.browser.backend);
    println!("  Site: {}", config.browser.site_base);

    println!("\nOutput:");
    println!("  Format: {:?}", config.output.format);
    println!("  Path: {}", config.output.path.display());

    let planned = plan_legs(config, jobs)?;
    println!("\nSeeds ({}):", planned.len());
    for (job, legs) in &planned {
        let limit = job
            .constraints
            .max_records
            .map(|n| n.to_string())
            .unwrap_or_else(|| "unlimited".to_string());
        println!("  - {} [{}] limit: {}", job.seed, job.group, limit);
        for leg in legs {
            println!("    * {}: {}", leg.label(), leg.url);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would visit {} page(s)",
        planned.iter().map(|(_, legs)| legs.len()).sum::<usize>()
    );

    Ok(())
}
