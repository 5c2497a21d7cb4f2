//! Wrapscan main entry point
//!
//! This is the command-line interface for the wrapscan listing crawler.

use anyhow::Context;
use clap::Parser;
use num_bigint::BigInt;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wrapscan::config::{load_config_with_hash, parse_probe_ceiling, Config};
use wrapscan::crawler::{
    probe_pages, BoundaryLocator, BoundaryOutcome, CrawlDriver, CrawlSettings, CrawlStatus,
    Direction, HttpPageFetcher,
};
use wrapscan::output::{
    print_statistics, write_boundary_report, write_probe_report, CrawlStatistics,
};
use wrapscan::state::Baseline;
use wrapscan::storage::{CheckpointStore, OutputLayout};

/// Exit code reported when a crawl stops on Ctrl-C
const EXIT_INTERRUPTED: u8 = 130;

/// Wrapscan: a resumable paginated-listing crawler
///
/// Wrapscan walks a page-numbered document listing, records every page's
/// identifiers, detects pages that repeat earlier content, and finds where
/// the listing stops answering.
#[derive(Parser, Debug)]
#[command(name = "wrapscan")]
#[command(version = "1.0.0")]
#[command(about = "A resumable paginated-listing crawler", long_about = None)]
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

    /// Resume from the checkpoint if one exists
    #[arg(long, conflicts_with = "fresh")]
    resume: bool,

    /// Delete any existing checkpoint and start over
    #[arg(long, conflicts_with = "resume")]
    fresh: bool,

    /// Override the last page to crawl
    #[arg(long, value_name = "PAGE")]
    max_page: Option<i64>,

    /// Override the output directory
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Search for the last working page instead of crawling
    #[arg(long, conflicts_with_all = ["probe", "stats", "dry_run"])]
    find_boundary: bool,

    /// Page known to work, for --find-boundary
    #[arg(long, value_name = "PAGE", allow_negative_numbers = true, requires = "find_boundary")]
    anchor: Option<BigInt>,

    /// Search direction for --find-boundary (up or down)
    #[arg(long, value_name = "DIR", requires = "find_boundary")]
    direction: Option<Direction>,

    /// Fetch these pages and classify them against the last checkpoint
    #[arg(
        long,
        value_name = "PAGES",
        value_delimiter = ',',
        num_args = 1..,
        allow_negative_numbers = true,
        conflicts_with_all = ["stats", "dry_run"]
    )]
    probe: Option<Vec<BigInt>>,

    /// Show statistics from the checkpoint and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let layout = match &cli.output_dir {
        Some(dir) => OutputLayout::new(dir, &config.output),
        None => OutputLayout::from_config(&config.output),
    };

    if cli.dry_run {
        handle_dry_run(&config, &layout, &cli);
        return Ok(ExitCode::SUCCESS);
    }
    if cli.stats {
        handle_stats(&layout)?;
        return Ok(ExitCode::SUCCESS);
    }
    if cli.find_boundary {
        handle_find_boundary(&config, &layout, &cli).await?;
        return Ok(ExitCode::SUCCESS);
    }
    if let Some(pages) = &cli.probe {
        handle_probe(&config, &layout, pages).await?;
        return Ok(ExitCode::SUCCESS);
    }

    handle_crawl(&config, layout, config_hash, &cli).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wrapscan=info,warn"),
            1 => EnvFilter::new("wrapscan=debug,info"),
            2 => EnvFilter::new("wrapscan=trace,debug"),
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

/// Handles the --dry-run mode: shows the resolved configuration
fn handle_dry_run(config: &Config, layout: &OutputLayout, cli: &Cli) {
    let end_page = cli.max_page.unwrap_or(config.crawl.end_page);

    println!("=== Wrapscan Dry Run ===\n");

    println!("Service:");
    println!("  Listing: {}", config.service.base_url);
    println!("  Page parameter: {}", config.service.page_param);
    println!(
        "  Identifiers: {}######## ({})",
        config.service.item_tag, config.service.item_extension
    );

    println!("\nCrawl:");
    println!("  Pages: {} to {}", config.crawl.start_page, end_page);
    println!("  Request delay: {}ms", config.crawl.request_delay_ms);
    println!("  Attempts per page: {}", config.crawl.max_attempts);
    println!("  Retry rounds: {}", config.crawl.max_retry_rounds);
    println!("  Checkpoint every: {} pages", config.crawl.checkpoint_interval);
    if let Some(limit) = config.crawl.stop_after_without_new {
        println!("  Stop after {} pages without new items", limit);
    }

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Checkpoint: {}", layout.checkpoint.display());
    println!("  Manifest: {}", layout.manifest.display());
    println!("  Index: {}", layout.index.display());

    let store = CheckpointStore::new(layout.checkpoint.clone());
    println!("\n✓ Configuration is valid");
    if cli.resume && store.exists() {
        println!("✓ Would resume from {}", store.path().display());
    } else {
        println!(
            "✓ Would crawl {} pages",
            end_page.saturating_sub(config.crawl.start_page).saturating_add(1)
        );
    }
}

/// Handles the --stats mode: shows statistics from the checkpoint
fn handle_stats(layout: &OutputLayout) -> anyhow::Result<()> {
    let store = CheckpointStore::new(layout.checkpoint.clone());
    println!("Checkpoint: {}\n", store.path().display());

    let state = store
        .load()?
        .with_context(|| format!("No checkpoint found at {}", store.path().display()))?;
    print_statistics(&CrawlStatistics::from_state(&state));

    Ok(())
}

/// Handles the --find-boundary mode
async fn handle_find_boundary(
    config: &Config,
    layout: &OutputLayout,
    cli: &Cli,
) -> anyhow::Result<()> {
    let fetcher = HttpPageFetcher::from_config(config)?;
    let ceiling = parse_probe_ceiling(config.boundary.probe_ceiling.as_deref())?;
    let anchor = cli
        .anchor
        .clone()
        .unwrap_or_else(|| BigInt::from(config.boundary.anchor));
    let direction = cli.direction.unwrap_or(config.boundary.direction);

    let report = BoundaryLocator::new(&fetcher)
        .with_ceiling(ceiling)
        .locate(anchor, direction)
        .await?;

    layout.ensure_directory()?;
    write_boundary_report(&layout.boundary, &report)?;

    match &report.outcome {
        BoundaryOutcome::Found {
            last_working,
            first_failing,
            confirmation,
        } => {
            println!("Last working page: {}", last_working);
            println!("First failing page: {}", first_failing);
            if !confirmation.is_stable() {
                println!("Warning: confirmation disagreed, the boundary may be unstable");
            }
        }
        BoundaryOutcome::NoBoundary { highest_working } => {
            println!(
                "No boundary below the ceiling; highest working page: {}",
                highest_working
            );
        }
    }
    println!("{} requests made", report.request_count());

    Ok(())
}

/// Handles the --probe mode
async fn handle_probe(
    config: &Config,
    layout: &OutputLayout,
    pages: &[BigInt],
) -> anyhow::Result<()> {
    let fetcher = HttpPageFetcher::from_config(config)?;
    let store = CheckpointStore::new(layout.checkpoint.clone());

    let baseline = match store.load()? {
        Some(state) => Baseline::from(&state),
        None => {
            tracing::warn!(
                "No checkpoint at {}, probing against an empty baseline",
                store.path().display()
            );
            Baseline::empty()
        }
    };

    let summary = probe_pages(&fetcher, &baseline, pages).await;
    layout.ensure_directory()?;
    write_probe_report(&layout.probe, &summary)?;

    for report in &summary.reports {
        println!(
            "Page {}: {} ({} items, {} new)",
            report.page,
            report.classification,
            report.item_count,
            report.new_items.len()
        );
    }
    println!(
        "{} items not in the baseline, {} failed pages",
        summary.new_items.len(),
        summary.failed_count()
    );

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: &Config,
    layout: OutputLayout,
    config_hash: String,
    cli: &Cli,
) -> anyhow::Result<ExitCode> {
    let start_page = config.crawl.start_page;
    let end_page = cli.max_page.unwrap_or(config.crawl.end_page);

    let store = CheckpointStore::new(layout.checkpoint.clone());
    if cli.fresh && store.exists() {
        tracing::info!("Removing checkpoint {}", store.path().display());
        store.remove()?;
    }

    let shutdown = Arc::new(AtomicBool::new(false));
    let flag = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing the current page");
            flag.store(true, Ordering::SeqCst);
        }
    });

    let fetcher = HttpPageFetcher::from_config(config)?;
    let driver = CrawlDriver::new(fetcher, CrawlSettings::from_config(config), layout)
        .with_config_hash(config_hash)
        .with_shutdown(shutdown);

    let report = driver.run_crawl(start_page, end_page, cli.resume).await?;

    println!(
        "{} unique items ({} new this run), cursor {}",
        report.total_items,
        report.new_items,
        report
            .cursor
            .map_or_else(|| "-".to_string(), |cursor| cursor.to_string())
    );
    if !report.still_failed.is_empty() {
        println!("{} pages still failing", report.still_failed.len());
    }
    println!("Manifest: {}", driver.layout().manifest.display());

    match report.status {
        CrawlStatus::Interrupted => {
            println!("Interrupted; rerun with --resume to continue");
            Ok(ExitCode::from(EXIT_INTERRUPTED))
        }
        CrawlStatus::Completed | CrawlStatus::StoppedEarly => Ok(ExitCode::SUCCESS),
    }
}
