//! Registry-Dredge main entry point
//!
//! Command-line interface for the capped-registry extraction crawler.

use anyhow::Context;
use clap::Parser;
use registry_dredge::config::load_config_with_hash;
use registry_dredge::crawler::run_registry_crawl;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Registry-Dredge: exhaustive extraction of capped search registries
///
/// Registry-Dredge enumerates a search-only registry by recursively
/// subdividing alphabetic query prefixes until every result page fits under
/// the site's per-page cap, deduplicating parsed records into a deterministic
/// checkpoint file per category.
#[derive(Parser, Debug)]
#[command(name = "registry-dredge")]
#[command(version = "1.0.0")]
#[command(about = "Exhaustive extraction of capped search registries", long_about = None)]
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

    /// Validate config and show the job plan without fetching anything
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load config {}", cli.config.display()))?;
    tracing::info!("Configuration loaded (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("registry_dredge=info,warn"),
            1 => EnvFilter::new("registry_dredge=debug,info"),
            2 => EnvFilter::new("registry_dredge=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows the job plan
fn handle_dry_run(config: &registry_dredge::config::Config) {
    println!("=== Registry-Dredge Dry Run ===\n");

    println!("Crawl Configuration:");
    println!("  Result cap: {}", config.crawl.result_cap);
    println!("  Checkpoint every: {} pages", config.crawl.checkpoint_every);
    println!("  Job stagger: {}ms", config.crawl.stagger_ms);
    println!("  Captcha poll: {}s", config.crawl.captcha_poll_secs);
    println!("  Result timeout: {}s", config.crawl.result_timeout_secs);

    println!("\nRegistry:");
    println!("  Base URL: {}", config.registry.base_url);
    println!("  Page size value: {}", config.registry.page_size_value);

    println!("\nOutput directory: {}", config.output.directory);

    println!("\nJobs ({}):", config.jobs.len());
    for job in &config.jobs {
        println!(
            "  - {} [{}] -> {}",
            job.category, job.status_filter, job.output_file
        );
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} categories", config.jobs.len());
}

/// Handles the main crawl operation
async fn handle_crawl(config: registry_dredge::config::Config) -> anyhow::Result<()> {
    tracing::info!("Starting {} crawl jobs", config.jobs.len());

    let outcomes = run_registry_crawl(config).await?;

    let mut failures = 0;
    for outcome in &outcomes {
        match &outcome.error {
            None => println!(
                "✓ {}: {} unique records from {} pages",
                outcome.category, outcome.unique_records, outcome.pages_parsed
            ),
            Some(error) => {
                failures += 1;
                println!("✗ {}: {}", outcome.category, error);
            }
        }
    }

    if failures > 0 {
        anyhow::bail!("{} of {} jobs failed", failures, outcomes.len());
    }
    Ok(())
}
