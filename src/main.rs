//! Catalog-Spider main entry point
//!
//! This is the command-line interface for the Catalog-Spider product crawler.

use anyhow::Context;
use catalog_spider::config::{load_config_with_hash, Config, SpiderConfig};
use catalog_spider::crawler::{crawl, CrawlOutcome};
use catalog_spider::output::{load_statistics, print_statistics};
use catalog_spider::storage::{open_store, StateStore};
use catalog_spider::SpiderError;
use clap::Parser;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Exit code for a spider that has never produced a record
const EXIT_NO_DATA: u8 = 2;

/// Catalog-Spider: a resumable product catalog crawler
///
/// Catalog-Spider discovers product pages under configured listing URLs,
/// extracts structured product records, and persists progress so repeated
/// runs only do the work that is still outstanding.
#[derive(Parser, Debug)]
#[command(name = "catalog-spider")]
#[command(version)]
#[command(about = "A resumable product catalog crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Crawl only the named spider (repeatable; default: all spiders)
    #[arg(short, long = "spider", value_name = "NAME")]
    spiders: Vec<String>,

    /// Discard cached listing groups and run discovery again
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    rediscover: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from persisted state and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    let spiders = select_spiders(&config, &cli.spiders)?;

    if cli.dry_run {
        handle_dry_run(&config, &spiders);
        Ok(ExitCode::SUCCESS)
    } else if cli.stats {
        handle_stats(&config, &spiders)?;
        Ok(ExitCode::SUCCESS)
    } else {
        handle_crawl(&config, &spiders, cli.rediscover).await
    }
}

/// Resolves `--spider` names, keeping the order given
fn select_spiders<'a>(
    config: &'a Config,
    names: &[String],
) -> Result<Vec<&'a SpiderConfig>, SpiderError> {
    if names.is_empty() {
        return Ok(config.spiders.iter().collect());
    }

    names
        .iter()
        .map(|name| {
            config
                .spider(name)
                .ok_or_else(|| SpiderError::UnknownSpider(name.clone()))
        })
        .collect()
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("catalog_spider=info,warn"),
            1 => EnvFilter::new("catalog_spider=debug,info"),
            2 => EnvFilter::new("catalog_spider=trace,debug"),
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

/// Handles the --dry-run mode: shows what would be crawled
fn handle_dry_run(config: &Config, spiders: &[&SpiderConfig]) {
    println!("=== Catalog-Spider Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Batch limit: {}", config.crawler.batch_limit);
    println!("  State directory: {}", config.crawler.state_dir);
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Navigation timeout: {}s", config.crawler.navigation_timeout);

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nSpiders ({}):", spiders.len());
    for spider in spiders {
        println!(
            "  - {} (fetch mode: {}, batch limit: {})",
            spider.name,
            spider.fetch_mode.as_str(),
            spider.effective_batch_limit(&config.crawler)
        );
        for url in spider.listing_urls() {
            println!("    * {}", url);
        }
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would crawl {} listing URLs",
        spiders
            .iter()
            .map(|s| s.listing_urls().count())
            .sum::<usize>()
    );
}

/// Handles the --stats mode: shows statistics from persisted state
fn handle_stats(config: &Config, spiders: &[&SpiderConfig]) -> anyhow::Result<()> {
    let store = open_store(&config.crawler);
    println!("State directory: {}\n", store.root().display());

    for spider in spiders {
        let stats = load_statistics(&store, &spider.name)
            .with_context(|| format!("Failed to load state for spider '{}'", spider.name))?;
        print_statistics(&stats);
        println!();
    }

    Ok(())
}

/// Handles the main crawl operation, one spider after another
async fn handle_crawl(
    config: &Config,
    spiders: &[&SpiderConfig],
    rediscover: bool,
) -> anyhow::Result<ExitCode> {
    let mut no_data = Vec::new();

    for spider in spiders {
        if rediscover {
            open_store(&config.crawler)
                .clear_listing_groups(&spider.name)
                .with_context(|| format!("Failed to clear listing groups for '{}'", spider.name))?;
        }

        let result = crawl(config, spider)
            .await
            .with_context(|| format!("Crawl failed for spider '{}'", spider.name))?;

        match result.outcome() {
            CrawlOutcome::NewRecords => tracing::info!(
                "Spider '{}': {} new records saved ({} total)",
                spider.name,
                result.new_record_count,
                result.record_count
            ),
            CrawlOutcome::NothingNew => tracing::info!(
                "Spider '{}': nothing new ({} records total)",
                spider.name,
                result.record_count
            ),
            CrawlOutcome::NoData => {
                tracing::error!("Spider '{}': no data to save", spider.name);
                no_data.push(spider.name.as_str());
            }
        }
    }

    if no_data.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        tracing::error!("Spiders without any data: {}", no_data.join(", "));
        Ok(ExitCode::from(EXIT_NO_DATA))
    }
}
