//! Book-Harvest main entry point
//!
//! This is the command-line interface for the Book-Harvest catalog crawler.

use anyhow::Context;
use book_harvest::config::{load_config_with_hash, Config};
use book_harvest::crawler::Crawler;
use book_harvest::output::{load_statistics, print_book_page, print_crawl_result, print_statistics};
use book_harvest::storage::{BookQuery, SqliteStorage, Storage, DEFAULT_PAGE_SIZE};
use book_harvest::Rating;
use clap::Parser;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Book-Harvest: a paginated catalog crawler
///
/// Book-Harvest walks a paginated book catalog, extracts every listed book,
/// and replaces the stored collection with the result in one atomic step.
#[derive(Parser, Debug)]
#[command(name = "book-harvest")]
#[command(version)]
#[command(about = "Crawls a paginated book catalog into SQLite", long_about = None)]
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

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long, conflicts_with_all = ["stats", "list"])]
    dry_run: bool,

    /// Show statistics for the stored collection and exit
    #[arg(long, conflicts_with_all = ["dry_run", "list"])]
    stats: bool,

    /// List stored books and exit
    #[arg(long, conflicts_with_all = ["dry_run", "stats"])]
    list: bool,

    /// Case-insensitive title substring (with --list)
    #[arg(long, requires = "list")]
    search: Option<String>,

    /// Exact category, case-insensitive (with --list)
    #[arg(long, requires = "list")]
    category: Option<String>,

    /// Star rating: One, Two, Three, Four or Five (with --list)
    #[arg(long, requires = "list", value_parser = parse_rating)]
    rating: Option<Rating>,

    /// Minimum price, inclusive (with --list)
    #[arg(long, requires = "list")]
    min_price: Option<f64>,

    /// Maximum price, inclusive (with --list)
    #[arg(long, requires = "list")]
    max_price: Option<f64>,

    /// Only books in stock (with --list)
    #[arg(long, requires = "list")]
    in_stock: bool,

    /// Page number, 1-based (with --list)
    #[arg(long, requires = "list", default_value_t = 1)]
    page: u32,

    /// Page size (with --list)
    #[arg(long, requires = "list", default_value_t = DEFAULT_PAGE_SIZE)]
    limit: u32,
}

fn parse_rating(value: &str) -> Result<Rating, String> {
    match Rating::from_token(value) {
        Rating::Unknown => Err(format!("unknown rating '{}'", value)),
        rating => Ok(rating),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else if cli.list {
        handle_list(&config, &cli)
    } else {
        handle_crawl(config, config_hash).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("book_harvest=info,warn"),
            1 => EnvFilter::new("book_harvest=debug,info"),
            2 => EnvFilter::new("book_harvest=trace,debug"),
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

fn open_storage(config: &Config) -> anyhow::Result<SqliteStorage> {
    SqliteStorage::new(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config) {
    println!("=== Book-Harvest Dry Run ===\n");

    println!("Site:");
    println!("  Base URL: {}", config.site.base_url);
    println!("  Seed URL: {}", config.seed_url());

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!("  Crawl timeout: {}s", config.crawler.crawl_timeout_secs);
    println!("  Request timeout: {}s", config.crawler.request_timeout_secs);
    println!(
        "  Fetch attempts: {} (backoff from {}ms)",
        config.crawler.fetch_attempts, config.crawler.backoff_initial_ms
    );
    println!("  Normalize workers: {}", config.crawler.normalize_workers);

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  Collection: {}", config.output.collection);
    println!("  Allow empty replace: {}", config.output.allow_empty_replace);

    println!("\nSelectors:");
    for (name, selector) in config.selectors.entries() {
        println!("  {}: {}", name, selector);
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would start crawling at {}", config.seed_url());
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(config)?;
    let stats = load_statistics(&storage, &config.output.collection)?;
    print_statistics(&stats);

    storage.close()?;
    Ok(())
}

/// Handles the --list mode: filtered, paginated listing of stored books
fn handle_list(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let query = BookQuery {
        search: cli.search.clone(),
        category: cli.category.clone(),
        rating: cli.rating,
        min_price: cli.min_price,
        max_price: cli.max_price,
        in_stock: cli.in_stock.then_some(true),
        page: cli.page,
        limit: cli.limit,
    };

    let storage = open_storage(config)?;
    let page = storage.query_books(&config.output.collection, &query)?;
    print_book_page(&page);

    storage.close()?;
    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, config_hash: String) -> anyhow::Result<()> {
    let storage = open_storage(&config)?;
    let mut crawler = Crawler::new(config, storage)?.with_config_hash(config_hash);

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping crawl before the next step");
            on_signal.cancel();
        }
    });

    let result = crawler.run_until_cancelled(cancel).await;
    crawler.into_storage().close()?;

    print_crawl_result(&result);

    match result.error {
        Some(error) => Err(anyhow::Error::new(error).context("Crawl failed")),
        None => Ok(()),
    }
}
