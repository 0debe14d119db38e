//! Estate Crawler CLI
//!
//! Local execution entry point.

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use estate_crawler::{
    config,
    error::{AppError, Result},
    models::{Config, ListingId},
    pipeline::{self, Connector, RunReport},
    services::{HttpFetcher, ImmobiliareScraper},
    storage,
};

/// Estate Crawler - immobiliare.it listing scraper
#[derive(Parser, Debug)]
#[command(
    name = "estate-crawler",
    version,
    about = "Scrape real-estate listings into a pluggable store"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scrape listing pages and upsert them into storage
    Crawl {
        /// Listing URLs
        urls: Vec<String>,

        /// File with one listing URL per line ('#' starts a comment)
        #[arg(long)]
        urls_file: Option<PathBuf>,
    },

    /// Collect listing URLs from search result pages
    Discover {
        /// Search URL (default: configured search path)
        #[arg(long)]
        search_url: Option<String>,

        /// Maximum number of result pages to walk
        #[arg(long)]
        max_pages: Option<u32>,

        /// Crawl the discovered listings instead of printing them
        #[arg(long)]
        crawl: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Print a stored listing as JSON
    Show {
        /// Listing id, e.g. immobiliare:122361988
        listing_id: String,
    },
}

/// Initialize logging from the configured level or the verbosity flag.
fn init_logging(level: &str, verbose: bool) {
    let level = if verbose { "debug" } else { level };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

/// Read URLs from a file, skipping blank lines and comments.
fn read_urls_file(path: &Path) -> Result<Vec<String>> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AppError::config(format!("cannot read URL list {}: {e}", path.display()))
    })?;
    Ok(content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect())
}

fn exit_code(report: &RunReport) -> ExitCode {
    if report.failed() == 0 {
        ExitCode::SUCCESS
    } else {
        for outcome in &report.outcomes {
            if let Err(e) = &outcome.result {
                eprintln!("{}\t{}\t{}", e.kind(), outcome.url, e);
            }
        }
        ExitCode::FAILURE
    }
}

fn build_scraper(config: &Config) -> Result<Arc<ImmobiliareScraper>> {
    let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);
    Ok(Arc::new(ImmobiliareScraper::new(
        config.immobiliare.clone(),
        fetcher,
    )))
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let loaded = config::load_all(&cli.config);
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    init_logging(&level, cli.verbose);

    if let Command::Validate = cli.command {
        return Ok(match pipeline::run_validate(&cli.config) {
            Ok(_) => ExitCode::SUCCESS,
            Err(_) => ExitCode::FAILURE,
        });
    }

    let config = loaded?;
    if cli.config.exists() {
        log::info!("Loaded configuration from {}", cli.config.display());
    } else {
        log::info!("No config at {}, using defaults", cli.config.display());
    }

    match cli.command {
        Command::Crawl { mut urls, urls_file } => {
            if let Some(path) = urls_file {
                urls.extend(read_urls_file(&path)?);
            }
            if urls.is_empty() {
                return Err(AppError::config("no listing URLs given"));
            }
            let report = pipeline::run_crawler(&config, &urls).await?;
            Ok(exit_code(&report))
        }

        Command::Discover {
            search_url,
            max_pages,
            crawl,
        } => {
            let scraper = build_scraper(&config)?;
            let search_url = search_url.unwrap_or_else(|| config.immobiliare.search_url());
            let max_pages = max_pages.unwrap_or(config.immobiliare.max_pages);
            let delay = Duration::from_millis(config.crawler.request_delay_ms);

            let urls = pipeline::run_discover(&scraper, &search_url, max_pages, delay).await?;
            if !crawl {
                for url in &urls {
                    println!("{url}");
                }
                return Ok(ExitCode::SUCCESS);
            }

            let storage = storage::open(&config.storage).await?;
            let connector = Connector::new(scraper, storage, &config);
            let report = connector.run(&urls).await;
            Ok(exit_code(&report))
        }

        Command::Show { listing_id } => {
            let id: ListingId = listing_id.parse()?;
            let storage = storage::open(&config.storage).await?;
            match storage.lookup(&id).await? {
                Some(listing) => {
                    println!("{}", serde_json::to_string_pretty(&listing)?);
                    Ok(ExitCode::SUCCESS)
                }
                None => {
                    log::warn!("{id} not found in {} storage", storage.name());
                    Ok(ExitCode::FAILURE)
                }
            }
        }

        Command::Validate => Ok(ExitCode::SUCCESS),
    }
}
