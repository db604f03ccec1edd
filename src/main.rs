//! Sourcetap main entry point
//!
//! This is the command-line interface for the Sourcetap job-posting harvester.

use anyhow::{Context, Result};
use clap::Parser;
use sourcetap::config::{load_config_with_hash, Config};
use sourcetap::crawler::{run_crawl, CompletionSignal};
use sourcetap::llm::{enrich_all, EnrichedJob, OpenAiClient};
use sourcetap::output::{
    load_statistics, print_run_summary, print_statistics, write_json, RunSummary,
};
use sourcetap::storage::{open_storage, persist_all};
use sourcetap::url::ListingUrlBuilder;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Sourcetap: a job-posting harvester
///
/// Sourcetap walks the paginated search results of a job board, fetches
/// every new posting with bounded concurrency, optionally enriches the
/// descriptions with an LLM, and stores the results in SQLite.
#[derive(Parser, Debug)]
#[command(name = "sourcetap")]
#[command(version)]
#[command(about = "A job-posting harvester", long_about = None)]
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

    /// Validate config and print the listing URLs that would be requested
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,

    /// Do not send descriptions to the LLM even if `[llm]` is configured
    #[arg(long)]
    skip_enrichment: bool,

    /// Do not write to the database
    #[arg(long)]
    no_persist: bool,

    /// Write the harvested postings as JSON (overrides `output.json-path`)
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    let result = if cli.dry_run {
        handle_dry_run(&config)
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(&config, &cli).await
    };

    if let Err(e) = &result {
        tracing::error!("Run aborted: {:#}", e);
    }
    result
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("sourcetap=info,warn"),
            1 => EnvFilter::new("sourcetap=debug,info"),
            2 => EnvFilter::new("sourcetap=trace,debug"),
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

/// Handles the --dry-run mode: validates config and shows what would be requested
fn handle_dry_run(config: &Config) -> Result<()> {
    println!("=== Sourcetap Dry Run ===\n");

    println!("Search:");
    println!("  Query: {}", config.search.query);
    println!("  Site: {}", config.site.base_url);

    println!("\nCrawler Configuration:");
    println!("  Max pages: {}", config.crawler.max_pages);
    println!(
        "  Max concurrent fetches: {}",
        config.crawler.max_concurrent_fetches
    );
    println!("  Request delay: {}ms", config.crawler.request_delay_ms);
    match config.crawler.max_consecutive_empty_pages {
        Some(limit) => println!("  Early stop after {} empty pages", limit),
        None => println!("  Early stop: never"),
    }
    println!("  Completion: {:?}", config.completion.strategy);

    println!("\nEnrichment:");
    match &config.llm {
        Some(llm) => println!("  Model: {} (key from ${})", llm.model, llm.api_key_env),
        None => println!("  Disabled"),
    }

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    if let Some(json) = &config.output.json_path {
        println!("  JSON: {}", json);
    }

    let listing = ListingUrlBuilder::new(
        &config.site.base_url,
        &config.site.listing_path,
        &config.search.query,
    )?;
    println!("\nListing pages ({}):", config.crawler.max_pages);
    for page in 1..=config.crawler.max_pages {
        println!("  {}", listing.page_url(page)?);
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> Result<()> {
    println!("Database: {}\n", config.output.database_path);

    let storage = open_storage(Path::new(&config.output.database_path))
        .with_context(|| format!("Failed to open database {}", config.output.database_path))?;
    let stats = load_statistics(&storage)?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl: walk, enrich, persist, export
async fn handle_crawl(config: &Config, cli: &Cli) -> Result<()> {
    // Fail on enrichment and database setup before any request goes out.
    let parser = match (&config.llm, cli.skip_enrichment) {
        (Some(llm), false) => Some(
            OpenAiClient::from_config(llm).context("Failed to set up description parsing")?,
        ),
        _ => None,
    };

    let mut storage = if cli.no_persist {
        None
    } else {
        Some(
            open_storage(Path::new(&config.output.database_path)).with_context(|| {
                format!("Failed to open database {}", config.output.database_path)
            })?,
        )
    };

    tracing::info!(
        "Searching '{}' on {} ({} pages, {} concurrent fetches)",
        config.search.query,
        config.site.base_url,
        config.crawler.max_pages,
        config.crawler.max_concurrent_fetches
    );

    let outcome = run_crawl(config).await.context("Crawl failed")?;
    if outcome.signal == CompletionSignal::Stability {
        tracing::warn!("Crawl ended by the stability heuristic; results may be incomplete");
    }

    let mut summary = RunSummary::from_outcome(&outcome);

    let jobs: Vec<EnrichedJob> = match &parser {
        Some(parser) => {
            let jobs = enrich_all(parser, outcome.records).await;
            summary.enriched = Some(jobs.iter().filter(|j| j.is_enriched()).count());
            jobs
        }
        None => outcome
            .records
            .into_iter()
            .map(EnrichedJob::unenriched)
            .collect(),
    };

    if let Some(storage) = storage.as_mut() {
        summary.persisted = Some(persist_all(storage, &jobs));
    }

    let json_path = cli
        .json
        .clone()
        .or_else(|| config.output.json_path.as_ref().map(PathBuf::from));
    if let Some(path) = json_path {
        write_json(&path, &jobs)
            .with_context(|| format!("Failed to write JSON to {}", path.display()))?;
    }

    if !cli.quiet {
        print_run_summary(&summary);
    }

    Ok(())
}
