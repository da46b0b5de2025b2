//! Command-line interface for opdsfeed.
//!
//! Provides commands for ingesting books from the catalog or a KBART
//! holdings file, regenerating the OPDS feed, and inspecting stored books.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Days, NaiveDate, Utc};
use clap::{Parser, Subcommand};

use crate::catalog::SpringerClient;
use crate::config::ResolvedConfig;
use crate::feed::{self, FeedOptions, FileSink};
use crate::ingest::{IngestReport, Ingestor};
use crate::store::BookStore;

/// opdsfeed - OPDS 2.0 feed generator for Springer e-books
#[derive(Parser, Debug)]
#[command(name = "opdsfeed")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Config file (default: discover .opdsfeed/config.yaml)
    #[arg(short, long, global = true, env = "OPDSFEED_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Add books published online in the last <days> days, then regenerate the feed
    Update {
        /// Number of days to look back
        days: u64,
    },

    /// Add the books listed in a KBART holdings file
    Ingest {
        /// Tab-separated KBART file
        holdings: PathBuf,
    },

    /// Regenerate the feed from the stored books
    Generate,

    /// Print the feed entry of one stored book
    Show {
        /// Book DOI, e.g. 10.1007/978-1-349-11550-1
        book_id: String,
    },

    /// Show resolved configuration (debug)
    Config,
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        let cfg = ResolvedConfig::load(self.config.as_deref())?;

        match self.command {
            Commands::Update { days } => {
                update(&cfg, days).await
            }
            Commands::Ingest { holdings } => {
                ingest_holdings(&cfg, &holdings).await
            }
            Commands::Generate => {
                generate(&cfg).await
            }
            Commands::Show { book_id } => {
                show_book(&cfg, &book_id)
            }
            Commands::Config => {
                show_config(&cfg)
            }
        }
    }
}

fn open_store(cfg: &ResolvedConfig) -> Result<BookStore> {
    BookStore::open(&cfg.database)
}

fn catalog_client(cfg: &ResolvedConfig) -> Result<SpringerClient> {
    let api_key = cfg.springer.require_api_key()?;
    Ok(SpringerClient::from_settings(api_key, &cfg.springer))
}

/// First day of the look-back window ending today
pub fn since_days_ago(today: NaiveDate, days: u64) -> Result<NaiveDate> {
    today
        .checked_sub_days(Days::new(days))
        .with_context(|| format!("{} days before {} is out of range", days, today))
}

/// Ingest recent books and regenerate the feed
async fn update(cfg: &ResolvedConfig, days: u64) -> Result<()> {
    let since = since_days_ago(Utc::now().date_naive(), days)?;
    let store = open_store(cfg)?;
    let client = catalog_client(cfg)?;

    eprintln!("Fetching books published online since {}...", since);
    let report = Ingestor::new(&store, &client).ingest_since(since).await?;
    print_report(&report);

    write_feed(cfg, &store).await
}

/// Ingest a KBART holdings file
async fn ingest_holdings(cfg: &ResolvedConfig, holdings: &Path) -> Result<()> {
    let store = open_store(cfg)?;
    let client = catalog_client(cfg)?;

    eprintln!("Ingesting holdings from {}...", holdings.display());
    let report = Ingestor::new(&store, &client)
        .ingest_holdings(holdings)
        .await?;
    print_report(&report);

    Ok(())
}

/// Regenerate the feed only
async fn generate(cfg: &ResolvedConfig) -> Result<()> {
    let store = open_store(cfg)?;
    write_feed(cfg, &store).await
}

async fn write_feed(cfg: &ResolvedConfig, store: &BookStore) -> Result<()> {
    let sink = FileSink::new(&cfg.output_dir, cfg.feed.base_name.clone());
    let options = FeedOptions::from_settings(&cfg.feed);

    let summary = feed::generate_feed(store, &sink, &options).await?;

    if summary.pages == 0 {
        println!("No books stored, nothing written");
    } else {
        println!(
            "Wrote {} page(s) with {} publication(s) to {}",
            summary.pages,
            summary.publications,
            sink.dir().display()
        );
    }
    Ok(())
}

fn print_report(report: &IngestReport) {
    println!("Saved:     {}", report.saved);
    println!("Existing:  {}", report.existing);
    println!("Not found: {}", report.not_found);
    println!("Failed:    {}", report.failed);
}

/// Print one book as it appears in the feed
fn show_book(cfg: &ResolvedConfig, book_id: &str) -> Result<()> {
    let store = open_store(cfg)?;
    let book = store
        .get_book(book_id)?
        .with_context(|| format!("Book not found: {}", book_id))?;

    let json = serde_json::to_string_pretty(&feed::publication(&book))
        .context("Failed to serialize publication")?;
    println!("{}", json);
    Ok(())
}

/// Print resolved configuration
fn show_config(cfg: &ResolvedConfig) -> Result<()> {
    println!("opdsfeed configuration");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:       {}", cfg.home.display());
    println!("  Database:   {}", cfg.database.display());
    println!("  Output dir: {}", cfg.output_dir.display());
    println!();
    println!("Feed:");
    println!("  Title:      {}", cfg.feed.title);
    println!("  Base URL:   {}", cfg.feed.base_url);
    println!("  Base name:  {}", cfg.feed.base_name);
    println!("  Page size:  {}", cfg.feed.page_size);
    println!();
    println!("Springer API:");
    println!("  Base URL:    {}", cfg.springer.base_url);
    println!("  Page length: {}", cfg.springer.page_length);
    println!(
        "  API key:     {}",
        if cfg.springer.api_key.is_some() { "(set)" } else { "(not set)" }
    );

    Ok(())
}
