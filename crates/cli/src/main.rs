//! sitescore-cache entry point.
//!
//! Inspects and prunes the sitescore URL cache. Results are printed to stdout
//! as JSON; logging goes to stderr.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use sitescore_core::cache::{SitemapCacheInfo, UrlCacheDetail};
use sitescore_core::{AppConfig, CacheCoordinator, Ttl};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "sitescore-cache")]
#[command(version)]
#[command(about = "Inspect and prune the sitescore URL cache")]
#[command(long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
enum Command {
    /// List cached sitemaps with per-URL details
    List {
        /// Cache TTL in hours for status calculation (overrides config)
        #[arg(long, value_name = "HOURS", allow_negative_numbers = true)]
        cache_ttl: Option<i64>,
    },

    /// Remove expired cache files
    Clean {
        /// Report what would be removed without deleting anything
        #[arg(long)]
        dry_run: bool,

        /// Cache TTL in hours (overrides config)
        #[arg(long, value_name = "HOURS", allow_negative_numbers = true)]
        cache_ttl: Option<i64>,
    },

    /// Remove every cache file
    Clear,
}

impl Command {
    fn ttl(&self, config: &AppConfig) -> Ttl {
        match self {
            Command::List { cache_ttl: Some(hours) } | Command::Clean { cache_ttl: Some(hours), .. } => {
                Ttl::from_hours(*hours)
            }
            _ => config.ttl(),
        }
    }
}

#[derive(Debug, Serialize)]
struct SitemapListing {
    #[serde(flatten)]
    info: SitemapCacheInfo,
    urls: Vec<UrlCacheDetail>,
}

#[derive(Debug, Serialize)]
struct ClearReport {
    removed: usize,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().context("loading configuration")?;
    let cache = CacheCoordinator::from_config(&config);
    let ttl = cli.command.ttl(&config);

    tracing::info!(cache_dir = %config.cache_dir.display(), command = ?cli.command, "running cache command");

    let output = match cli.command {
        Command::List { .. } => {
            let mut listings = Vec::new();
            for info in cache.list_sitemaps(ttl).await? {
                let urls = cache.url_details(&info.full_hash, ttl).await?;
                listings.push(SitemapListing { info, urls });
            }
            serde_json::to_string_pretty(&listings)?
        }
        Command::Clean { dry_run, .. } => {
            let report = cache.clean_expired(ttl, dry_run).await?;
            serde_json::to_string_pretty(&report)?
        }
        Command::Clear => {
            let removed = cache.clear_all().await?;
            serde_json::to_string_pretty(&ClearReport { removed })?
        }
    };

    println!("{output}");
    Ok(())
}
