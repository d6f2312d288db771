//! paperwatch CLI
//!
//! Local execution entry point. Scheduling is left to cron or a similar
//! runner: `listing` hourly, `econ` weekly.

use std::path::PathBuf;

use chrono::Utc;
use clap::{Parser, Subcommand};
use paperwatch::{
    error::Result,
    models::Config,
    pipeline::{self, SubsetParams},
    storage::LocalStorage,
    utils::http::HttpFetcher,
};

/// paperwatch - working paper feed and listing scraper
#[derive(Parser, Debug)]
#[command(
    name = "paperwatch",
    version,
    about = "Incremental scraper for working paper feeds and a ranked listing"
)]
struct Cli {
    /// Path to the TOML config file
    #[arg(short, long, default_value = "paperwatch.toml")]
    config: PathBuf,

    /// Override the storage root from the config
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Crawl new feed issues and their papers
    Econ,

    /// Append one snapshot of the ranked listing
    Listing,

    /// Export a reduced copy of the economics tables
    Subset {
        /// Target storage directory
        #[arg(long)]
        out: PathBuf,

        /// Keep authors with at least this many papers
        #[arg(long, default_value_t = 2)]
        min_papers_per_author: usize,

        /// Truncate abstracts to this many characters
        #[arg(long, default_value_t = 2000)]
        abstract_chars: usize,
    },

    /// Validate the config file
    Validate,

    /// Show row counts of the stored tables
    Info,
}

/// Initialize logging at the given default level.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = if cli.verbose {
        "debug"
    } else {
        loaded
            .as_ref()
            .map(|c| c.logging.level.as_str())
            .unwrap_or("info")
    };
    init_logging(level);

    if let Command::Validate = cli.command {
        pipeline::run_validate(&cli.config)?;
        log::info!("All validations passed!");
        return Ok(());
    }

    let config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });
    config.validate()?;

    let root = cli
        .storage_dir
        .unwrap_or_else(|| PathBuf::from(&config.storage.root));
    let storage = LocalStorage::new(root);
    log::info!("Storage root: {}", storage.root().display());

    match cli.command {
        Command::Econ => {
            let fetcher = HttpFetcher::new(&config.crawler)?;
            let report = pipeline::run_econ(&config, &storage, &fetcher).await?;
            report.log_summary();
        }

        Command::Listing => {
            let fetcher = HttpFetcher::new(&config.crawler)?;
            let report = pipeline::run_listing(&config, &storage, &fetcher, Utc::now()).await?;
            log::info!(
                "Collected {} posts at {} ({} skipped)",
                report.posts,
                report.collected,
                report.skipped
            );
        }

        Command::Subset {
            out,
            min_papers_per_author,
            abstract_chars,
        } => {
            let target = LocalStorage::new(&out);
            let params = SubsetParams {
                min_papers_per_author,
                abstract_chars,
            };
            pipeline::run_subset(&storage, &target, params).await?;
            log::info!("Subset written to {}", out.display());
        }

        Command::Info => {
            pipeline::run_info(&storage).await?;
        }

        // Handled before storage setup.
        Command::Validate => {}
    }

    log::info!("Done!");

    Ok(())
}
