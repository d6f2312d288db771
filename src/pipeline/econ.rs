// src/pipeline/econ.rs

//! Weekly economics crawl: directory, archives, details, reconciliation.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Config, FeedIssue, Watermarks};
use crate::pipeline::reconcile::{Reconciled, hold_back_failed_issues};
use crate::services::{
    ArchiveCrawler, BatchOptions, DetailEnricher, FeedDirectoryLoader, UnitFailure,
};
use crate::storage::{Record, TableStorage, WriteMetadata};
use crate::utils::http::Fetch;

const TOTAL_STEPS: usize = 5;

/// Summary of one economics run.
#[derive(Debug)]
pub struct RunReport {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub feed_count: usize,
    pub issues_crawled: usize,
    pub archive_records: usize,
    pub papers_enriched: usize,
    pub feed_failures: Vec<UnitFailure>,
    pub detail_failures: Vec<UnitFailure>,
    /// Issues left unwritten because one of their papers failed
    pub held_back_issues: Vec<String>,
    pub writes: Vec<WriteMetadata>,
}

impl RunReport {
    pub fn is_complete(&self) -> bool {
        self.feed_failures.is_empty() && self.detail_failures.is_empty()
    }

    pub fn log_summary(&self) {
        log::info!("[SUMMARY] Economics crawl");
        log::info!("    Feeds: {}", self.feed_count);
        log::info!("    New issues: {}", self.issues_crawled);
        log::info!("    Inclusions found: {}", self.archive_records);
        log::info!("    Papers enriched: {}", self.papers_enriched);
        for write in &self.writes {
            log::info!(
                "    {}: {} written, {} total",
                write.table,
                write.written,
                write.total
            );
        }
        for failure in self.feed_failures.iter().chain(&self.detail_failures) {
            log::warn!("    Failed {}: {}", failure.unit, failure.error);
        }
        for issue in &self.held_back_issues {
            log::warn!("    Held back {issue} for the next run");
        }
        log::info!(
            "    Duration: {}s",
            (self.end_time - self.start_time).num_seconds()
        );
    }
}

fn step(n: usize, message: &str) {
    log::info!("[STEP {n}/{TOTAL_STEPS}] {message}");
}

fn archive_options(config: &Config) -> BatchOptions {
    BatchOptions {
        concurrency: config.crawler.archive_concurrency,
        policy: config.crawler.archive_failure_policy,
        delay: Duration::from_millis(config.crawler.request_delay_ms),
    }
}

fn detail_options(config: &Config) -> BatchOptions {
    BatchOptions {
        concurrency: config.crawler.detail_concurrency,
        policy: config.crawler.detail_failure_policy,
        delay: Duration::from_millis(config.crawler.request_delay_ms),
    }
}

/// Replace-by-key write that leaves the table untouched for an empty batch.
async fn replace_nonempty<S: TableStorage, R: Record>(
    storage: &S,
    rows: &[R],
    writes: &mut Vec<WriteMetadata>,
) -> Result<()> {
    if rows.is_empty() {
        log::debug!("Nothing new for {}", R::TABLE);
        return Ok(());
    }
    writes.push(storage.replace_records(rows).await?);
    Ok(())
}

/// Run the economics pipeline against `storage`.
///
/// Storage is only written after every parallel stage has finished.
pub async fn run_econ<S: TableStorage>(
    config: &Config,
    storage: &S,
    fetcher: &dyn Fetch,
) -> Result<RunReport> {
    let start_time = Utc::now();
    log::info!("Economics crawl starting");

    step(1, "Loading feed directory");
    let feeds = FeedDirectoryLoader::new(fetcher, config.sources.nep_base.as_str())
        .load()
        .await?;
    let mut writes = Vec::new();
    if feeds.is_empty() {
        log::warn!("Feed directory listed no feeds, keeping the stored feed table");
    } else {
        writes.push(storage.overwrite(&feeds).await?);
    }

    step(2, "Reading watermarks");
    let stored_issues: Vec<FeedIssue> = storage.read_table().await?;
    let watermarks = Watermarks::from_issues(&stored_issues);
    log::info!(
        "{} stored issues, {} feeds with a watermark",
        stored_issues.len(),
        watermarks.len()
    );

    step(3, "Crawling feed archives");
    let crawler = ArchiveCrawler::new(
        fetcher,
        &config.sources.econpapers_base,
        archive_options(config),
    )?;
    let feed_ids = feeds.iter().map(|f| f.id.clone()).collect();
    let crawl = crawler.crawl_all(feed_ids, &watermarks).await?;
    log::info!(
        "{} new issues with {} inclusions",
        crawl.issues_crawled,
        crawl.records.len()
    );

    step(4, "Fetching paper details");
    let mut seen = HashSet::new();
    let links: Vec<String> = crawl
        .records
        .iter()
        .filter(|r| seen.insert(r.link.as_str()))
        .map(|r| r.link.clone())
        .collect();
    let enricher = DetailEnricher::new(
        fetcher,
        &config.sources.econpapers_base,
        &config.sources.logec_base,
        detail_options(config),
    )?;
    let details = enricher.enrich(links).await?;
    log::info!(
        "{}/{} detail pages parsed",
        details.succeeded(),
        details.total
    );

    step(5, "Writing tables");
    let archive_records = crawl.records.len();
    let failed_links: HashSet<&str> = details.failures.iter().map(|f| f.unit.as_str()).collect();
    let (records, held_back_issues) = hold_back_failed_issues(crawl.records, &failed_links);
    let tables = Reconciled::build(&records, &details.results);
    replace_nonempty(storage, &tables.papers, &mut writes).await?;
    replace_nonempty(storage, &tables.authors, &mut writes).await?;
    replace_nonempty(storage, &tables.authorships, &mut writes).await?;
    replace_nonempty(storage, &tables.keywords, &mut writes).await?;
    replace_nonempty(storage, &tables.issues, &mut writes).await?;
    replace_nonempty(storage, &tables.inclusions, &mut writes).await?;

    let report = RunReport {
        start_time,
        end_time: Utc::now(),
        feed_count: feeds.len(),
        issues_crawled: crawl.issues_crawled,
        archive_records,
        papers_enriched: details.results.len(),
        feed_failures: crawl.failures,
        detail_failures: details.failures,
        held_back_issues,
        writes,
    };
    if report.is_complete() {
        log::info!("Economics crawl complete");
    } else {
        log::warn!("Economics crawl finished with failures");
    }
    Ok(report)
}
