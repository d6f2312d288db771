// src/pipeline/listing.rs

//! Hourly listing snapshot.

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::Config;
use crate::services::ListingPoller;
use crate::storage::{TableStorage, WriteMetadata};
use crate::utils::http::Fetch;

/// Summary of one listing poll.
#[derive(Debug)]
pub struct ListingReport {
    pub collected: DateTime<Utc>,
    pub posts: usize,
    pub skipped: usize,
    /// `None` when the poll produced no rows and nothing was written
    pub write: Option<WriteMetadata>,
}

/// Poll the listing once and append every parsed row to the post log.
///
/// All rows of one run share the `collected` timestamp.
pub async fn run_listing<S: TableStorage>(
    config: &Config,
    storage: &S,
    fetcher: &dyn Fetch,
    collected: DateTime<Utc>,
) -> Result<ListingReport> {
    let page = ListingPoller::new(fetcher, config.sources.listing_url.as_str())
        .poll(collected)
        .await?;

    if page.skipped > 0 {
        log::warn!("{} listing rows were malformed and skipped", page.skipped);
    }

    let write = if page.posts.is_empty() {
        log::warn!("Listing returned no posts, nothing appended");
        None
    } else {
        let meta = storage.extend(&page.posts).await?;
        log::info!(
            "Appended {} posts, {} rows in {}",
            meta.written,
            meta.total,
            meta.table
        );
        Some(meta)
    };

    Ok(ListingReport {
        collected,
        posts: page.posts.len(),
        skipped: page.skipped,
        write,
    })
}
