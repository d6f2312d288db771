//! Service layer for the crawlers.
//!
//! This module contains the fetching and parsing logic for:
//! - Feed directory loading (`FeedDirectoryLoader`)
//! - Feed archive crawling (`ArchiveCrawler`)
//! - Paper detail enrichment (`DetailEnricher`)
//! - Ranked listing polling (`ListingPoller`)
//!
//! Parallel stages share the bounded worker pool in [`batch`].

pub mod archive;
pub mod batch;
pub mod details;
pub mod feeds;
pub mod listing;

pub use archive::{ArchiveCrawl, ArchiveCrawler};
pub use batch::{BatchOptions, BatchOutcome, UnitFailure, run_batch};
pub use details::DetailEnricher;
pub use feeds::FeedDirectoryLoader;
pub use listing::{ListingPage, ListingPoller};
