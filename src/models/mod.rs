// src/models/mod.rs

//! Domain models for the crawler application.
//!
//! Every persisted entity implements [`crate::storage::Record`].

mod config;
mod feed;
mod issue;
mod paper;
mod post;

// Re-export all public types
pub use config::{
    Config, CrawlerConfig, FailurePolicy, LoggingConfig, SourcesConfig, StorageConfig,
};
pub use feed::Feed;
pub use issue::{
    ArchiveRecord, FeedInclusion, FeedIssue, ISSUE_DATE_FORMAT, Watermarks, issue_id,
    parse_issue_date,
};
pub use paper::{
    Author, Authorship, KeywordCategorization, Paper, PaperMeta, author_id, normalize_meta_key,
    paper_id_from_link, split_list,
};
pub use post::Post;
