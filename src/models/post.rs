//! Ranked listing rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::Record;

/// One listed item as seen by one collection run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Post {
    pub post_id: String,
    pub rank: u32,
    pub title: String,
    pub link: String,
    /// Origin domain annotation shown next to the title
    pub sitebit: String,
    /// Submission time text as published by the site
    pub posted: String,
    pub score: u32,
    pub poster: String,
    pub comments: u32,
    /// When this run collected the row
    pub collected: DateTime<Utc>,
}

impl Record for Post {
    const TABLE: &'static str = "posts";
    const MAX_PARTITION_SIZE: Option<usize> = Some(10_000);
    type Key = (String, DateTime<Utc>);

    fn key(&self) -> (String, DateTime<Utc>) {
        (self.post_id.clone(), self.collected)
    }
}
