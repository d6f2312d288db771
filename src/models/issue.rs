//! Feed issues, inclusions and the per-feed crawl watermark.

use std::collections::HashMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::paper::paper_id_from_link;
use crate::storage::Record;

/// Date format shared by archive links, issue ids and watermarks.
pub const ISSUE_DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a fixed-width `YYYY-MM-DD` issue date.
pub fn parse_issue_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw, ISSUE_DATE_FORMAT)
        .map_err(|e| AppError::validation(format!("invalid issue date '{raw}': {e}")))
}

/// One dated publication of a feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedIssue {
    /// `{feed_id}-{YYYY-MM-DD}`
    pub id: String,
    pub feed_id: String,
    pub published: NaiveDate,
}

impl FeedIssue {
    pub fn new(feed_id: &str, published: NaiveDate) -> Self {
        Self {
            id: issue_id(feed_id, published),
            feed_id: feed_id.to_string(),
            published,
        }
    }
}

pub fn issue_id(feed_id: &str, published: NaiveDate) -> String {
    format!("{}-{}", feed_id, published.format(ISSUE_DATE_FORMAT))
}

impl Record for FeedIssue {
    const TABLE: &'static str = "feed_issues";
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// A paper's appearance at a position within an issue.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FeedInclusion {
    /// 1-based position within the issue, contiguous across pages
    pub ind: u32,
    pub issue_id: String,
    pub paper_id: String,
}

impl Record for FeedInclusion {
    const TABLE: &'static str = "feed_inclusions";
    type Key = (String, u32);

    fn key(&self) -> (String, u32) {
        (self.issue_id.clone(), self.ind)
    }
}

/// One paper link found while paging through an issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveRecord {
    /// Site-relative paper link (`/paper/...htm`)
    pub link: String,
    pub paper_id: String,
    pub feed_id: String,
    /// Archive href the issue was reached through
    pub issue_href: String,
    pub ind: u32,
    pub published: NaiveDate,
}

impl ArchiveRecord {
    pub fn new(
        link: &str,
        feed_id: &str,
        issue_href: &str,
        ind: u32,
        published: NaiveDate,
    ) -> Result<Self> {
        let paper_id = paper_id_from_link(link)
            .ok_or_else(|| AppError::validation(format!("no paper id in link '{link}'")))?;
        if ind == 0 {
            return Err(AppError::validation("inclusion index starts at 1"));
        }

        Ok(Self {
            link: link.to_string(),
            paper_id,
            feed_id: feed_id.to_string(),
            issue_href: issue_href.to_string(),
            ind,
            published,
        })
    }

    pub fn issue_id(&self) -> String {
        issue_id(&self.feed_id, self.published)
    }
}

/// Read-only snapshot of the latest stored issue date per feed.
///
/// Built once before the archive stage and shared with every worker.
#[derive(Debug, Clone, Default)]
pub struct Watermarks {
    latest: HashMap<String, String>,
}

impl Watermarks {
    pub fn from_issues(issues: &[FeedIssue]) -> Self {
        let mut by_feed: HashMap<&str, NaiveDate> = HashMap::new();
        for issue in issues {
            by_feed
                .entry(issue.feed_id.as_str())
                .and_modify(|d| *d = (*d).max(issue.published))
                .or_insert(issue.published);
        }

        let latest = by_feed
            .into_iter()
            .map(|(feed, date)| (feed.to_string(), date.format(ISSUE_DATE_FORMAT).to_string()))
            .collect();
        Self { latest }
    }

    /// Latest stored date for a feed, or `""` when nothing was collected yet.
    pub fn get(&self, feed_id: &str) -> &str {
        self.latest.get(feed_id).map(String::as_str).unwrap_or("")
    }

    /// Whether an issue dated `published` still needs crawling.
    pub fn admits(&self, feed_id: &str, published: &str) -> bool {
        published > self.get(feed_id)
    }

    pub fn len(&self) -> usize {
        self.latest.len()
    }

    pub fn is_empty(&self) -> bool {
        self.latest.is_empty()
    }
}
