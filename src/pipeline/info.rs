// src/pipeline/info.rs

use chrono::NaiveDate;

use crate::error::Result;
use crate::models::{
    Author, Authorship, Feed, FeedInclusion, FeedIssue, KeywordCategorization, Paper, Post,
};
use crate::storage::{Record, TableStorage};

/// Row counts of the stored tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageInfo {
    pub tables: Vec<(&'static str, usize)>,
    /// Most recent issue date across all feeds
    pub latest_issue: Option<NaiveDate>,
}

impl StorageInfo {
    pub fn count(&self, table: &str) -> usize {
        self.tables
            .iter()
            .find(|(name, _)| *name == table)
            .map(|(_, count)| *count)
            .unwrap_or(0)
    }
}

async fn count<R: Record, S: TableStorage>(storage: &S) -> Result<(&'static str, usize)> {
    Ok((R::TABLE, storage.read_table::<R>().await?.len()))
}

pub async fn run_info<S: TableStorage>(storage: &S) -> Result<StorageInfo> {
    let issues: Vec<FeedIssue> = storage.read_table().await?;
    let latest_issue = issues.iter().map(|i| i.published).max();

    let tables = vec![
        count::<Feed, _>(storage).await?,
        (FeedIssue::TABLE, issues.len()),
        count::<FeedInclusion, _>(storage).await?,
        count::<Paper, _>(storage).await?,
        count::<Author, _>(storage).await?,
        count::<Authorship, _>(storage).await?,
        count::<KeywordCategorization, _>(storage).await?,
        count::<Post, _>(storage).await?,
    ];

    for (table, rows) in &tables {
        log::info!("    {table}: {rows} rows");
    }
    match latest_issue {
        Some(date) => log::info!("Latest issue: {date}"),
        None => log::info!("No issues stored yet."),
    }

    Ok(StorageInfo {
        tables,
        latest_issue,
    })
}
