//! Feed directory loader.
//!
//! The NEP directory lists every feed as a `div.nitpo_antem` block. Its second
//! `span` carries the feed id and the third the `"title, description"` blurb.

use scraper::Html;

use crate::error::Result;
use crate::models::Feed;
use crate::storage::dedup_by_key;
use crate::utils::http::Fetch;
use crate::utils::{element_text, parse_selector};

/// Extract one [`Feed`] per directory block, first occurrence of an id wins.
pub fn parse_feed_directory(html: &str) -> Result<Vec<Feed>> {
    let document = Html::parse_document(html);
    let block_sel = parse_selector("div.nitpo_antem")?;
    let span_sel = parse_selector("span")?;

    let mut feeds = Vec::new();
    for block in document.select(&block_sel) {
        let spans: Vec<_> = block.select(&span_sel).collect();
        let (Some(id_span), Some(blurb_span)) = (spans.get(1), spans.get(2)) else {
            log::warn!(
                "Skipping directory block with {} spans: {:.80}",
                spans.len(),
                element_text(&block)
            );
            continue;
        };

        let blurb: String = blurb_span.text().collect();
        match Feed::from_blurb(&element_text(id_span), &blurb) {
            Ok(feed) => feeds.push(feed),
            Err(e) => log::warn!("Skipping directory block: {e}"),
        }
    }

    Ok(dedup_by_key(feeds))
}

/// Fetches and parses the feed directory page.
pub struct FeedDirectoryLoader<'a> {
    fetcher: &'a dyn Fetch,
    url: String,
}

impl<'a> FeedDirectoryLoader<'a> {
    pub fn new(fetcher: &'a dyn Fetch, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }

    pub async fn load(&self) -> Result<Vec<Feed>> {
        log::info!("Fetching feed directory from {}", self.url);
        let html = self.fetcher.fetch_text(&self.url).await?;
        let feeds = parse_feed_directory(&html)?;
        log::info!("Feed directory lists {} feeds", feeds.len());
        Ok(feeds)
    }
}
