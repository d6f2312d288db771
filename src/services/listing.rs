//! Ranked listing poller.
//!
//! Each listed item is a `tr.athing` row followed by a subtext row holding
//! age, score, submitter and comment count.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::Post;
use crate::utils::http::Fetch;
use crate::utils::{element_text, parse_selector};

/// Posts parsed from one poll.
#[derive(Debug, Default)]
pub struct ListingPage {
    pub posts: Vec<Post>,
    /// Rows dropped because a required element was missing
    pub skipped: usize,
}

struct Selectors {
    row: Selector,
    rank: Selector,
    title_link: Selector,
    title_fallback: Selector,
    sitebit: Selector,
    age: Selector,
    score: Selector,
    poster: Selector,
    anchor: Selector,
}

impl Selectors {
    fn new() -> Result<Self> {
        Ok(Self {
            row: parse_selector("tr.athing")?,
            rank: parse_selector("span.rank")?,
            title_link: parse_selector("a.titlelink")?,
            title_fallback: parse_selector("span.titleline > a")?,
            sitebit: parse_selector("span.sitebit")?,
            age: parse_selector("span.age")?,
            score: parse_selector("span.score")?,
            poster: parse_selector("a.hnuser")?,
            anchor: parse_selector("a")?,
        })
    }
}

/// Number in a `"<n> <unit>"` label: every token but the last, joined.
///
/// `"12 points"` gives 12, `"1\u{a0}comment"` gives 1; unparsable text gives 0.
pub fn parse_count(text: &str) -> u32 {
    let tokens: Vec<&str> = text.split_whitespace().collect();
    let Some((_, number)) = tokens.split_last() else {
        return 0;
    };
    number.concat().parse().unwrap_or(0)
}

fn parse_rank(text: &str) -> Option<u32> {
    let trimmed = text.trim().trim_end_matches('.');
    trimmed
        .parse::<u32>()
        .ok()
        .or_else(|| trimmed.parse::<f64>().ok().filter(|r| *r >= 0.0).map(|r| r as u32))
}

fn first_text(row: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    row.select(selector).next().map(|el| element_text(&el))
}

fn subtext_row<'a>(row: &ElementRef<'a>) -> Option<ElementRef<'a>> {
    row.next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "tr")
}

fn parse_row(
    row: &ElementRef<'_>,
    sel: &Selectors,
    collected: DateTime<Utc>,
) -> Result<Post> {
    let post_id = row
        .value()
        .id()
        .filter(|id| !id.is_empty())
        .ok_or_else(|| AppError::parse("listing row", "missing id"))?
        .to_string();
    let context = format!("listing row {post_id}");

    let rank = first_text(row, &sel.rank)
        .and_then(|t| parse_rank(&t))
        .ok_or_else(|| AppError::parse(&context, "missing rank"))?;

    let title_a = row
        .select(&sel.title_link)
        .next()
        .or_else(|| row.select(&sel.title_fallback).next())
        .ok_or_else(|| AppError::parse(&context, "missing title link"))?;
    let link = title_a
        .value()
        .attr("href")
        .ok_or_else(|| AppError::parse(&context, "title link has no href"))?
        .to_string();

    let sub = subtext_row(row).ok_or_else(|| AppError::parse(&context, "missing subtext row"))?;
    let posted = sub
        .select(&sel.age)
        .next()
        .and_then(|age| age.value().attr("title"))
        .unwrap_or_default()
        .to_string();
    let comments = sub
        .select(&sel.anchor)
        .last()
        .map(|a| element_text(&a))
        .filter(|text| text.contains("comment"))
        .map(|text| parse_count(&text))
        .unwrap_or(0);

    Ok(Post {
        post_id,
        rank,
        title: element_text(&title_a),
        link,
        sitebit: first_text(row, &sel.sitebit).unwrap_or_default(),
        posted,
        score: first_text(&sub, &sel.score)
            .map(|t| parse_count(&t))
            .unwrap_or(0),
        poster: first_text(&sub, &sel.poster).unwrap_or_default(),
        comments,
        collected,
    })
}

/// Parse every listed row, stamping each with `collected`.
///
/// Rows missing an id, rank, title link or subtext row are skipped with a
/// warning; absent score and comments default to zero.
pub fn parse_listing(html: &str, collected: DateTime<Utc>) -> Result<ListingPage> {
    let document = Html::parse_document(html);
    let sel = Selectors::new()?;

    let mut page = ListingPage::default();
    for row in document.select(&sel.row) {
        match parse_row(&row, &sel, collected) {
            Ok(post) => page.posts.push(post),
            Err(e) => {
                log::warn!("Skipping {e}");
                page.skipped += 1;
            }
        }
    }
    Ok(page)
}

/// Fetches and parses the listing page.
pub struct ListingPoller<'a> {
    fetcher: &'a dyn Fetch,
    url: String,
}

impl<'a> ListingPoller<'a> {
    pub fn new(fetcher: &'a dyn Fetch, url: impl Into<String>) -> Self {
        Self {
            fetcher,
            url: url.into(),
        }
    }

    pub async fn poll(&self, collected: DateTime<Utc>) -> Result<ListingPage> {
        log::info!("Polling listing {}", self.url);
        let html = self.fetcher.fetch_text(&self.url).await?;
        parse_listing(&html, collected)
    }
}
