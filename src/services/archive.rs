//! Incremental archive crawler.
//!
//! For each feed the archive index lists one link per issue, the issue date
//! being the last ten characters of the link. Issues not newer than the feed's
//! watermark are skipped; the others are paged through via the right-arrow
//! control, numbering papers from 1 across pages.

use std::collections::HashSet;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{ArchiveRecord, Watermarks, paper_id_from_link, parse_issue_date};
use crate::services::batch::{BatchOptions, UnitFailure, run_batch};
use crate::utils::http::Fetch;
use crate::utils::{parse_selector, resolve_url};

static ISSUE_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/scripts/search\.pf\?neplist=").expect("issue link pattern"));
static PAPER_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/paper/.*/.*").expect("paper link pattern"));

/// Appended to issue links to get the frameless listing.
const ISSUE_PAGE_SUFFIX: &str = ";iframes=no";
const NEXT_PAGE_CONTROL: &str = r#"img.rightarrow[src="/right.png"]"#;
const DATE_WIDTH: usize = 10;

/// An issue link from a feed's archive index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueLink {
    pub href: String,
    /// The fixed-width date suffix as it appears in the link
    pub date_text: String,
    pub published: NaiveDate,
}

/// Paper links and the pagination control of one issue page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IssuePage {
    pub paper_links: Vec<String>,
    pub next_href: Option<String>,
}

fn date_suffix(href: &str) -> Option<&str> {
    let start = href.char_indices().rev().nth(DATE_WIDTH - 1)?.0;
    Some(&href[start..])
}

fn hrefs<'a>(document: &'a Html, pattern: &'a Regex) -> Result<impl Iterator<Item = &'a str>> {
    let anchor_sel = parse_selector("a[href]")?;
    let anchors: Vec<ElementRef<'a>> = document.select(&anchor_sel).collect();
    Ok(anchors
        .into_iter()
        .filter_map(|a| a.value().attr("href"))
        .filter(move |href| pattern.is_match(href)))
}

/// Extract the issue links of an archive index page, in page order.
///
/// Links whose suffix is not a valid date are skipped with a warning.
pub fn parse_archive_index(html: &str) -> Result<Vec<IssueLink>> {
    let document = Html::parse_document(html);
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for href in hrefs(&document, &ISSUE_LINK)? {
        if !seen.insert(href.to_string()) {
            continue;
        }
        let Some(date_text) = date_suffix(href) else {
            log::warn!("Issue link too short for a date: {href}");
            continue;
        };
        match parse_issue_date(date_text) {
            Ok(published) => links.push(IssueLink {
                href: href.to_string(),
                date_text: date_text.to_string(),
                published,
            }),
            Err(e) => log::warn!("Skipping issue link {href}: {e}"),
        }
    }
    Ok(links)
}

/// Extract paper links and the next-page href from one issue page.
pub fn parse_issue_page(html: &str) -> Result<IssuePage> {
    let document = Html::parse_document(html);

    let paper_links = hrefs(&document, &PAPER_LINK)?
        .filter(|href| {
            let ok = paper_id_from_link(href).is_some();
            if !ok {
                log::debug!("Ignoring paper link without id: {href}");
            }
            ok
        })
        .map(str::to_string)
        .collect();

    let next_sel = parse_selector(NEXT_PAGE_CONTROL)?;
    let next_href = match document.select(&next_sel).next() {
        None => None,
        Some(arrow) => {
            let href = arrow
                .parent()
                .and_then(ElementRef::wrap)
                .and_then(|parent| parent.value().attr("href"))
                .ok_or_else(|| AppError::parse("issue page", "next-page control has no link"))?;
            Some(href.to_string())
        }
    };

    Ok(IssuePage {
        paper_links,
        next_href,
    })
}

/// Flat result of crawling every feed.
#[derive(Debug, Default)]
pub struct ArchiveCrawl {
    pub records: Vec<ArchiveRecord>,
    pub feeds_total: usize,
    pub issues_crawled: usize,
    pub failures: Vec<UnitFailure>,
}

/// Walks feed archives past their watermark.
pub struct ArchiveCrawler<'a> {
    fetcher: &'a dyn Fetch,
    base: Url,
    options: BatchOptions,
}

impl<'a> ArchiveCrawler<'a> {
    pub fn new(fetcher: &'a dyn Fetch, base_url: &str, options: BatchOptions) -> Result<Self> {
        Ok(Self {
            fetcher,
            base: Url::parse(base_url)?,
            options,
        })
    }

    pub fn index_url(&self, feed_id: &str) -> String {
        resolve_url(&self.base, &format!("/scripts/nep.pf?list={feed_id}"))
    }

    /// Crawl every feed on the worker pool.
    ///
    /// `watermarks` is a snapshot taken before the batch; workers only read it.
    pub async fn crawl_all(
        &self,
        feed_ids: Vec<String>,
        watermarks: &Watermarks,
    ) -> Result<ArchiveCrawl> {
        let outcome = run_batch("archive", feed_ids, self.options, |feed_id| async move {
            self.crawl_feed(&feed_id, watermarks).await
        })
        .await?;

        let mut crawl = ArchiveCrawl {
            feeds_total: outcome.total,
            failures: outcome.failures,
            ..ArchiveCrawl::default()
        };
        for (issues, records) in outcome.results {
            crawl.issues_crawled += issues;
            crawl.records.extend(records);
        }
        Ok(crawl)
    }

    /// Crawl one feed's issues newer than its watermark.
    ///
    /// Returns the number of issues paged through and their records.
    pub async fn crawl_feed(
        &self,
        feed_id: &str,
        watermarks: &Watermarks,
    ) -> Result<(usize, Vec<ArchiveRecord>)> {
        let html = self.fetcher.fetch_text(&self.index_url(feed_id)).await?;
        let issues = parse_archive_index(&html)?;

        let fresh: Vec<IssueLink> = issues
            .into_iter()
            .filter(|issue| watermarks.admits(feed_id, &issue.date_text))
            .collect();
        log::debug!(
            "{feed_id}: {} new issues after watermark '{}'",
            fresh.len(),
            watermarks.get(feed_id)
        );

        let mut records = Vec::new();
        for issue in &fresh {
            records.extend(self.crawl_issue(feed_id, issue).await?);
        }
        if !records.is_empty() {
            log::info!(
                "{feed_id}: {} papers in {} issues",
                records.len(),
                fresh.len()
            );
        }
        Ok((fresh.len(), records))
    }

    /// Page through one issue until no next-page control remains.
    async fn crawl_issue(&self, feed_id: &str, issue: &IssueLink) -> Result<Vec<ArchiveRecord>> {
        let mut url = format!("{}{}", resolve_url(&self.base, &issue.href), ISSUE_PAGE_SUFFIX);
        let mut visited = HashSet::new();
        let mut records = Vec::new();
        let mut ind_start: u32 = 1;

        loop {
            if !visited.insert(url.clone()) {
                log::warn!("{feed_id}: pagination loops back to {url}, stopping");
                break;
            }

            let html = self.fetcher.fetch_text(&url).await?;
            let page = parse_issue_page(&html)?;

            for (offset, link) in page.paper_links.iter().enumerate() {
                let ind = ind_start + offset as u32;
                records.push(ArchiveRecord::new(
                    link,
                    feed_id,
                    &issue.href,
                    ind,
                    issue.published,
                )?);
            }
            ind_start += page.paper_links.len() as u32;

            match page.next_href {
                Some(href) => url = resolve_url(&self.base, &href),
                None => break,
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FailurePolicy, FeedIssue};
    use crate::testing::{self, BASE, StaticFetcher};
    use std::time::Duration;

    fn options(policy: FailurePolicy) -> BatchOptions {
        BatchOptions {
            concurrency: 10,
            policy,
            delay: Duration::ZERO,
        }
    }

    fn watermark(feed: &str, date: &str) -> Watermarks {
        Watermarks::from_issues(&[FeedIssue::new(feed, parse_issue_date(date).unwrap())])
    }

    #[test]
    fn index_yields_dated_issue_links() {
        let links = parse_archive_index(testing::ABC_INDEX).unwrap();
        let dates: Vec<_> = links.iter().map(|l| l.date_text.as_str()).collect();
        assert_eq!(dates, vec!["2020-01-12", "2020-01-05"]);
        assert_eq!(links[0].href, "/scripts/search.pf?neplist=nep-abc2020-01-12");
    }

    #[test]
    fn index_skips_undated_links() {
        let html = r#"<a href="/scripts/search.pf?neplist=nep-abc">all</a>
                      <a href="/scripts/search.pf?neplist=nep-abc2021-03-01">ok</a>"#;
        let links = parse_archive_index(html).unwrap();
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].date_text, "2021-03-01");
    }

    #[test]
    fn issue_page_finds_papers_and_next_control() {
        let page = parse_issue_page(testing::ABC_0112_PAGE1).unwrap();
        assert_eq!(page.paper_links, vec!["/paper/aaa/p1.htm", "/paper/bbb/p2.htm"]);
        assert_eq!(
            page.next_href.as_deref(),
            Some("/scripts/search.pf?neplist=nep-abc2020-01-12;iframes=no;pg=2")
        );

        let last = parse_issue_page(testing::ABC_0112_PAGE2).unwrap();
        assert_eq!(last.paper_links, vec!["/paper/ccc/p3.htm"]);
        assert_eq!(last.next_href, None);
    }

    #[test]
    fn next_control_without_link_is_a_parse_error() {
        let html = r#"<span><img class="rightarrow" src="/right.png"></span>"#;
        assert!(matches!(
            parse_issue_page(html),
            Err(AppError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn crawls_only_issues_after_watermark() {
        let fetcher = testing::econ_site();
        let crawler = ArchiveCrawler::new(&fetcher, BASE, options(FailurePolicy::FailFast)).unwrap();

        let (issues, records) = crawler
            .crawl_feed("nep-abc", &watermark("nep-abc", "2020-01-05"))
            .await
            .unwrap();

        assert_eq!(issues, 1);
        assert!(fetcher.was_requested(testing::ABC_0112_PAGE1_URL));
        assert!(fetcher.was_requested(testing::ABC_0112_PAGE2_URL));
        assert!(!fetcher.was_requested(testing::ABC_0105_URL));

        let inds: Vec<_> = records.iter().map(|r| r.ind).collect();
        assert_eq!(inds, vec![1, 2, 3]);
        let published = parse_issue_date("2020-01-12").unwrap();
        assert!(records.iter().all(|r| r.published == published));
        assert_eq!(records[2].paper_id, "ccc/p3");
        assert_eq!(records[0].issue_id(), "nep-abc-2020-01-12");
    }

    #[tokio::test]
    async fn empty_watermark_crawls_everything() {
        let fetcher = testing::econ_site();
        let crawler = ArchiveCrawler::new(&fetcher, BASE, options(FailurePolicy::FailFast)).unwrap();

        let (issues, records) = crawler
            .crawl_feed("nep-abc", &Watermarks::default())
            .await
            .unwrap();

        assert_eq!(issues, 2);
        assert_eq!(records.len(), 4);
        assert!(fetcher.was_requested(testing::ABC_0105_URL));
        let old: Vec<_> = records
            .iter()
            .filter(|r| r.issue_id() == "nep-abc-2020-01-05")
            .map(|r| r.ind)
            .collect();
        assert_eq!(old, vec![1]);
    }

    #[tokio::test]
    async fn pagination_loop_is_cut() {
        let url = format!("{BASE}/scripts/search.pf?neplist=nep-loop2020-01-01;iframes=no");
        let fetcher = StaticFetcher::new()
            .with_page(
                format!("{BASE}/scripts/nep.pf?list=nep-loop"),
                r#"<a href="/scripts/search.pf?neplist=nep-loop2020-01-01">i</a>"#,
            )
            .with_page(
                url,
                r#"<a href="/paper/l/1.htm">p</a>
                   <a href="/scripts/search.pf?neplist=nep-loop2020-01-01;iframes=no">
                     <img class="rightarrow" src="/right.png"></a>"#,
            );
        let crawler = ArchiveCrawler::new(&fetcher, BASE, options(FailurePolicy::FailFast)).unwrap();

        let (_, records) = crawler
            .crawl_feed("nep-loop", &Watermarks::default())
            .await
            .unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn crawl_all_uses_per_feed_watermarks() {
        let fetcher = testing::econ_site();
        let crawler = ArchiveCrawler::new(&fetcher, BASE, options(FailurePolicy::Skip)).unwrap();

        let crawl = crawler
            .crawl_all(
                vec!["nep-abc".to_string(), "nep-ban".to_string()],
                &watermark("nep-abc", "2020-01-12"),
            )
            .await
            .unwrap();

        assert_eq!(crawl.feeds_total, 2);
        assert_eq!(crawl.issues_crawled, 1);
        assert!(crawl.failures.is_empty());
        assert!(crawl.records.iter().all(|r| r.feed_id == "nep-ban"));
        assert_eq!(crawl.records.len(), 1);
    }

    #[tokio::test]
    async fn skip_policy_isolates_failing_feed() {
        let fetcher = testing::econ_site();
        let crawler = ArchiveCrawler::new(&fetcher, BASE, options(FailurePolicy::Skip)).unwrap();

        let crawl = crawler
            .crawl_all(
                vec!["nep-gone".to_string(), "nep-ban".to_string()],
                &Watermarks::default(),
            )
            .await
            .unwrap();

        assert_eq!(crawl.failures.len(), 1);
        assert_eq!(crawl.failures[0].unit, "nep-gone");
        assert_eq!(crawl.records.len(), 1);
    }

    #[tokio::test]
    async fn fail_fast_policy_aborts_on_failing_feed() {
        let fetcher = testing::econ_site();
        let crawler = ArchiveCrawler::new(&fetcher, BASE, options(FailurePolicy::FailFast)).unwrap();

        let result = crawler
            .crawl_all(
                vec!["nep-ban".to_string(), "nep-gone".to_string()],
                &Watermarks::default(),
            )
            .await;
        assert!(result.is_err());
    }
}
