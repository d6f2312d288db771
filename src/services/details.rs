//! Paper detail enricher.
//!
//! Fetches each paper page and keeps its named `meta` tags plus the optional
//! link to the paper's download statistics.

use regex::Regex;
use scraper::Html;
use url::Url;

use crate::error::Result;
use crate::models::PaperMeta;
use crate::services::batch::{BatchOptions, BatchOutcome, run_batch};
use crate::utils::http::Fetch;
use crate::utils::{parse_selector, resolve_url};

/// Extract [`PaperMeta`] from a detail page reached through `link`.
pub fn parse_detail_page(html: &str, link: &str, stat_pattern: &Regex) -> Result<PaperMeta> {
    let document = Html::parse_document(html);

    let anchor_sel = parse_selector("a[href]")?;
    let stat_link = document
        .select(&anchor_sel)
        .filter_map(|a| a.value().attr("href"))
        .find(|href| stat_pattern.is_match(href))
        .map(str::to_string);

    let meta_sel = parse_selector("meta[name]")?;
    let meta = document.select(&meta_sel).filter_map(|m| {
        let el = m.value();
        let name = el.attr("name").filter(|n| !n.is_empty())?;
        let content = el.attr("content").unwrap_or_default();
        Some((name.to_string(), content.to_string()))
    });

    PaperMeta::new(link, stat_link, meta)
}

/// Fetches detail pages for a batch of paper links.
pub struct DetailEnricher<'a> {
    fetcher: &'a dyn Fetch,
    base: Url,
    stat_pattern: Regex,
    options: BatchOptions,
}

impl<'a> DetailEnricher<'a> {
    pub fn new(
        fetcher: &'a dyn Fetch,
        base_url: &str,
        stat_base: &str,
        options: BatchOptions,
    ) -> Result<Self> {
        let stat_base = stat_base.trim_end_matches('/');
        let stat_pattern = Regex::new(&format!(
            "{}/scripts/paperstat\\.pf",
            regex::escape(stat_base)
        ))
        .map_err(|e| crate::error::AppError::config(format!("bad statistics base: {e}")))?;

        Ok(Self {
            fetcher,
            base: Url::parse(base_url)?,
            stat_pattern,
            options,
        })
    }

    /// Enrich every link; an empty set returns without fetching anything.
    pub async fn enrich(&self, links: Vec<String>) -> Result<BatchOutcome<PaperMeta>> {
        if links.is_empty() {
            log::info!("No new papers to enrich");
            return Ok(BatchOutcome::empty());
        }

        log::info!("Fetching {} paper detail pages", links.len());
        run_batch("details", links, self.options, |link| async move {
            self.fetch_one(&link).await
        })
        .await
    }

    async fn fetch_one(&self, link: &str) -> Result<PaperMeta> {
        let html = self.fetcher.fetch_text(&resolve_url(&self.base, link)).await?;
        parse_detail_page(&html, link, &self.stat_pattern)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::FailurePolicy;
    use crate::testing::{self, BASE, STAT_BASE, StaticFetcher};
    use std::time::Duration;

    fn enricher(fetcher: &StaticFetcher, policy: FailurePolicy) -> DetailEnricher<'_> {
        DetailEnricher::new(
            fetcher,
            BASE,
            STAT_BASE,
            BatchOptions {
                concurrency: 12,
                policy,
                delay: Duration::ZERO,
            },
        )
        .unwrap()
    }

    #[test]
    fn parses_meta_and_stat_link() {
        let pattern = Regex::new(r"https://logec\.test/scripts/paperstat\.pf").unwrap();
        let meta = parse_detail_page(testing::P1_DETAIL, "/paper/aaa/p1.htm", &pattern).unwrap();

        assert_eq!(meta.paper_id, "aaa/p1");
        assert_eq!(meta.field("title"), Some("Paper One"));
        assert_eq!(meta.field("institution"), Some("Alpha Institute"));
        assert_eq!(meta.authors(), vec!["Smith, John", "Doe, Jane"]);
        assert_eq!(
            meta.stat_link.as_deref(),
            Some("https://logec.test/scripts/paperstat.pf?h=repec:aaa:p1")
        );
        assert!(!meta.fields.contains_key(""));
    }

    #[test]
    fn stat_link_is_optional() {
        let pattern = Regex::new(r"https://logec\.test/scripts/paperstat\.pf").unwrap();
        let meta = parse_detail_page(
            r#"<meta name="citation_title" content="T"><a href="/other">x</a>"#,
            "/paper/x/y.htm",
            &pattern,
        )
        .unwrap();
        assert_eq!(meta.stat_link, None);
    }

    #[tokio::test]
    async fn empty_link_set_fetches_nothing() {
        let fetcher = StaticFetcher::new();
        let outcome = enricher(&fetcher, FailurePolicy::FailFast)
            .enrich(Vec::new())
            .await
            .unwrap();

        assert_eq!(outcome.total, 0);
        assert!(fetcher.requests().is_empty());
    }

    #[tokio::test]
    async fn enriches_each_link() {
        let fetcher = testing::econ_site();
        let outcome = enricher(&fetcher, FailurePolicy::FailFast)
            .enrich(vec![
                "/paper/aaa/p1.htm".to_string(),
                "/paper/bbb/p2.htm".to_string(),
            ])
            .await
            .unwrap();

        let ids: Vec<_> = outcome.results.iter().map(|m| m.paper_id.as_str()).collect();
        assert_eq!(ids, vec!["aaa/p1", "bbb/p2"]);
        assert!(fetcher.was_requested(&format!("{BASE}/paper/aaa/p1.htm")));
    }

    #[tokio::test]
    async fn one_missing_page_fails_the_batch() {
        let fetcher = testing::econ_site();
        let result = enricher(&fetcher, FailurePolicy::FailFast)
            .enrich(vec![
                "/paper/aaa/p1.htm".to_string(),
                "/paper/zzz/missing.htm".to_string(),
            ])
            .await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn skip_policy_reports_missing_page() {
        let fetcher = testing::econ_site();
        let outcome = enricher(&fetcher, FailurePolicy::Skip)
            .enrich(vec![
                "/paper/aaa/p1.htm".to_string(),
                "/paper/zzz/missing.htm".to_string(),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 1);
        assert_eq!(outcome.failures[0].unit, "/paper/zzz/missing.htm");
    }
}
