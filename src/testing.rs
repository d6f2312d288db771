//! Canned pages and an in-memory fetcher for tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::utils::http::Fetch;

pub const BASE: &str = "https://econ.test";
pub const NEP_URL: &str = "http://nep.test/";
pub const STAT_BASE: &str = "https://logec.test";
pub const LISTING_URL: &str = "https://news.test/";

/// Serves fixed bodies by exact URL and records every request.
#[derive(Default)]
pub struct StaticFetcher {
    pages: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.pages.insert(url.into(), body.into());
        self
    }

    pub fn without_page(mut self, url: &str) -> Self {
        self.pages.remove(url);
        self
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn was_requested(&self, url: &str) -> bool {
        self.requests.lock().unwrap().iter().any(|u| u == url)
    }
}

#[async_trait]
impl Fetch for StaticFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap().push(url.to_string());
        self.pages
            .get(url)
            .cloned()
            .ok_or_else(|| AppError::crawl(url, "404 Not Found"))
    }
}

pub const DIRECTORY: &str = r#"
    <html><body>
      <div class="nitpo_antem">
        <span>1</span><span> nep-abc </span>
        <span>Alphabet Economics, edited by A. Person, Some Place</span>
      </div>
      <div class="nitpo_antem">
        <span>2</span><span>nep-ban</span><span>Banking, edited by B. Person</span>
      </div>
      <div class="nitpo_antem"><span>broken</span></div>
      <div class="nitpo_antem">
        <span>3</span><span>nep-abc</span><span>Duplicate, ignored</span>
      </div>
    </body></html>
"#;

pub const ABC_INDEX_URL: &str = "https://econ.test/scripts/nep.pf?list=nep-abc";
pub const ABC_INDEX: &str = r#"
    <html><body>
      <a href="/scripts/search.pf?neplist=nep-abc2020-01-12">2020-01-12</a>
      <a href="/scripts/search.pf?neplist=nep-abc2020-01-05">2020-01-05</a>
      <a href="/about.htm">About</a>
    </body></html>
"#;

pub const ABC_0112_PAGE1_URL: &str =
    "https://econ.test/scripts/search.pf?neplist=nep-abc2020-01-12;iframes=no";
pub const ABC_0112_PAGE1: &str = r#"
    <html><body>
      <a href="/paper/aaa/p1.htm">Paper One</a>
      <a href="/paper/bbb/p2.htm">Paper Two</a>
      <a href="/scripts/search.pf?neplist=nep-abc2020-01-12;iframes=no;pg=2">
        <img class="rightarrow" src="/right.png" alt="next">
      </a>
    </body></html>
"#;

pub const ABC_0112_PAGE2_URL: &str =
    "https://econ.test/scripts/search.pf?neplist=nep-abc2020-01-12;iframes=no;pg=2";
pub const ABC_0112_PAGE2: &str = r#"
    <html><body>
      <a href="/scripts/search.pf?neplist=nep-abc2020-01-12;iframes=no">
        <img class="leftarrow" src="/left.png" alt="previous">
      </a>
      <a href="/paper/ccc/p3.htm">Paper Three</a>
    </body></html>
"#;

pub const ABC_0105_URL: &str =
    "https://econ.test/scripts/search.pf?neplist=nep-abc2020-01-05;iframes=no";
pub const ABC_0105: &str = r#"
    <html><body><a href="/paper/ddd/p4.htm">Paper Four</a></body></html>
"#;

pub const BAN_INDEX_URL: &str = "https://econ.test/scripts/nep.pf?list=nep-ban";
pub const BAN_INDEX: &str = r#"
    <html><body>
      <a href="/scripts/search.pf?neplist=nep-ban2020-01-12">2020-01-12</a>
    </body></html>
"#;

pub const BAN_0112_URL: &str =
    "https://econ.test/scripts/search.pf?neplist=nep-ban2020-01-12;iframes=no";
pub const BAN_0112: &str = r#"
    <html><body><a href="/paper/aaa/p1.htm">Paper One</a></body></html>
"#;

pub const P1_DETAIL: &str = r#"
    <html><head>
      <meta name="citation_title" content="Paper One">
      <meta name="citation_authors" content="Smith, John; Doe, Jane">
      <meta name="citation_year" content="2020">
      <meta name="citation_abstract" content="About one.">
      <meta name="citation_technical_report_institution" content="Alpha Institute">
      <meta name="citation_keywords" content="banking; credit">
      <meta name="" content="ignored">
      <meta charset="utf-8">
    </head><body>
      <a href="https://logec.test/scripts/paperstat.pf?h=repec:aaa:p1">Statistics</a>
    </body></html>
"#;

pub const P2_DETAIL: &str = r#"
    <html><head>
      <meta name="citation_title" content="Paper Two">
      <meta name="citation_authors" content="Doe, Jane">
      <meta name="citation_year" content="2019">
    </head><body></body></html>
"#;

pub const P3_DETAIL: &str = r#"
    <html><head>
      <meta name="citation_title" content="Paper Three">
      <meta name="citation_authors" content="Roe, Richard; Smith, John">
    </head><body></body></html>
"#;

pub const P4_DETAIL: &str = r#"
    <html><head>
      <meta name="citation_title" content="Paper Four">
      <meta name="citation_authors" content="Poe, Edgar">
    </head><body></body></html>
"#;

/// The whole economics site: directory, two feeds, their issues and papers.
pub fn econ_site() -> StaticFetcher {
    StaticFetcher::new()
        .with_page(NEP_URL, DIRECTORY)
        .with_page(ABC_INDEX_URL, ABC_INDEX)
        .with_page(ABC_0112_PAGE1_URL, ABC_0112_PAGE1)
        .with_page(ABC_0112_PAGE2_URL, ABC_0112_PAGE2)
        .with_page(ABC_0105_URL, ABC_0105)
        .with_page(BAN_INDEX_URL, BAN_INDEX)
        .with_page(BAN_0112_URL, BAN_0112)
        .with_page(format!("{BASE}/paper/aaa/p1.htm"), P1_DETAIL)
        .with_page(format!("{BASE}/paper/bbb/p2.htm"), P2_DETAIL)
        .with_page(format!("{BASE}/paper/ccc/p3.htm"), P3_DETAIL)
        .with_page(format!("{BASE}/paper/ddd/p4.htm"), P4_DETAIL)
}

pub const LISTING: &str = r#"
    <html><body><table>
      <tr class="athing" id="1001">
        <td><span class="rank">1.</span></td>
        <td><span class="titleline"><a href="https://thing.example/">Show: A thing</a>
          <span class="sitebit comhead"> (<a href="from?site=thing.example"><span>thing.example</span></a>)</span>
        </span></td>
      </tr>
      <tr><td class="subtext">
        <span class="score" id="score_1001">120 points</span> by
        <a href="user?id=alice" class="hnuser">alice</a>
        <span class="age" title="2024-05-01T08:00:00"><a href="item?id=1001">3 hours ago</a></span> |
        <a href="hide?id=1001">hide</a> |
        <a href="item?id=1001">45&nbsp;comments</a>
      </td></tr>
      <tr class="spacer"></tr>

      <tr class="athing" id="1002">
        <td><span class="rank">2.</span></td>
        <td><a class="titlelink" href="https://acme.example/jobs">Acme is hiring</a></td>
      </tr>
      <tr><td class="subtext">
        <span class="age" title="2024-05-01T07:00:00"><a href="item?id=1002">4 hours ago</a></span>
      </td></tr>
      <tr class="spacer"></tr>

      <tr class="athing" id="1003">
        <td><span class="rank">3.</span></td>
        <td><span class="titleline"><a href="item?id=1003">Ask: Anything?</a></span></td>
      </tr>
      <tr><td class="subtext">
        <span class="score" id="score_1003">1 point</span> by
        <a href="user?id=bob" class="hnuser">bob</a>
        <span class="age" title="2024-05-01T09:00:00"><a href="item?id=1003">1 hour ago</a></span> |
        <a href="item?id=1003">discuss</a>
      </td></tr>
      <tr class="spacer"></tr>

      <tr class="athing" id="1004">
        <td></td>
        <td><span class="titleline"><a href="https://norank.example/">No rank</a></span></td>
      </tr>
      <tr><td class="subtext"></td></tr>
    </table></body></html>
"#;
