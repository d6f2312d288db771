//! Papers, authors and the records derived from paper detail pages.

use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::storage::Record;

static PAPER_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"/paper/(.*)\.htm").expect("paper id pattern"));

/// Meta name fragments dropped when normalizing keys.
const META_PREFIXES: [&str; 2] = ["citation_", "technical_report_"];

/// Separator of multi-valued meta fields (authors, keywords).
pub const LIST_SEPARATOR: &str = "; ";

/// Derive the stable paper id from a paper link.
///
/// `/paper/fipfedgfe/2020-01.htm` becomes `fipfedgfe/2020-01`.
pub fn paper_id_from_link(link: &str) -> Option<String> {
    PAPER_ID
        .captures(link)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Derive the stable author id from a raw author name.
///
/// Lower-cases the name and turns the `"Last, First"` separator into `:`.
pub fn author_id(name: &str) -> String {
    name.to_lowercase().replace(", ", ":")
}

/// Strip the citation and technical report fragments from a meta name.
pub fn normalize_meta_key(name: &str) -> String {
    META_PREFIXES
        .iter()
        .fold(name.to_string(), |key, prefix| key.replace(prefix, ""))
}

/// Split a `"; "`-delimited meta value, dropping blank entries.
pub fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    raw.parse::<i32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|y| y.is_finite()).map(|y| y as i32))
}

/// Metadata scraped from one paper detail page.
#[derive(Debug, Clone, PartialEq)]
pub struct PaperMeta {
    pub paper_id: String,
    pub link: String,
    /// Download statistics page, when the detail page links one
    pub stat_link: Option<String>,
    /// Normalized meta name to content
    pub fields: BTreeMap<String, String>,
}

impl PaperMeta {
    /// Build from raw `(name, content)` meta pairs; later duplicates win.
    pub fn new(
        link: &str,
        stat_link: Option<String>,
        meta: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let paper_id = paper_id_from_link(link)
            .ok_or_else(|| AppError::validation(format!("no paper id in link '{link}'")))?;
        let fields = meta
            .into_iter()
            .map(|(name, content)| (normalize_meta_key(&name), content))
            .collect();

        Ok(Self {
            paper_id,
            link: link.to_string(),
            stat_link,
            fields,
        })
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.trim().is_empty())
    }

    pub fn authors(&self) -> Vec<&str> {
        self.field("authors").map(|v| split_list(v).collect()).unwrap_or_default()
    }

    pub fn keywords(&self) -> Vec<&str> {
        self.field("keywords").map(|v| split_list(v).collect()).unwrap_or_default()
    }

    /// Project onto the canonical paper columns.
    pub fn to_paper(&self) -> Paper {
        Paper {
            id: self.paper_id.clone(),
            link: self.link.clone(),
            year: self.field("year").and_then(parse_year),
            abstract_text: self.field("abstract").map(str::to_string),
            title: self.field("title").unwrap_or_default().trim().to_string(),
            institution: self.field("institution").map(str::to_string),
        }
    }
}

/// A working paper.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Paper {
    pub id: String,
    pub link: String,
    pub year: Option<i32>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub title: String,
    pub institution: Option<String>,
}

impl Record for Paper {
    const TABLE: &'static str = "papers";
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Author {
    pub id: String,
    pub name: String,
}

impl Author {
    pub fn from_name(name: &str) -> Self {
        Self {
            id: author_id(name),
            name: name.to_string(),
        }
    }
}

impl Record for Author {
    const TABLE: &'static str = "authors";
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}

/// Paper to author junction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Authorship {
    pub paper_id: String,
    pub author_id: String,
}

impl Record for Authorship {
    const TABLE: &'static str = "authorships";
    type Key = (String, String);

    fn key(&self) -> (String, String) {
        (self.paper_id.clone(), self.author_id.clone())
    }
}

/// Paper to keyword junction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeywordCategorization {
    pub paper_id: String,
    pub keyword: String,
}

impl Record for KeywordCategorization {
    const TABLE: &'static str = "keyword_categorizations";
    type Key = (String, String);

    fn key(&self) -> (String, String) {
        (self.paper_id.clone(), self.keyword.clone())
    }
}
