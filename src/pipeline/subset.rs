// src/pipeline/subset.rs

//! Reduced dataset export.
//!
//! Keeps only prolific authors and the papers they wrote, so downstream
//! consumers can work with a small but connected slice of the tables.

use std::collections::{HashMap, HashSet};

use crate::error::{AppError, Result};
use crate::models::{
    Author, Authorship, Feed, FeedInclusion, FeedIssue, KeywordCategorization, Paper,
};
use crate::storage::{TableStorage, WriteMetadata};

/// Subset selection parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubsetParams {
    /// Authors need at least this many authorships to be kept
    pub min_papers_per_author: usize,
    /// Abstracts are cut to this many characters
    pub abstract_chars: usize,
}

impl Default for SubsetParams {
    fn default() -> Self {
        Self {
            min_papers_per_author: 2,
            abstract_chars: 2000,
        }
    }
}

/// Every table of the economics dataset.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Dataset {
    pub feeds: Vec<Feed>,
    pub issues: Vec<FeedIssue>,
    pub inclusions: Vec<FeedInclusion>,
    pub papers: Vec<Paper>,
    pub authors: Vec<Author>,
    pub authorships: Vec<Authorship>,
    pub keywords: Vec<KeywordCategorization>,
}

impl Dataset {
    pub async fn read<S: TableStorage>(storage: &S) -> Result<Self> {
        Ok(Self {
            feeds: storage.read_table().await?,
            issues: storage.read_table().await?,
            inclusions: storage.read_table().await?,
            papers: storage.read_table().await?,
            authors: storage.read_table().await?,
            authorships: storage.read_table().await?,
            keywords: storage.read_table().await?,
        })
    }

    /// Overwrite every table of `storage` with this dataset.
    pub async fn write<S: TableStorage>(&self, storage: &S) -> Result<Vec<WriteMetadata>> {
        Ok(vec![
            storage.overwrite(&self.feeds).await?,
            storage.overwrite(&self.issues).await?,
            storage.overwrite(&self.inclusions).await?,
            storage.overwrite(&self.papers).await?,
            storage.overwrite(&self.authors).await?,
            storage.overwrite(&self.authorships).await?,
            storage.overwrite(&self.keywords).await?,
        ])
    }
}

fn truncate_chars(text: &str, max: usize) -> String {
    text.chars().take(max).collect()
}

/// Derive the reduced dataset. Feeds and issues are carried over whole.
pub fn select_subset(full: &Dataset, params: SubsetParams) -> Dataset {
    let mut papers_per_author: HashMap<&str, usize> = HashMap::new();
    for authorship in &full.authorships {
        *papers_per_author
            .entry(authorship.author_id.as_str())
            .or_default() += 1;
    }

    let authorships: Vec<Authorship> = full
        .authorships
        .iter()
        .filter(|a| papers_per_author[a.author_id.as_str()] >= params.min_papers_per_author)
        .cloned()
        .collect();

    let paper_ids: HashSet<&str> = authorships.iter().map(|a| a.paper_id.as_str()).collect();
    let author_ids: HashSet<&str> = authorships.iter().map(|a| a.author_id.as_str()).collect();

    let papers = full
        .papers
        .iter()
        .filter(|p| paper_ids.contains(p.id.as_str()))
        .map(|p| Paper {
            abstract_text: p
                .abstract_text
                .as_deref()
                .map(|text| truncate_chars(text, params.abstract_chars)),
            ..p.clone()
        })
        .collect();

    Dataset {
        feeds: full.feeds.clone(),
        issues: full.issues.clone(),
        inclusions: full
            .inclusions
            .iter()
            .filter(|i| paper_ids.contains(i.paper_id.as_str()))
            .cloned()
            .collect(),
        papers,
        authors: full
            .authors
            .iter()
            .filter(|a| author_ids.contains(a.id.as_str()))
            .cloned()
            .collect(),
        keywords: full
            .keywords
            .iter()
            .filter(|k| paper_ids.contains(k.paper_id.as_str()))
            .cloned()
            .collect(),
        authorships,
    }
}

/// Read the full dataset from `source` and write its subset to `target`.
pub async fn run_subset<S: TableStorage, T: TableStorage>(
    source: &S,
    target: &T,
    params: SubsetParams,
) -> Result<Vec<WriteMetadata>> {
    if params.min_papers_per_author == 0 {
        return Err(AppError::validation(
            "min_papers_per_author must be at least 1",
        ));
    }

    let full = Dataset::read(source).await?;
    if full.papers.is_empty() {
        log::warn!("Source holds no papers, the subset will be empty");
    }

    let subset = select_subset(&full, params);
    log::info!(
        "Subset keeps {}/{} papers and {}/{} authors",
        subset.papers.len(),
        full.papers.len(),
        subset.authors.len(),
        full.authors.len()
    );
    subset.write(target).await
}
