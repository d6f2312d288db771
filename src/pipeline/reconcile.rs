// src/pipeline/reconcile.rs

//! Relational reconciliation of crawl output.
//!
//! Turns archive records and paper metadata into the normalized tables. Pure:
//! no I/O, so a run's writes are fully determined by its inputs.

use std::collections::HashSet;

use crate::models::{
    ArchiveRecord, Author, Authorship, FeedInclusion, FeedIssue, KeywordCategorization, Paper,
    PaperMeta,
};
use crate::storage::dedup_by_key;

/// Rows for every economics table produced by one run.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Reconciled {
    pub issues: Vec<FeedIssue>,
    pub inclusions: Vec<FeedInclusion>,
    pub papers: Vec<Paper>,
    pub authors: Vec<Author>,
    pub authorships: Vec<Authorship>,
    pub keywords: Vec<KeywordCategorization>,
}

impl Reconciled {
    pub fn build(records: &[ArchiveRecord], metas: &[PaperMeta]) -> Self {
        let (authors, authorships) = explode_authors(metas);
        Self {
            issues: issues_from_records(records),
            inclusions: inclusions_from_records(records),
            papers: papers_from_meta(metas),
            authors,
            authorships,
            keywords: keywords_from_meta(metas),
        }
    }
}

/// Drop every record of an issue that contains one of `failed_links`.
///
/// The whole issue is held back so it stays above the watermark and is
/// crawled again next run. Returns the kept records and the held back issue ids.
pub fn hold_back_failed_issues(
    records: Vec<ArchiveRecord>,
    failed_links: &HashSet<&str>,
) -> (Vec<ArchiveRecord>, Vec<String>) {
    if failed_links.is_empty() {
        return (records, Vec::new());
    }

    let held: Vec<String> = dedup_issue_ids(
        records
            .iter()
            .filter(|r| failed_links.contains(r.link.as_str()))
            .map(ArchiveRecord::issue_id),
    );
    let held_set: HashSet<&str> = held.iter().map(String::as_str).collect();
    let kept = records
        .into_iter()
        .filter(|r| !held_set.contains(r.issue_id().as_str()))
        .collect();
    (kept, held)
}

fn dedup_issue_ids(ids: impl Iterator<Item = String>) -> Vec<String> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(id.clone())).collect()
}

/// One issue per distinct issue id.
pub fn issues_from_records(records: &[ArchiveRecord]) -> Vec<FeedIssue> {
    dedup_by_key(
        records
            .iter()
            .map(|r| FeedIssue::new(&r.feed_id, r.published)),
    )
}

/// One inclusion per distinct (issue id, ordinal).
pub fn inclusions_from_records(records: &[ArchiveRecord]) -> Vec<FeedInclusion> {
    dedup_by_key(records.iter().map(|r| FeedInclusion {
        ind: r.ind,
        issue_id: r.issue_id(),
        paper_id: r.paper_id.clone(),
    }))
}

/// Canonical paper rows, one per paper id.
pub fn papers_from_meta(metas: &[PaperMeta]) -> Vec<Paper> {
    dedup_by_key(metas.iter().map(PaperMeta::to_paper))
}

/// Split each paper's author list into authors and authorship links.
pub fn explode_authors(metas: &[PaperMeta]) -> (Vec<Author>, Vec<Authorship>) {
    let mut authors = Vec::new();
    let mut authorships = Vec::new();

    for meta in metas {
        for name in meta.authors() {
            let author = Author::from_name(name);
            authorships.push(Authorship {
                paper_id: meta.paper_id.clone(),
                author_id: author.id.clone(),
            });
            authors.push(author);
        }
    }

    (dedup_by_key(authors), dedup_by_key(authorships))
}

pub fn keywords_from_meta(metas: &[PaperMeta]) -> Vec<KeywordCategorization> {
    dedup_by_key(metas.iter().flat_map(|meta| {
        meta.keywords()
            .into_iter()
            .map(move |keyword| KeywordCategorization {
                paper_id: meta.paper_id.clone(),
                keyword: keyword.to_string(),
            })
    }))
}
