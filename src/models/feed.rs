//! Feed directory entries.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::storage::Record;

/// A topical NEP channel that publishes dated issues.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Feed {
    /// Feed identifier (e.g. `nep-ban`)
    pub id: String,

    /// Short title, the text before the first comma of the directory blurb
    pub title: String,

    /// Remaining free text of the blurb
    pub description: String,
}

impl Feed {
    /// Build a feed from its id and the raw `"title, description"` blurb.
    pub fn from_blurb(id: &str, blurb: &str) -> Result<Self> {
        let id = id.trim();
        if id.is_empty() {
            return Err(AppError::validation("feed id is empty"));
        }

        let title = blurb.split(',').next().unwrap_or_default().trim();
        let description = blurb
            .split(", ")
            .skip(1)
            .collect::<Vec<_>>()
            .join(", ")
            .trim()
            .to_string();

        Ok(Self {
            id: id.to_string(),
            title: title.to_string(),
            description,
        })
    }
}

impl Record for Feed {
    const TABLE: &'static str = "feeds";
    type Key = String;

    fn key(&self) -> String {
        self.id.clone()
    }
}
