//! Application configuration structures.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// HTTP and crawling behavior settings
    #[serde(default)]
    pub crawler: CrawlerConfig,

    /// Base URLs of the scraped sites
    #[serde(default)]
    pub sources: SourcesConfig,

    /// Table storage location
    #[serde(default)]
    pub storage: StorageConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.crawler.user_agent.trim().is_empty() {
            return Err(AppError::validation("crawler.user_agent is empty"));
        }
        if self.crawler.timeout_secs == 0 {
            return Err(AppError::validation("crawler.timeout_secs must be > 0"));
        }
        if self.crawler.archive_concurrency == 0 {
            return Err(AppError::validation(
                "crawler.archive_concurrency must be > 0",
            ));
        }
        if self.crawler.detail_concurrency == 0 {
            return Err(AppError::validation(
                "crawler.detail_concurrency must be > 0",
            ));
        }
        for (name, value) in [
            ("sources.econpapers_base", &self.sources.econpapers_base),
            ("sources.nep_base", &self.sources.nep_base),
            ("sources.logec_base", &self.sources.logec_base),
            ("sources.listing_url", &self.sources.listing_url),
        ] {
            url::Url::parse(value)
                .map_err(|e| AppError::validation(format!("{name} is not a URL: {e}")))?;
        }
        if self.storage.root.trim().is_empty() {
            return Err(AppError::validation("storage.root is empty"));
        }
        Ok(())
    }
}

/// What a batch stage does when one of its units fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Abort the whole batch on the first failed unit.
    FailFast,
    /// Log the failure, keep the other units, report at the end.
    Skip,
}

/// HTTP client and crawling behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlerConfig {
    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay after each completed unit in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,

    /// Parallel feeds in the archive stage
    #[serde(default = "defaults::archive_concurrency")]
    pub archive_concurrency: usize,

    /// Parallel detail page fetches
    #[serde(default = "defaults::detail_concurrency")]
    pub detail_concurrency: usize,

    /// Retries for transient fetch failures
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Initial backoff, doubled on each retry
    #[serde(default = "defaults::retry_backoff")]
    pub retry_backoff_ms: u64,

    #[serde(default = "defaults::archive_failure_policy")]
    pub archive_failure_policy: FailurePolicy,

    #[serde(default = "defaults::detail_failure_policy")]
    pub detail_failure_policy: FailurePolicy,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
            archive_concurrency: defaults::archive_concurrency(),
            detail_concurrency: defaults::detail_concurrency(),
            max_retries: defaults::max_retries(),
            retry_backoff_ms: defaults::retry_backoff(),
            archive_failure_policy: defaults::archive_failure_policy(),
            detail_failure_policy: defaults::detail_failure_policy(),
        }
    }
}

/// Base URLs for every scraped site.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourcesConfig {
    /// EconPapers host serving archives and paper pages
    #[serde(default = "defaults::econpapers_base")]
    pub econpapers_base: String,

    /// NEP feed directory page
    #[serde(default = "defaults::nep_base")]
    pub nep_base: String,

    /// LogEc host for download statistics links
    #[serde(default = "defaults::logec_base")]
    pub logec_base: String,

    /// Ranked listing front page
    #[serde(default = "defaults::listing_url")]
    pub listing_url: String,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            econpapers_base: defaults::econpapers_base(),
            nep_base: defaults::nep_base(),
            logec_base: defaults::logec_base(),
            listing_url: defaults::listing_url(),
        }
    }
}

/// Table storage settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one JSON file (or partition folder) per table
    #[serde(default = "defaults::storage_root")]
    pub root: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: defaults::storage_root(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `error`, `warn`, `info`, `debug` or `trace`
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use super::FailurePolicy;

    // Crawler defaults
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; paperwatch/0.1)".into()
    }
    pub fn timeout() -> u64 {
        30
    }
    pub fn request_delay() -> u64 {
        0
    }
    pub fn archive_concurrency() -> usize {
        10
    }
    pub fn detail_concurrency() -> usize {
        12
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn retry_backoff() -> u64 {
        500
    }
    pub fn archive_failure_policy() -> FailurePolicy {
        FailurePolicy::Skip
    }
    pub fn detail_failure_policy() -> FailurePolicy {
        FailurePolicy::FailFast
    }

    // Source defaults
    pub fn econpapers_base() -> String {
        "https://econpapers.repec.org".into()
    }
    pub fn nep_base() -> String {
        "http://nep.repec.org/".into()
    }
    pub fn logec_base() -> String {
        "https://logec.repec.org".into()
    }
    pub fn listing_url() -> String {
        "https://news.ycombinator.com/".into()
    }

    pub fn storage_root() -> String {
        "data".into()
    }

    pub fn log_level() -> String {
        "info".into()
    }
}
