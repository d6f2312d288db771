// src/pipeline/validate.rs

use std::path::Path;

use crate::error::Result;
use crate::models::Config;

/// Load the config file at `path` and check its values.
///
/// Unlike the crawl commands, a missing or unreadable file is an error here.
pub fn run_validate(path: &Path) -> Result<Config> {
    log::info!("Validating configuration at {}", path.display());

    let config = Config::load(path).and_then(|config| {
        config.validate()?;
        Ok(config)
    });

    match config {
        Ok(config) => {
            log::info!("✓ Config OK");
            log::info!("    User agent: {}", config.crawler.user_agent);
            log::info!("    Timeout: {}s", config.crawler.timeout_secs);
            log::info!(
                "    Archive workers: {} ({:?})",
                config.crawler.archive_concurrency,
                config.crawler.archive_failure_policy
            );
            log::info!(
                "    Detail workers: {} ({:?})",
                config.crawler.detail_concurrency,
                config.crawler.detail_failure_policy
            );
            log::info!("    Storage root: {}", config.storage.root);
            Ok(config)
        }
        Err(e) => {
            log::error!("Config validation failed: {e}");
            Err(e)
        }
    }
}
