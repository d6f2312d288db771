// src/utils/http.rs

//! HTTP client utilities.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::CrawlerConfig;

/// Source of page bodies.
///
/// Crawlers only ever ask for the text behind a URL, so tests can swap the
/// network for canned pages.
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch_text(&self, url: &str) -> Result<String>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Delay before retry number `attempt` (1-based), doubling each time.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(1 << attempt.saturating_sub(1).min(16))
}

/// Call `op` until it succeeds, fails with a non-transient error, or has been
/// retried `max_retries` times.
pub async fn retry_with_backoff<T, F, Fut>(
    label: &str,
    max_retries: u32,
    backoff: Duration,
    mut op: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_retries => {
                attempt += 1;
                let delay = backoff_delay(backoff, attempt);
                log::warn!(
                    "Transient error fetching {} (attempt {}/{}), retrying in {:?}: {}",
                    label,
                    attempt,
                    max_retries,
                    delay,
                    e
                );
                tokio::time::sleep(delay).await;
            }
            Err(e) => return Err(e),
        }
    }
}

/// `reqwest` fetcher with bounded retries for transient failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    max_retries: u32,
    backoff: Duration,
}

impl HttpFetcher {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
            max_retries: config.max_retries,
            backoff: Duration::from_millis(config.retry_backoff_ms),
        })
    }

    async fn get_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(AppError::status(url, status.as_u16()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String> {
        retry_with_backoff(url, self.max_retries, self.backoff, || self.get_once(url)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    const BASE: Duration = Duration::from_millis(100);

    #[test]
    fn backoff_doubles_per_attempt() {
        assert_eq!(backoff_delay(BASE, 1), Duration::from_millis(100));
        assert_eq!(backoff_delay(BASE, 2), Duration::from_millis(200));
        assert_eq!(backoff_delay(BASE, 3), Duration::from_millis(400));
    }

    #[tokio::test(start_paused = true)]
    async fn transient_errors_are_retried_up_to_the_limit() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = retry_with_backoff("https://a.test/", 3, BASE, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::status("https://a.test/", 503))
        })
        .await;

        assert!(matches!(result, Err(AppError::Status { status: 503, .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn permanent_errors_fail_at_once() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = retry_with_backoff("https://a.test/", 3, BASE, move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(AppError::status("https://a.test/", 404))
        })
        .await;

        assert!(result.is_err());
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_retrying_after_success() {
        let counter = AtomicU32::new(0);
        let calls = &counter;
        let started = tokio::time::Instant::now();

        let body = retry_with_backoff("https://a.test/", 5, BASE, move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(AppError::status("https://a.test/", 429))
            } else {
                Ok("ok".to_string())
            }
        })
        .await
        .unwrap();

        assert_eq!(body, "ok");
        assert_eq!(counter.load(Ordering::SeqCst), 3);
        let waited = started.elapsed();
        assert!(waited >= Duration::from_millis(300) && waited < Duration::from_millis(400));
    }

    #[tokio::test]
    async fn static_fetcher_records_requests() {
        let fetcher =
            crate::testing::StaticFetcher::new().with_page("https://a.test/", "<html></html>");

        assert!(fetcher.fetch_text("https://a.test/").await.is_ok());
        assert!(fetcher.fetch_text("https://a.test/missing").await.is_err());
        assert_eq!(
            fetcher.requests(),
            vec!["https://a.test/", "https://a.test/missing"]
        );
    }
}
