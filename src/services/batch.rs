//! Bounded worker pool shared by the crawl stages.
//!
//! Units run concurrently up to a fixed limit; each returns its own result and
//! nothing is shared between them. The caller gets every result once the whole
//! batch is done.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use futures::stream::{self, StreamExt};

use crate::error::{AppError, Result};
use crate::models::FailurePolicy;

/// A unit that failed under [`FailurePolicy::Skip`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFailure {
    pub unit: String,
    pub error: String,
}

/// Results of one batch, in unit order.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub results: Vec<T>,
    pub total: usize,
    pub failures: Vec<UnitFailure>,
}

impl<T> BatchOutcome<T> {
    pub fn empty() -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            failures: Vec::new(),
        }
    }

    pub fn succeeded(&self) -> usize {
        self.total - self.failures.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Settings for one batch stage.
#[derive(Debug, Clone, Copy)]
pub struct BatchOptions {
    pub concurrency: usize,
    pub policy: FailurePolicy,
    /// Pause after each finished unit
    pub delay: Duration,
}

/// Run `work` over every unit with bounded concurrency.
///
/// Under `FailFast` the first error drops the in-flight units and is returned
/// as [`AppError::Crawl`] naming the stage and unit.
pub async fn run_batch<U, T, F, Fut>(
    stage: &str,
    units: Vec<U>,
    options: BatchOptions,
    work: F,
) -> Result<BatchOutcome<T>>
where
    U: fmt::Display,
    F: Fn(U) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let total = units.len();
    let mut outcome = BatchOutcome {
        results: Vec::with_capacity(total),
        total,
        failures: Vec::new(),
    };

    let mut results = stream::iter(units)
        .map(|unit| {
            let label = unit.to_string();
            let fut = work(unit);
            async move { (label, fut.await) }
        })
        .buffered(options.concurrency.max(1));

    let mut done = 0;
    while let Some((label, result)) = results.next().await {
        done += 1;
        match result {
            Ok(value) => outcome.results.push(value),
            Err(error) => match options.policy {
                FailurePolicy::FailFast => {
                    log::error!("{stage}: {label} failed, aborting batch: {error}");
                    return Err(AppError::crawl(format!("{stage} {label}"), error));
                }
                FailurePolicy::Skip => {
                    log::warn!("{stage}: skipping {label}: {error}");
                    outcome.failures.push(UnitFailure {
                        unit: label,
                        error: error.to_string(),
                    });
                }
            },
        }
        log::debug!("{stage}: {done}/{total} done");

        if !options.delay.is_zero() {
            tokio::time::sleep(options.delay).await;
        }
    }

    Ok(outcome)
}
