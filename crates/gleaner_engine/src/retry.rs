use std::time::Duration;

use engine_logging::{engine_debug, engine_error, engine_info};
use gleaner_core::{CandidateUrl, DownloadOutcome, FailureCategory, Outcome, StoredImage};
use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::fetch::Fetcher;
use crate::name::file_name_for;
use crate::persist::ImageStore;
use crate::validate::{validate, ValidationSettings};
use crate::FailureKind;

#[derive(Debug, Clone)]
pub struct RetrySettings {
    pub max_attempts: u32,
    /// Standard inter-attempt backoff; the wait is `backoff_base * attempt`,
    /// so it grows monotonically.
    pub backoff_base: Duration,
    /// Extended cooldown window for 403/429, sampled uniformly.
    pub cooldown_min: Duration,
    pub cooldown_max: Duration,
    /// Politeness delay before every attempt, sampled uniformly.
    pub delay_min: Duration,
    pub delay_max: Duration,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_secs(2),
            cooldown_min: Duration::from_secs(5),
            cooldown_max: Duration::from_secs(10),
            delay_min: Duration::from_millis(500),
            delay_max: Duration::from_millis(1500),
        }
    }
}

/// Run one candidate through fetch -> validate -> name -> store until it
/// succeeds, is rejected, or retries are exhausted.
///
/// Only transport-layer failures are retried. A validation rejection is a
/// property of the content, so the first one is terminal; retrying would
/// fetch the same bytes again. Cancellation is honored between attempts,
/// never in the middle of one.
pub async fn download_one(
    fetcher: &dyn Fetcher,
    store: &ImageStore,
    candidate: &CandidateUrl,
    referer: &str,
    validation: &ValidationSettings,
    retry: &RetrySettings,
    cancel: &CancellationToken,
) -> DownloadOutcome {
    let mut last_failure: Option<FailureKind> = None;
    let mut attempts = 0u32;

    while attempts < retry.max_attempts {
        if !pause(sample_between(retry.delay_min, retry.delay_max), cancel).await {
            break;
        }
        attempts += 1;

        let output = match fetcher.fetch(&candidate.url, referer).await {
            Ok(output) => output,
            Err(err) => {
                engine_debug!(
                    "attempt {}/{} for {} failed: {}",
                    attempts,
                    retry.max_attempts,
                    candidate.url,
                    err
                );
                let kind = err.kind;
                last_failure = Some(kind);
                if !kind.is_transient() {
                    break;
                }
                if attempts < retry.max_attempts {
                    let wait = match kind {
                        FailureKind::RateLimited(_) => {
                            sample_between(retry.cooldown_min, retry.cooldown_max)
                        }
                        _ => retry.backoff_base * attempts,
                    };
                    if !pause(wait, cancel).await {
                        break;
                    }
                }
                continue;
            }
        };

        let content_type = output.metadata.content_type.clone();
        let image = match validate(output.body, content_type.as_deref(), validation) {
            Ok(image) => image,
            Err(reason) => {
                engine_debug!("rejected {}: {}", candidate.url, reason);
                return finish(candidate, Outcome::Skipped(reason));
            }
        };

        let proposed = file_name_for(&candidate.url, image.format);
        return match store.store(&image.body, &proposed) {
            Ok((file_name, path)) => {
                engine_info!(
                    "stored {} as {} ({} bytes)",
                    candidate.url,
                    file_name,
                    image.body.len()
                );
                finish(
                    candidate,
                    Outcome::Stored(StoredImage {
                        file_name,
                        path,
                        bytes: image.body.len() as u64,
                        dimensions: image.dimensions,
                    }),
                )
            }
            Err(err) => {
                engine_error!("failed to store {}: {}", candidate.url, err);
                finish(
                    candidate,
                    Outcome::Failed {
                        category: FailureCategory::Filesystem,
                        attempts,
                    },
                )
            }
        };
    }

    let category = last_failure
        .map(FailureKind::category)
        .unwrap_or(FailureCategory::NotAttempted);
    finish(candidate, Outcome::Failed { category, attempts })
}

fn finish(candidate: &CandidateUrl, outcome: Outcome) -> DownloadOutcome {
    DownloadOutcome {
        index: candidate.index,
        url: candidate.url.clone(),
        outcome,
    }
}

/// Sleep unless cancelled first; returns false when the run is stopping.
async fn pause(duration: Duration, cancel: &CancellationToken) -> bool {
    if cancel.is_cancelled() {
        return false;
    }
    if duration.is_zero() {
        return true;
    }
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(duration) => true,
    }
}

fn sample_between(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rand::rng().random_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}
