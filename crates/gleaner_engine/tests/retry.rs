use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use bytes::Bytes;
use gleaner_core::{CandidateUrl, FailureCategory, Outcome, RejectReason};
use gleaner_engine::{
    download_one, FailureKind, FetchError, FetchMetadata, FetchOutput, Fetcher, ImageStore,
    RetrySettings, ValidationSettings,
};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

const URL: &str = "https://img.example.com/pic.jpg";
const REFERER: &str = "https://forum.example.com/thread/1";

/// Fails `failures` times with `failure`, then succeeds with `body`.
struct ScriptedFetcher {
    calls: AtomicU32,
    failures: u32,
    failure: FailureKind,
    body: Vec<u8>,
    content_type: &'static str,
}

impl ScriptedFetcher {
    fn failing(failures: u32, failure: FailureKind) -> Self {
        Self {
            calls: AtomicU32::new(0),
            failures,
            failure,
            body: vec![0xABu8; 5000],
            content_type: "image/jpeg",
        }
    }

    fn serving(body: Vec<u8>, content_type: &'static str) -> Self {
        Self {
            calls: AtomicU32::new(0),
            failures: 0,
            failure: FailureKind::Network,
            body,
            content_type,
        }
    }

    fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Fetcher for ScriptedFetcher {
    async fn fetch(&self, url: &str, _referer: &str) -> Result<FetchOutput, FetchError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if call < self.failures {
            return Err(FetchError::new(self.failure, "scripted failure"));
        }
        Ok(FetchOutput {
            body: Bytes::from(self.body.clone()),
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url: url.to_string(),
                status: 200,
                content_type: Some(self.content_type.to_string()),
                byte_len: self.body.len() as u64,
            },
        })
    }
}

fn candidate() -> CandidateUrl {
    CandidateUrl {
        index: 0,
        url: URL.to_string(),
    }
}

fn instant_retry(max_attempts: u32) -> RetrySettings {
    RetrySettings {
        max_attempts,
        backoff_base: Duration::ZERO,
        cooldown_min: Duration::ZERO,
        cooldown_max: Duration::ZERO,
        delay_min: Duration::ZERO,
        delay_max: Duration::ZERO,
    }
}

fn lenient_validation() -> ValidationSettings {
    ValidationSettings {
        min_bytes: 10,
        ..ValidationSettings::default()
    }
}

#[tokio::test]
async fn validation_rejection_is_terminal_after_one_fetch() {
    let temp = TempDir::new().unwrap();
    let store = ImageStore::create(temp.path().to_path_buf()).unwrap();
    // Every response is 16 bytes; the validator demands 1024.
    let fetcher = ScriptedFetcher::serving(vec![0u8; 16], "image/jpeg");
    let validation = ValidationSettings {
        min_bytes: 1024,
        ..ValidationSettings::default()
    };

    let outcome = download_one(
        &fetcher,
        &store,
        &candidate(),
        REFERER,
        &validation,
        &instant_retry(3),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        outcome.outcome,
        Outcome::Skipped(RejectReason::TooSmall {
            bytes: 16,
            min_bytes: 1024
        })
    );
}

#[tokio::test]
async fn transport_failures_retry_up_to_success() {
    let temp = TempDir::new().unwrap();
    let store = ImageStore::create(temp.path().to_path_buf()).unwrap();
    let fetcher = ScriptedFetcher::failing(2, FailureKind::Network);

    let outcome = download_one(
        &fetcher,
        &store,
        &candidate(),
        REFERER,
        &lenient_validation(),
        &instant_retry(3),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(fetcher.calls(), 3);
    let Outcome::Stored(stored) = outcome.outcome else {
        panic!("expected stored outcome, got {:?}", outcome.outcome);
    };
    assert_eq!(stored.file_name, "pic.jpg");
    assert!(stored.path.exists());
}

#[tokio::test]
async fn exhausted_retries_report_the_last_failure() {
    let temp = TempDir::new().unwrap();
    let store = ImageStore::create(temp.path().to_path_buf()).unwrap();
    let fetcher = ScriptedFetcher::failing(u32::MAX, FailureKind::Timeout);

    let outcome = download_one(
        &fetcher,
        &store,
        &candidate(),
        REFERER,
        &lenient_validation(),
        &instant_retry(3),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(fetcher.calls(), 3);
    assert_eq!(
        outcome.outcome,
        Outcome::Failed {
            category: FailureCategory::Timeout,
            attempts: 3
        }
    );
}

#[tokio::test(start_paused = true)]
async fn rate_limiting_waits_the_extended_cooldown() {
    let temp = TempDir::new().unwrap();
    let store = ImageStore::create(temp.path().to_path_buf()).unwrap();
    let fetcher = ScriptedFetcher::failing(u32::MAX, FailureKind::RateLimited(429));
    let retry = RetrySettings {
        max_attempts: 3,
        cooldown_min: Duration::from_secs(5),
        cooldown_max: Duration::from_secs(5),
        ..instant_retry(3)
    };

    let started = tokio::time::Instant::now();
    let outcome = download_one(
        &fetcher,
        &store,
        &candidate(),
        REFERER,
        &lenient_validation(),
        &retry,
        &CancellationToken::new(),
    )
    .await;

    // Two cooldown windows separate three attempts.
    assert!(started.elapsed() >= Duration::from_secs(10));
    assert_eq!(fetcher.calls(), 3);
    assert_eq!(
        outcome.outcome,
        Outcome::Failed {
            category: FailureCategory::RateLimited,
            attempts: 3
        }
    );
}

#[tokio::test(start_paused = true)]
async fn standard_backoff_grows_with_the_attempt_number() {
    let temp = TempDir::new().unwrap();
    let store = ImageStore::create(temp.path().to_path_buf()).unwrap();
    let fetcher = ScriptedFetcher::failing(u32::MAX, FailureKind::Network);
    let retry = RetrySettings {
        max_attempts: 3,
        backoff_base: Duration::from_secs(2),
        ..instant_retry(3)
    };

    let started = tokio::time::Instant::now();
    download_one(
        &fetcher,
        &store,
        &candidate(),
        REFERER,
        &lenient_validation(),
        &retry,
        &CancellationToken::new(),
    )
    .await;

    // 2s after the first attempt, 4s after the second.
    assert!(started.elapsed() >= Duration::from_secs(6));
}

#[tokio::test]
async fn oversized_responses_are_not_retried() {
    let temp = TempDir::new().unwrap();
    let store = ImageStore::create(temp.path().to_path_buf()).unwrap();
    let fetcher = ScriptedFetcher::failing(
        u32::MAX,
        FailureKind::TooLarge {
            max_bytes: 1024,
        },
    );

    let outcome = download_one(
        &fetcher,
        &store,
        &candidate(),
        REFERER,
        &lenient_validation(),
        &instant_retry(3),
        &CancellationToken::new(),
    )
    .await;

    assert_eq!(fetcher.calls(), 1);
    assert_eq!(
        outcome.outcome,
        Outcome::Failed {
            category: FailureCategory::ResponseTooLarge,
            attempts: 1
        }
    );
}

#[tokio::test]
async fn a_cancelled_run_never_fetches() {
    let temp = TempDir::new().unwrap();
    let store = ImageStore::create(temp.path().to_path_buf()).unwrap();
    let fetcher = ScriptedFetcher::serving(vec![0xABu8; 5000], "image/jpeg");
    let cancel = CancellationToken::new();
    cancel.cancel();

    let outcome = download_one(
        &fetcher,
        &store,
        &candidate(),
        REFERER,
        &lenient_validation(),
        &instant_retry(3),
        &cancel,
    )
    .await;

    assert_eq!(fetcher.calls(), 0);
    assert_eq!(
        outcome.outcome,
        Outcome::Failed {
            category: FailureCategory::NotAttempted,
            attempts: 0
        }
    );
}
