use std::collections::HashMap;
use std::sync::Arc;

use engine_logging::{engine_error, engine_info};
use gleaner_core::{CandidateUrl, DownloadOutcome, FailureCategory, Outcome, Report};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::fetch::Fetcher;
use crate::persist::ImageStore;
use crate::retry::{download_one, RetrySettings};
use crate::validate::ValidationSettings;

#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Upper bound on concurrently running fetch pipelines.
    pub concurrency: usize,
    /// Cap on candidates dispatched, applied before scheduling.
    pub max_images: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            concurrency: 4,
            max_images: 50,
        }
    }
}

/// Bounded-concurrency scheduler for the download pipeline.
///
/// Every dispatched candidate produces exactly one outcome: completions
/// are drained by the single consumer in [`Orchestrator::run`], and a
/// worker that dies mid-flight is mapped back to its candidate and
/// recorded as a failure rather than aborting its siblings.
pub struct Orchestrator {
    fetcher: Arc<dyn Fetcher>,
    store: Arc<ImageStore>,
    validation: ValidationSettings,
    retry: RetrySettings,
    settings: OrchestratorSettings,
    cancel: CancellationToken,
}

impl Orchestrator {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        store: Arc<ImageStore>,
        validation: ValidationSettings,
        retry: RetrySettings,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            fetcher,
            store,
            validation,
            retry,
            settings,
            cancel: CancellationToken::new(),
        }
    }

    /// Token for wiring an external stop signal (Ctrl-C). Workers finish
    /// their current attempt before standing down.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub async fn run(&self, candidates: Vec<CandidateUrl>, referer: &str) -> Report {
        let found = candidates.len();
        let dispatch: Vec<CandidateUrl> = candidates
            .into_iter()
            .take(self.settings.max_images)
            .collect();
        let total = dispatch.len();
        if total < found {
            engine_info!("dispatching {total} of {found} candidates (cap reached)");
        }

        let semaphore = Arc::new(Semaphore::new(self.settings.concurrency.max(1)));
        let referer: Arc<str> = referer.into();
        let mut workers = JoinSet::new();
        let mut dispatched: HashMap<tokio::task::Id, (usize, String)> = HashMap::new();

        for candidate in dispatch {
            let semaphore = semaphore.clone();
            let fetcher = self.fetcher.clone();
            let store = self.store.clone();
            let validation = self.validation.clone();
            let retry = self.retry.clone();
            let referer = referer.clone();
            let cancel = self.cancel.clone();
            let key = (candidate.index, candidate.url.clone());

            let handle = workers.spawn(async move {
                let _permit = match semaphore.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(_) => {
                        // The semaphore is never closed while workers run.
                        return DownloadOutcome {
                            index: candidate.index,
                            url: candidate.url,
                            outcome: Outcome::Failed {
                                category: FailureCategory::NotAttempted,
                                attempts: 0,
                            },
                        };
                    }
                };
                download_one(
                    fetcher.as_ref(),
                    &store,
                    &candidate,
                    &referer,
                    &validation,
                    &retry,
                    &cancel,
                )
                .await
            });
            dispatched.insert(handle.id(), key);
        }

        let mut outcomes = Vec::with_capacity(total);
        while let Some(joined) = workers.join_next_with_id().await {
            match joined {
                Ok((id, outcome)) => {
                    dispatched.remove(&id);
                    outcomes.push(outcome);
                }
                Err(err) => {
                    // A panicked worker costs its own URL, nothing else.
                    let Some((index, url)) = dispatched.remove(&err.id()) else {
                        continue;
                    };
                    engine_error!("worker for {url} died: {err}");
                    outcomes.push(DownloadOutcome {
                        index,
                        url,
                        outcome: Outcome::Failed {
                            category: FailureCategory::WorkerPanic,
                            attempts: 0,
                        },
                    });
                }
            }
            if outcomes.len() % 5 == 0 || outcomes.len() == total {
                engine_info!("progress: {}/{}", outcomes.len(), total);
            }
        }

        Report::from_outcomes(found, outcomes)
    }
}
