use std::fmt;
use std::path::PathBuf;

/// A URL that survived filtering and is eligible for a fetch attempt.
///
/// `index` is the discovery position within the filtered list and orders
/// the final report regardless of completion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateUrl {
    pub index: usize,
    pub url: String,
}

/// An image written to disk: unique path at creation time, never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    pub file_name: String,
    pub path: PathBuf,
    pub bytes: u64,
    pub dimensions: Option<(u32, u32)>,
}

/// Content properties that disqualify a response. Never retried.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    ContentType { content_type: String },
    TooSmall { bytes: u64, min_bytes: u64 },
    TooSmallDimensions { width: u32, height: u32 },
    UndecodableImage,
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::ContentType { content_type } => {
                write!(f, "not an image ({content_type})")
            }
            RejectReason::TooSmall { bytes, min_bytes } => {
                write!(f, "too small ({bytes} bytes, minimum {min_bytes})")
            }
            RejectReason::TooSmallDimensions { width, height } => {
                write!(f, "dimensions too small ({width}x{height})")
            }
            RejectReason::UndecodableImage => write!(f, "image data could not be decoded"),
        }
    }
}

/// Report-facing label for a terminal transport or filesystem failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureCategory {
    Network,
    Timeout,
    HttpStatus(u16),
    RateLimited,
    ResponseTooLarge,
    InvalidUrl,
    Filesystem,
    WorkerPanic,
    NotAttempted,
}

impl fmt::Display for FailureCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureCategory::Network => write!(f, "network error"),
            FailureCategory::Timeout => write!(f, "timeout"),
            FailureCategory::HttpStatus(code) => write!(f, "http status {code}"),
            FailureCategory::RateLimited => write!(f, "rate limited"),
            FailureCategory::ResponseTooLarge => write!(f, "response too large"),
            FailureCategory::InvalidUrl => write!(f, "invalid url"),
            FailureCategory::Filesystem => write!(f, "filesystem error"),
            FailureCategory::WorkerPanic => write!(f, "internal worker error"),
            FailureCategory::NotAttempted => write!(f, "not attempted"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Stored(StoredImage),
    Skipped(RejectReason),
    Failed {
        category: FailureCategory,
        attempts: u32,
    },
}

/// Terminal per-URL record. Produced exactly once per dispatched candidate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOutcome {
    pub index: usize,
    pub url: String,
    pub outcome: Outcome,
}

/// Aggregate accounting for one run.
///
/// The one-to-one invariant holds by construction: `outcomes.len()` equals
/// the number of candidates dispatched (`attempted`), sorted by discovery
/// index with no loss and no duplication.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub found: usize,
    pub attempted: usize,
    pub stored: usize,
    pub failed: usize,
    pub outcomes: Vec<DownloadOutcome>,
    pub page_failure: Option<String>,
}

impl Report {
    pub fn from_outcomes(found: usize, mut outcomes: Vec<DownloadOutcome>) -> Self {
        outcomes.sort_by_key(|outcome| outcome.index);
        let attempted = outcomes.len();
        let stored = outcomes
            .iter()
            .filter(|o| matches!(o.outcome, Outcome::Stored(_)))
            .count();
        Self {
            found,
            attempted,
            stored,
            failed: attempted - stored,
            outcomes,
            page_failure: None,
        }
    }

    /// The run never derived any candidates because the source page itself
    /// could not be fetched.
    pub fn failed_run(reason: impl Into<String>) -> Self {
        Self {
            found: 0,
            attempted: 0,
            stored: 0,
            failed: 0,
            outcomes: Vec::new(),
            page_failure: Some(reason.into()),
        }
    }

    /// Stored percentage of attempted, 0.0 when nothing was attempted.
    pub fn success_rate(&self) -> f64 {
        if self.attempted == 0 {
            return 0.0;
        }
        self.stored as f64 / self.attempted as f64 * 100.0
    }

    /// File names of stored images in discovery order.
    pub fn stored_files(&self) -> Vec<&str> {
        self.outcomes
            .iter()
            .filter_map(|outcome| match &outcome.outcome {
                Outcome::Stored(stored) => Some(stored.file_name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Plain key/value summary plus a numbered list of stored files, the
    /// shape downstream tooling persists as a text artifact.
    pub fn render_text(&self, target_url: &str, proxy: Option<&str>, timestamp: &str) -> String {
        let mut text = String::new();
        text.push_str(&format!("generated: {timestamp}\n"));
        text.push_str(&format!("target: {target_url}\n"));
        if let Some(proxy) = proxy {
            text.push_str(&format!("proxy: {proxy}\n"));
        }
        if let Some(reason) = &self.page_failure {
            text.push_str(&format!("page_fetch: failed ({reason})\n"));
        }
        text.push_str(&format!("found: {}\n", self.found));
        text.push_str(&format!("attempted: {}\n", self.attempted));
        text.push_str(&format!("stored: {}\n", self.stored));
        text.push_str(&format!("failed: {}\n", self.failed));
        text.push_str(&format!("success_rate: {:.1}%\n", self.success_rate()));

        let stored = self.stored_files();
        if !stored.is_empty() {
            text.push('\n');
            text.push_str("stored files:\n");
            for (position, name) in stored.iter().enumerate() {
                text.push_str(&format!("{}. {}\n", position + 1, name));
            }
        }
        text
    }
}
