use std::fmt;

use bytes::Bytes;
use gleaner_core::FailureCategory;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchOutput {
    pub body: Bytes,
    pub metadata: FetchMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchMetadata {
    pub original_url: String,
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub byte_len: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchError {
    pub kind: FailureKind,
    pub message: String,
}

impl FetchError {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl std::error::Error for FetchError {}

/// Transport-layer failure classification.
///
/// `RateLimited` is split out from the other status failures because the
/// retry policy waits an extended cooldown for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    RateLimited(u16),
    Timeout,
    Network,
    TooLarge { max_bytes: u64 },
}

impl FailureKind {
    /// Whether another attempt could plausibly succeed. Transport faults
    /// and server status codes are transient; a bad URL or an oversized
    /// body is a property of the target and never retried.
    pub fn is_transient(self) -> bool {
        match self {
            FailureKind::HttpStatus(_)
            | FailureKind::RateLimited(_)
            | FailureKind::Timeout
            | FailureKind::Network => true,
            FailureKind::InvalidUrl | FailureKind::TooLarge { .. } => false,
        }
    }

    pub fn category(self) -> FailureCategory {
        match self {
            FailureKind::InvalidUrl => FailureCategory::InvalidUrl,
            FailureKind::HttpStatus(code) => FailureCategory::HttpStatus(code),
            FailureKind::RateLimited(_) => FailureCategory::RateLimited,
            FailureKind::Timeout => FailureCategory::Timeout,
            FailureKind::Network => FailureCategory::Network,
            FailureKind::TooLarge { .. } => FailureCategory::ResponseTooLarge,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::RateLimited(code) => write!(f, "rate limited (http status {code})"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::TooLarge { max_bytes } => {
                write!(f, "response larger than {max_bytes} bytes")
            }
        }
    }
}
