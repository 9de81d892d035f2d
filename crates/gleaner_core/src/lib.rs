//! Gleaner core: pure candidate filtering, proxy parsing and run accounting.
mod filter;
mod proxy;
mod report;

pub use filter::{clean_candidate, domain_tally, filter_candidates, FilterSettings};
pub use proxy::{ProxyAddress, ProxyParseError, ProxyScheme};
pub use report::{
    CandidateUrl, DownloadOutcome, FailureCategory, Outcome, RejectReason, Report, StoredImage,
};
