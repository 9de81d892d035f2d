use std::path::{Path, PathBuf};

use gleaner_core::{Outcome, Report};
use serde_json::json;

use crate::persist::{write_text_atomic, PersistError};

const REPORT_FILENAME: &str = "report.txt";
const MANIFEST_FILENAME: &str = "manifest.json";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportArtifacts {
    pub report_path: PathBuf,
    pub manifest_path: PathBuf,
}

/// Write the human-readable report and the machine-readable manifest into
/// the output directory, replacing any previous run's artifacts.
pub fn write_report_files(
    dir: &Path,
    report: &Report,
    target_url: &str,
    proxy: Option<&str>,
    timestamp: &str,
) -> Result<ReportArtifacts, PersistError> {
    let text = report.render_text(target_url, proxy, timestamp);
    let report_path = write_text_atomic(dir, REPORT_FILENAME, &text)?;

    let images: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|outcome| match &outcome.outcome {
            Outcome::Stored(stored) => Some(json!({
                "filename": stored.file_name,
                "url": outcome.url,
                "bytes": stored.bytes,
                "width": stored.dimensions.map(|(w, _)| w),
                "height": stored.dimensions.map(|(_, h)| h),
            })),
            _ => None,
        })
        .collect();
    let failures: Vec<_> = report
        .outcomes
        .iter()
        .filter_map(|outcome| match &outcome.outcome {
            Outcome::Skipped(reason) => Some(json!({
                "url": outcome.url,
                "reason": reason.to_string(),
            })),
            Outcome::Failed { category, attempts } => Some(json!({
                "url": outcome.url,
                "reason": category.to_string(),
                "attempts": attempts,
            })),
            Outcome::Stored(_) => None,
        })
        .collect();

    let manifest = json!({
        "generated": timestamp,
        "target": target_url,
        "proxy": proxy,
        "page_failure": report.page_failure,
        "found": report.found,
        "attempted": report.attempted,
        "stored": report.stored,
        "failed": report.failed,
        "success_rate": report.success_rate(),
        "images": images,
        "failures": failures,
    });
    let manifest_text = serde_json::to_string_pretty(&manifest)
        .map_err(|err| PersistError::Io(std::io::Error::other(err)))?;
    let manifest_path = write_text_atomic(dir, MANIFEST_FILENAME, &manifest_text)?;

    Ok(ReportArtifacts {
        report_path,
        manifest_path,
    })
}
