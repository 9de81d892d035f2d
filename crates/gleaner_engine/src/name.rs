use sha2::{Digest, Sha256};
use url::Url;

use crate::validate::ImageKind;

const RECOGNIZED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

/// Propose a file name for a fetched image. Pure and deterministic given
/// (url, format); collision handling against the disk is the store's job.
///
/// The URL's path basename is preferred when it survives sanitization and
/// carries a recognized image extension. Otherwise the name is derived
/// from a hash of the URL, so the same URL always maps to the same name.
pub fn file_name_for(url: &str, format: ImageKind) -> String {
    let basename = Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|segments| segments.last().map(ToOwned::to_owned))
        })
        .unwrap_or_default();

    let sanitized = sanitize(&basename);
    if sanitized.is_empty() || !sanitized.contains('.') {
        return hashed_name(url, format);
    }

    match sanitized.rsplit_once('.') {
        Some((stem, extension))
            if !stem.is_empty()
                && RECOGNIZED_EXTENSIONS
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(extension)) =>
        {
            sanitized
        }
        _ => format!("{}.{}", sanitized.trim_matches('.'), format.extension()),
    }
}

fn sanitize(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .collect()
}

fn hashed_name(url: &str, format: ImageKind) -> String {
    format!("{}.{}", short_hash(url), format.extension())
}

/// Fixed-length hex prefix of the URL's SHA-256.
fn short_hash(input: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let digest = hasher.finalize();
    let mut hex = String::with_capacity(12);
    for byte in digest.iter().take(6) {
        use std::fmt::Write;
        let _ = write!(&mut hex, "{byte:02x}");
    }
    hex
}
