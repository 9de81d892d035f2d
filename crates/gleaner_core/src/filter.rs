use std::collections::HashMap;
use std::collections::HashSet;

use url::Url;

use crate::report::CandidateUrl;

/// Rules applied to raw extracted URLs before any network work happens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterSettings {
    /// Case-insensitive substrings that mark thumbnails, icons and ad assets.
    pub skip_keywords: Vec<String>,
    /// Exact substrings of paths known to serve HTML behind an image extension.
    pub masquerade_paths: Vec<String>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            skip_keywords: [
                "thumb", "avatar", "icon", "logo", "smiley", "attach", "adblock",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
            masquerade_paths: vec!["23img.com/l/".to_string()],
        }
    }
}

/// Strip the query string and any surrounding quote characters.
///
/// Forum markup frequently embeds URLs with tracking queries and leftover
/// quoting from sloppy attribute extraction; both are irrelevant for
/// identifying the underlying image.
pub fn clean_candidate(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches(['\'', '"']);
    match trimmed.split_once('?') {
        Some((before, _)) => before.to_string(),
        None => trimmed.to_string(),
    }
}

/// Reduce raw extracted strings to an ordered, deduplicated candidate list.
///
/// Discovery order is preserved and the first occurrence of a duplicate
/// wins. The function is pure and idempotent: filtering an already-filtered
/// list returns it unchanged.
pub fn filter_candidates(raw_urls: &[String], settings: &FilterSettings) -> Vec<CandidateUrl> {
    let mut seen = HashSet::new();
    let mut candidates = Vec::new();

    for raw in raw_urls {
        let cleaned = clean_candidate(raw);
        if !accepts(&cleaned, settings) {
            continue;
        }
        if seen.insert(cleaned.clone()) {
            candidates.push(CandidateUrl {
                index: candidates.len(),
                url: cleaned,
            });
        }
    }

    candidates
}

fn accepts(cleaned: &str, settings: &FilterSettings) -> bool {
    if cleaned.starts_with("data:") {
        return false;
    }
    if !cleaned.starts_with("http://") && !cleaned.starts_with("https://") {
        return false;
    }
    let lower = cleaned.to_ascii_lowercase();
    if settings
        .skip_keywords
        .iter()
        .any(|word| lower.contains(word.as_str()))
    {
        return false;
    }
    if settings
        .masquerade_paths
        .iter()
        .any(|path| cleaned.contains(path.as_str()))
    {
        return false;
    }
    true
}

/// Per-host frequency of the candidate list, most frequent first.
///
/// Reporting nicety only; ties are broken by host name so the order is
/// stable across runs.
pub fn domain_tally(candidates: &[CandidateUrl]) -> Vec<(String, usize)> {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for candidate in candidates {
        if let Ok(parsed) = Url::parse(&candidate.url) {
            if let Some(host) = parsed.host_str() {
                *counts.entry(host.to_string()).or_default() += 1;
            }
        }
    }
    let mut tally: Vec<_> = counts.into_iter().collect();
    tally.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    tally
}
