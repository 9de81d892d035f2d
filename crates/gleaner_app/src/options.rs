use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

/// Optional RON overrides for defaults the command line does not expose.
///
/// Every field is optional; absent fields keep the built-in behavior.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Replaces the default skip-keyword set of the URL filter.
    pub skip_keywords: Option<Vec<String>>,
    /// Replaces the known HTML-masquerade path substrings.
    pub masquerade_paths: Option<Vec<String>>,
    /// Replaces the accepted image content-type set.
    pub accepted_types: Option<Vec<String>>,
    /// Replaces the User-Agent sent with every request.
    pub user_agent: Option<String>,
}

pub fn load_options(path: &Path) -> anyhow::Result<RunOptions> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read options file {}", path.display()))?;
    let options = ron::from_str(&content)
        .with_context(|| format!("failed to parse options file {}", path.display()))?;
    Ok(options)
}
