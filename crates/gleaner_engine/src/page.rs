use thiserror::Error;

use crate::decode::{decode_page, DecodeError, DecodedPage};
use crate::fetch::ReqwestFetcher;

/// Failure to obtain the source page. Fatal to the whole run: without the
/// page there are no candidates to derive.
#[derive(Debug, Error)]
pub enum PageError {
    #[error("{0}")]
    Fetch(crate::FetchError),
    #[error("page served non-HTML content type {content_type}")]
    NotHtml { content_type: String },
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub html: String,
    pub final_url: String,
    pub encoding_label: String,
}

const HTML_TYPES: &[&str] = &["text/html", "application/xhtml+xml"];

/// GET the forum page through the same proxy/TLS/timeout configuration as
/// image fetches and decode it to UTF-8.
pub async fn fetch_page(fetcher: &ReqwestFetcher, url: &str) -> Result<FetchedPage, PageError> {
    let output = fetcher.fetch_document(url).await.map_err(PageError::Fetch)?;

    // A missing header is tolerated; misconfigured forums omit it.
    if let Some(content_type) = output.metadata.content_type.as_deref() {
        let bare = content_type
            .split(';')
            .next()
            .unwrap_or(content_type)
            .trim();
        if !HTML_TYPES.iter().any(|t| t.eq_ignore_ascii_case(bare)) {
            return Err(PageError::NotHtml {
                content_type: bare.to_string(),
            });
        }
    }

    let DecodedPage {
        html,
        encoding_label,
    } = decode_page(&output.body, output.metadata.content_type.as_deref())?;

    Ok(FetchedPage {
        html,
        final_url: output.metadata.final_url,
        encoding_label,
    })
}
