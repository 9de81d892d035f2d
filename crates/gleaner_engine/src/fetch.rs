use std::time::Duration;

use futures_util::StreamExt;
use gleaner_core::ProxyAddress;
use reqwest::header::{HeaderValue, ACCEPT, CONTENT_TYPE, REFERER};

use crate::{FetchError, FetchMetadata, FetchOutput, FailureKind};

const IMAGE_ACCEPT: &str = "image/webp,image/apng,image/*,*/*;q=0.8";
const DOCUMENT_ACCEPT: &str =
    "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct FetchSettings {
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
    pub max_bytes: u64,
    pub proxy: Option<ProxyAddress>,
    pub user_agent: String,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(15),
            max_bytes: 50 * 1024 * 1024,
            proxy: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// The single seam the retry pipeline and orchestrator depend on.
#[async_trait::async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str, referer: &str) -> Result<FetchOutput, FetchError>;
}

pub struct ReqwestFetcher {
    client: reqwest::Client,
    settings: FetchSettings,
}

impl ReqwestFetcher {
    /// Build the HTTP client once; the typed proxy address is applied here
    /// and never re-parsed afterwards.
    ///
    /// Certificate validation is disabled on purpose: the image hosts this
    /// tool is pointed at routinely present expired or mismatched
    /// certificates, and a transport that refuses them downloads nothing.
    pub fn new(settings: FetchSettings) -> Result<Self, FetchError> {
        let mut builder = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .danger_accept_invalid_certs(true)
            .user_agent(settings.user_agent.clone());

        if let Some(proxy) = &settings.proxy {
            let proxy = reqwest::Proxy::all(proxy.to_string())
                .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|err| FetchError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, settings })
    }

    /// GET a document (the forum page itself) with a browser-shaped Accept
    /// header and no referer.
    pub async fn fetch_document(&self, url: &str) -> Result<FetchOutput, FetchError> {
        self.get(url, DOCUMENT_ACCEPT, None).await
    }

    async fn get(
        &self,
        url: &str,
        accept: &'static str,
        referer: Option<&str>,
    ) -> Result<FetchOutput, FetchError> {
        let parsed = reqwest::Url::parse(url)
            .map_err(|err| FetchError::new(FailureKind::InvalidUrl, err.to_string()))?;

        let mut request = self
            .client
            .get(parsed)
            .header(ACCEPT, HeaderValue::from_static(accept));
        if let Some(referer) = referer {
            if let Ok(value) = HeaderValue::from_str(referer) {
                request = request.header(REFERER, value);
            }
        }

        let response = request.send().await.map_err(map_reqwest_error)?;

        let status = response.status().as_u16();
        if status != 200 {
            let kind = if status == 403 || status == 429 {
                FailureKind::RateLimited(status)
            } else {
                FailureKind::HttpStatus(status)
            };
            return Err(FetchError::new(kind, format!("http status {status}")));
        }

        if let Some(content_len) = response.content_length() {
            if content_len > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                    },
                    format!("declared length {content_len}"),
                ));
            }
        }

        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());

        let mut body = Vec::new();
        let mut stream = response.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(map_reqwest_error)?;
            if body.len() as u64 + chunk.len() as u64 > self.settings.max_bytes {
                return Err(FetchError::new(
                    FailureKind::TooLarge {
                        max_bytes: self.settings.max_bytes,
                    },
                    "body exceeded size ceiling mid-stream",
                ));
            }
            body.extend_from_slice(&chunk);
        }

        let byte_len = body.len() as u64;
        Ok(FetchOutput {
            body: body.into(),
            metadata: FetchMetadata {
                original_url: url.to_string(),
                final_url,
                status,
                content_type,
                byte_len,
            },
        })
    }
}

#[async_trait::async_trait]
impl Fetcher for ReqwestFetcher {
    async fn fetch(&self, url: &str, referer: &str) -> Result<FetchOutput, FetchError> {
        self.get(url, IMAGE_ACCEPT, Some(referer)).await
    }
}

fn map_reqwest_error(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        return FetchError::new(FailureKind::Timeout, err.to_string());
    }
    FetchError::new(FailureKind::Network, err.to_string())
}
