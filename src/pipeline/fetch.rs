//! Fetcher: resolve a file reference against the host URL and download it.
//!
//! Downloads stay in memory. pdfium opens documents straight from a byte
//! slice, so nothing is written to disk and nothing outlives the run.
//! There is no retry: one failed request is a failed file.

use crate::error::Pdf2ImageError;
use crate::reference::FileReference;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{info, warn};

/// Check if the input string is an absolute HTTP(S) URL.
pub fn is_url(input: &str) -> bool {
    input.starts_with("http://") || input.starts_with("https://")
}

/// Resolve a possibly host-relative `url` against `base_url`.
///
/// Absolute `http://` / `https://` URLs are returned verbatim. Anything else
/// is appended to `base_url` (trailing slashes removed) with exactly one `/`
/// between them.
pub fn resolve_url(url: &str, base_url: &str) -> String {
    if is_url(url) {
        return url.to_string();
    }
    let base = base_url.trim().trim_end_matches('/');
    let path = url.trim_start_matches('/');
    format!("{base}/{path}")
}

/// Retrieves the raw bytes of one input document.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn download(
        &self,
        file: &FileReference,
        base_url: &str,
    ) -> Result<Vec<u8>, Pdf2ImageError>;
}

/// [`Fetcher`] doing a single HTTP GET with a fixed timeout.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_secs: u64,
}

impl HttpFetcher {
    pub fn new(timeout_secs: u64) -> Result<Self, Pdf2ImageError> {
        if timeout_secs == 0 {
            return Err(Pdf2ImageError::InvalidConfig(
                "Download timeout must be ≥ 1 second".into(),
            ));
        }
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .user_agent(concat!("edgequake-pdf2image/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Pdf2ImageError::Internal(format!("HTTP client: {e}")))?;
        Ok(Self {
            client,
            timeout_secs,
        })
    }

    async fn fetch_bytes(
        &self,
        file: &FileReference,
        url: &str,
    ) -> Result<Vec<u8>, Pdf2ImageError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| self.transport_error(file, url, e))?;

        if !response.status().is_success() {
            return Err(Pdf2ImageError::DownloadFailed {
                filename: file.filename().to_string(),
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(file, url, e))?;

        if bytes.is_empty() {
            return Err(Pdf2ImageError::EmptyDownload {
                filename: file.filename().to_string(),
                url: url.to_string(),
            });
        }
        Ok(bytes.to_vec())
    }

    fn transport_error(
        &self,
        file: &FileReference,
        url: &str,
        e: reqwest::Error,
    ) -> Pdf2ImageError {
        if e.is_timeout() {
            Pdf2ImageError::DownloadTimeout {
                filename: file.filename().to_string(),
                url: url.to_string(),
                secs: self.timeout_secs,
            }
        } else {
            Pdf2ImageError::DownloadFailed {
                filename: file.filename().to_string(),
                url: url.to_string(),
                reason: e.to_string(),
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn download(
        &self,
        file: &FileReference,
        base_url: &str,
    ) -> Result<Vec<u8>, Pdf2ImageError> {
        let url = resolve_url(file.url(), base_url);
        if !is_url(&url) {
            return Err(Pdf2ImageError::DownloadFailed {
                filename: file.filename().to_string(),
                url,
                reason: format!(
                    "relative URL needs an http(s) host_url, got '{}'",
                    base_url.trim()
                ),
            });
        }

        info!("Downloading '{}' from: {}", file.filename(), url);

        let result = self.fetch_bytes(file, &url).await;

        match &result {
            Ok(bytes) => info!("Downloaded {} bytes for '{}'", bytes.len(), file.filename()),
            Err(e) => warn!("{}", e),
        }
        result
    }
}
