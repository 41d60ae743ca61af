//! HTTP client construction and page retrieval.

use crate::core::config::Config;
use crate::core::error::{AppError, Result};
use async_trait::async_trait;
use reqwest::{redirect, Client};
use url::Url;

/// Status, declared content type and (possibly truncated) body of a fetched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    pub status: u16,
    pub content_type: Option<String>,
    pub body: String,
}

impl FetchedPage {
    /// Only pages answered below 400 are worth extracting from.
    pub fn is_success(&self) -> bool {
        self.status < 400
    }

    /// HTML or XHTML, or no declared type at all. PDFs, images and the like
    /// are never scanned.
    pub fn is_html(&self) -> bool {
        match self.content_type.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(value) => {
                let mime = value
                    .split(';')
                    .next()
                    .unwrap_or_default()
                    .trim()
                    .to_ascii_lowercase();
                mime == "text/html" || mime == "application/xhtml+xml"
            }
        }
    }

    /// Whether the body should go through contact extraction.
    pub fn is_extractable(&self) -> bool {
        self.is_success() && self.is_html()
    }
}

/// Retrieves the content of a resolved site.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage>;
}

/// Builds the shared reqwest client: configured user agent, per-request
/// timeout and a redirect cap.
pub(crate) fn build_http_client(config: &Config) -> Result<Client> {
    Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.request_timeout)
        .connect_timeout(config.request_timeout)
        .redirect(redirect::Policy::limited(config.max_redirects))
        .build()
        .map_err(|e| AppError::Initialization(format!("Failed to build HTTP client: {}", e)))
}

/// Maps a transport failure onto `AppError::Unreachable` with a short reason.
pub(crate) fn describe_request_error(url: &str, err: &reqwest::Error) -> AppError {
    let reason = if err.is_timeout() {
        "request timed out".to_string()
    } else if err.is_redirect() {
        "redirect limit exceeded".to_string()
    } else if err.is_connect() {
        format!("connection failed: {}", err)
    } else {
        err.to_string()
    };
    AppError::Unreachable(format!("{}: {}", url, reason))
}

/// `PageFetcher` over reqwest. Reads at most `max_page_bytes` of the body and
/// decodes it lossily, so odd encodings never fail the fetch.
pub struct HttpPageFetcher {
    client: Client,
    max_page_bytes: usize,
}

impl HttpPageFetcher {
    pub fn new(client: Client, max_page_bytes: usize) -> Self {
        Self {
            client,
            max_page_bytes,
        }
    }
}

#[async_trait]
impl PageFetcher for HttpPageFetcher {
    async fn fetch(&self, url: &Url) -> Result<FetchedPage> {
        tracing::debug!(target: "extract_task", "Fetching page {}", url);
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| describe_request_error(url.as_str(), &e))?;

        let status = response.status().as_u16();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        let mut bytes: Vec<u8> = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| describe_request_error(url.as_str(), &e))?
        {
            let remaining = self.max_page_bytes.saturating_sub(bytes.len());
            if chunk.len() >= remaining {
                bytes.extend_from_slice(&chunk[..remaining]);
                tracing::debug!(
                    target: "extract_task",
                    "Truncated body of {} at {} bytes",
                    url,
                    self.max_page_bytes
                );
                break;
            }
            bytes.extend_from_slice(&chunk);
        }

        Ok(FetchedPage {
            status,
            content_type,
            body: String::from_utf8_lossy(&bytes).into_owned(),
        })
    }
}
