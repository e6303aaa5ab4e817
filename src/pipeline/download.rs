//! PDF downloader.
//!
//! Tries a reference's candidate URLs in order and keeps the first response
//! that is really a PDF. HTTP goes through the [`PdfFetcher`] trait so the
//! pipeline can be driven by canned responses in tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::models::{DownloadAttempt, DownloadResult, DownloadStatus, ResolvedReference};
use crate::utils::{find_pdf_link, slugify, HttpClient};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// Longest identifier slug used in file names
const MAX_SLUG_LEN: usize = 80;

/// Why a single URL did not yield a PDF
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    /// Transport failure: timeout, DNS, TLS, connection reset
    #[error("request failed: {0}")]
    Network(String),

    #[error("HTTP status {0}")]
    Status(u16),

    /// The response was not a PDF
    #[error("not a PDF: {0}")]
    InvalidContent(String),

    #[error("response exceeds {limit} bytes")]
    TooLarge { limit: usize },

    /// Writing the file failed
    #[error("write failed: {0}")]
    Io(#[from] std::io::Error),
}

impl DownloadError {
    /// Per-attempt classification reported alongside each tried URL
    pub fn status(&self) -> DownloadStatus {
        match self {
            DownloadError::InvalidContent(_) | DownloadError::TooLarge { .. } => {
                DownloadStatus::InvalidContent
            }
            DownloadError::Network(_) | DownloadError::Status(_) | DownloadError::Io(_) => {
                DownloadStatus::NetworkError
            }
        }
    }
}

/// A fully read HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedResponse {
    /// URL after redirects
    pub final_url: String,
    pub status: u16,
    pub content_type: Option<String>,
    pub body: Vec<u8>,
}

impl FetchedResponse {
    pub fn new(final_url: &str, status: u16, content_type: Option<&str>, body: Vec<u8>) -> Self {
        Self {
            final_url: final_url.to_string(),
            status,
            content_type: content_type.map(str::to_string),
            body,
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Non-empty, and either served as a PDF or carrying the PDF magic bytes
    pub fn looks_like_pdf(&self) -> bool {
        if self.body.is_empty() {
            return false;
        }
        let pdf_type = self
            .content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"));
        pdf_type || self.body.starts_with(PDF_MAGIC)
    }

    pub fn is_html(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("html"))
    }
}

/// Fetches a URL in full.
///
/// Implementations return transport failures as errors; any HTTP status,
/// including 4xx/5xx, is a successful fetch.
#[async_trait]
pub trait PdfFetcher: Send + Sync + std::fmt::Debug {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, DownloadError>;
}

/// [`PdfFetcher`] over HTTP with a browser user agent and a size cap
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: HttpClient,
    max_bytes: usize,
}

impl HttpFetcher {
    pub fn new(timeout: Duration, max_bytes: usize) -> Result<Self, crate::sources::SourceError> {
        Ok(Self {
            client: HttpClient::browser(timeout)?,
            max_bytes,
        })
    }
}

#[async_trait]
impl PdfFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, DownloadError> {
        let mut response = self
            .client
            .get(url)
            .header("Accept", "application/pdf,text/html;q=0.9,*/*;q=0.8")
            .send()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        if response
            .content_length()
            .is_some_and(|len| len as usize > self.max_bytes)
        {
            return Err(DownloadError::TooLarge {
                limit: self.max_bytes,
            });
        }

        let mut body = Vec::new();
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| DownloadError::Network(e.to_string()))?
        {
            if body.len() + chunk.len() > self.max_bytes {
                return Err(DownloadError::TooLarge {
                    limit: self.max_bytes,
                });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(FetchedResponse {
            final_url,
            status,
            content_type,
            body,
        })
    }
}

/// Fetch `url` and return the PDF bytes and the URL they came from.
///
/// An HTML landing page gets one extra hop to the PDF link it advertises.
/// Every URL touched is appended to `attempts`.
pub async fn fetch_pdf(
    fetcher: &dyn PdfFetcher,
    url: &str,
    max_bytes: usize,
    attempts: &mut Vec<DownloadAttempt>,
) -> Result<(String, Vec<u8>), DownloadError> {
    let response = match fetch_checked(fetcher, url, max_bytes).await {
        Ok(response) => response,
        Err(e) => {
            record(attempts, url, &e);
            return Err(e);
        }
    };

    if response.looks_like_pdf() {
        return Ok((response.final_url, response.body));
    }

    let error = DownloadError::InvalidContent(
        response
            .content_type
            .clone()
            .unwrap_or_else(|| "no content type".to_string()),
    );
    record(attempts, url, &error);

    if !response.is_html() {
        return Err(error);
    }

    let html = String::from_utf8_lossy(&response.body);
    let Some(link) = find_pdf_link(&response.final_url, &html) else {
        return Err(error);
    };
    if link == url || link == response.final_url {
        return Err(error);
    }

    debug!(page = url, pdf = %link, "following PDF link from landing page");
    match fetch_checked(fetcher, &link, max_bytes).await {
        Ok(pdf) if pdf.looks_like_pdf() => Ok((pdf.final_url, pdf.body)),
        Ok(other) => {
            let e = DownloadError::InvalidContent(
                other
                    .content_type
                    .unwrap_or_else(|| "no content type".to_string()),
            );
            record(attempts, &link, &e);
            Err(e)
        }
        Err(e) => {
            record(attempts, &link, &e);
            Err(e)
        }
    }
}

async fn fetch_checked(
    fetcher: &dyn PdfFetcher,
    url: &str,
    max_bytes: usize,
) -> Result<FetchedResponse, DownloadError> {
    let response = fetcher.fetch(url).await?;
    if !response.is_success() {
        return Err(DownloadError::Status(response.status));
    }
    if response.body.len() > max_bytes {
        return Err(DownloadError::TooLarge { limit: max_bytes });
    }
    Ok(response)
}

fn record(attempts: &mut Vec<DownloadAttempt>, url: &str, error: &DownloadError) {
    attempts.push(DownloadAttempt {
        url: url.to_string(),
        status: error.status(),
        detail: error.to_string(),
    });
}

/// `{ordinal:03}-{slug}.pdf`, slugged from the identifier or, failing that,
/// from a hash of the URL.
pub fn file_name(ordinal: usize, identifier: Option<&str>, url: &str) -> String {
    let stem = match identifier {
        Some(id) => slugify(id, MAX_SLUG_LEN),
        None => format!("{:x}", md5::compute(url.as_bytes()))[..12].to_string(),
    };
    format!("{:03}-{}.pdf", ordinal, stem)
}

/// Downloads the PDF for a resolved reference
#[derive(Debug, Clone)]
pub struct Downloader {
    fetcher: Arc<dyn PdfFetcher>,
    output_dir: PathBuf,
    max_bytes: usize,
    dry_run: bool,
}

impl Downloader {
    pub fn new(fetcher: Arc<dyn PdfFetcher>, output_dir: impl Into<PathBuf>, max_bytes: usize) -> Self {
        Self {
            fetcher,
            output_dir: output_dir.into(),
            max_bytes,
            dry_run: false,
        }
    }

    /// Resolve only: every result is `Skipped` and nothing is fetched
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub async fn download(&self, reference: &ResolvedReference) -> DownloadResult {
        if self.dry_run {
            return DownloadResult::skipped("dry-run");
        }
        if reference.candidate_urls.is_empty() {
            return DownloadResult::not_found("no candidate URLs", Vec::new());
        }

        let identifier = reference.identifier.as_ref().map(|id| id.as_str());
        let mut attempts = Vec::new();
        let mut last_error = None;

        for url in &reference.candidate_urls {
            let outcome = match fetch_pdf(&*self.fetcher, url, self.max_bytes, &mut attempts).await {
                Ok((source_url, bytes)) => {
                    let path = self
                        .output_dir
                        .join(file_name(reference.ordinal(), identifier, url));
                    match self.write(&path, &bytes).await {
                        Ok(()) => Ok((source_url, path, bytes.len())),
                        Err(e) => Err(e),
                    }
                }
                Err(e) => Err(e),
            };

            match outcome {
                Ok((source_url, path, size)) => {
                    info!(ordinal = reference.ordinal(), path = %path.display(), "downloaded");
                    attempts.push(DownloadAttempt {
                        url: url.clone(),
                        status: DownloadStatus::Downloaded,
                        detail: format!("{} bytes from {}", size, source_url),
                    });
                    return DownloadResult::downloaded(source_url, path, attempts);
                }
                Err(e) => {
                    if let DownloadError::Io(_) = e {
                        record(&mut attempts, url, &e);
                    }
                    debug!(ordinal = reference.ordinal(), url, error = %e, "candidate failed");
                    last_error = Some(e);
                }
            }
        }

        let reason = match last_error {
            Some(e) => format!(
                "all {} candidate URLs failed; last: {} ({})",
                reference.candidate_urls.len(),
                e,
                e.status()
            ),
            None => "no candidate URLs".to_string(),
        };
        warn!(ordinal = reference.ordinal(), reason, "no PDF");
        DownloadResult::not_found(reason, attempts)
    }

    async fn write(&self, path: &Path, bytes: &[u8]) -> Result<(), DownloadError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        tokio::fs::write(path, bytes).await?;
        Ok(())
    }
}
