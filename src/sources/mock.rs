//! Mock source and fetcher for testing purposes.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::models::{ResolutionCandidate, ResolveQuery};
use crate::pipeline::{DownloadError, FetchedResponse, PdfFetcher};
use crate::sources::{Source, SourceCapabilities, SourceError};

/// A mock source that returns predefined candidates and counts its calls.
#[derive(Debug)]
pub struct MockSource {
    id: String,
    candidates: Vec<ResolutionCandidate>,
    open_access: Option<String>,
    failing: bool,
    calls: AtomicUsize,
}

impl MockSource {
    /// Create a resolver with the given ID that finds nothing.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            candidates: Vec::new(),
            open_access: None,
            failing: false,
            calls: AtomicUsize::new(0),
        }
    }

    /// Candidates returned from every `resolve` call.
    pub fn with_candidates(mut self, candidates: Vec<ResolutionCandidate>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Turn this into an open-access source answering with `url`.
    pub fn with_open_access(mut self, url: impl Into<String>) -> Self {
        self.open_access = Some(url.into());
        self
    }

    /// Fail every call with a network error.
    pub fn failing(mut self) -> Self {
        self.failing = true;
        self
    }

    /// Number of `resolve` / `open_access_url` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Source for MockSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        "Mock Source"
    }

    fn capabilities(&self) -> SourceCapabilities {
        if self.open_access.is_some() {
            SourceCapabilities::OPEN_ACCESS
        } else {
            SourceCapabilities::RESOLVE
        }
    }

    async fn resolve(&self, _query: &ResolveQuery) -> Result<Vec<ResolutionCandidate>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(SourceError::Network("mock failure".to_string()));
        }
        Ok(self.candidates.clone())
    }

    async fn open_access_url(&self, _doi: &str) -> Result<Option<String>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing {
            return Err(SourceError::Network("mock failure".to_string()));
        }
        Ok(self.open_access.clone())
    }
}

/// A fetcher serving canned responses by URL; unknown URLs fail like a refused connection.
#[derive(Debug, Default)]
pub struct MockFetcher {
    responses: HashMap<String, FetchedResponse>,
    requested: Mutex<Vec<String>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve a response for `url`.
    pub fn with_response(mut self, url: impl Into<String>, response: FetchedResponse) -> Self {
        let url = url.into();
        self.responses.insert(url, response);
        self
    }

    /// Serve a PDF body for `url`.
    pub fn with_pdf(self, url: impl Into<String>, body: &[u8]) -> Self {
        let url = url.into();
        let response = FetchedResponse::new(&url, 200, Some("application/pdf"), body.to_vec());
        self.with_response(url, response)
    }

    /// Serve an HTML page for `url`.
    pub fn with_html(self, url: impl Into<String>, html: &str) -> Self {
        let url = url.into();
        let response = FetchedResponse::new(
            &url,
            200,
            Some("text/html; charset=utf-8"),
            html.as_bytes().to_vec(),
        );
        self.with_response(url, response)
    }

    /// Answer `url` with an empty body and the given status.
    pub fn with_status(self, url: impl Into<String>, status: u16) -> Self {
        let url = url.into();
        let response = FetchedResponse::new(&url, status, None, Vec::new());
        self.with_response(url, response)
    }

    /// URLs fetched so far, in request order.
    pub fn requested(&self) -> Vec<String> {
        self.requested
            .lock()
            .map(|urls| urls.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.requested().len()
    }
}

#[async_trait]
impl PdfFetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, DownloadError> {
        if let Ok(mut requested) = self.requested.lock() {
            requested.push(url.to_string());
        }
        self.responses
            .get(url)
            .cloned()
            .ok_or_else(|| DownloadError::Network(format!("connection refused: {}", url)))
    }
}
