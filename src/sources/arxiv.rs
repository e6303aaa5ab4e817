//! arXiv resolver.
//!
//! Only runs for references whose arXiv ID is already known from extraction.
//! The ID is confirmed through the Atom API (`id_list=`), which also gives
//! the title and, for published versions, the journal DOI.

use async_trait::async_trait;
use feed_rs::parser;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{CandidateSource, FullTextLink, ResolutionCandidate, ResolveQuery};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{is_valid_arxiv_id, normalize_arxiv_id, normalize_doi, HttpClient};

/// Base URL for arXiv API
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";
/// Base URL for arXiv PDFs
pub const ARXIV_PDF_URL: &str = "https://arxiv.org/pdf";

/// arXiv resolver
#[derive(Debug, Clone)]
pub struct ArxivSource {
    client: Arc<HttpClient>,
    api_url: String,
}

impl ArxivSource {
    pub fn new(client: Arc<HttpClient>) -> Self {
        Self {
            client,
            api_url: ARXIV_API_URL.to_string(),
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    /// PDF location for an arXiv ID
    pub fn pdf_url(arxiv_id: &str) -> String {
        format!("{}/{}", ARXIV_PDF_URL, arxiv_id)
    }

    async fn fetch_feed(&self, arxiv_id: &str) -> Result<feed_rs::model::Feed, SourceError> {
        let url = format!("{}?id_list={}", self.api_url, urlencoding::encode(arxiv_id));
        debug!(url, "arxiv request");

        let response = self
            .client
            .get(&url)
            .header("Accept", "application/atom+xml")
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to fetch arXiv entry: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::from_status("arXiv", response.status()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to read response: {}", e)))?;

        parser::parse(bytes.as_ref())
            .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))
    }

    /// Map the first feed entry onto a candidate, `None` for arXiv's error entries
    fn parse_entry(
        entry: &feed_rs::model::Entry,
        arxiv_id: &str,
    ) -> Option<ResolutionCandidate> {
        if entry.id.contains("/api/errors") {
            return None;
        }

        let mut candidate = ResolutionCandidate::new(CandidateSource::ArXiv, 1.0)
            .arxiv_id(arxiv_id)
            .link(FullTextLink::pdf(Self::pdf_url(arxiv_id)));

        if let Some(title) = entry.title.as_ref() {
            let title = title.content.split_whitespace().collect::<Vec<_>>().join(" ");
            if !title.is_empty() {
                candidate = candidate.title(title);
            }
        }

        // published versions carry a <link title="doi"> to the journal DOI
        let doi = entry
            .links
            .iter()
            .find(|link| link.title.as_deref() == Some("doi"))
            .and_then(|link| normalize_doi(&link.href));
        if let Some(doi) = doi {
            candidate = candidate.doi(doi);
        }

        Some(candidate)
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::RESOLVE
    }

    async fn resolve(&self, query: &ResolveQuery) -> Result<Vec<ResolutionCandidate>, SourceError> {
        let Some(raw_id) = query.known.arxiv_id.as_deref() else {
            return Ok(Vec::new());
        };
        let arxiv_id = normalize_arxiv_id(raw_id);
        if !is_valid_arxiv_id(&arxiv_id) {
            debug!(arxiv_id, "ignoring malformed arXiv ID");
            return Ok(Vec::new());
        }

        match self.fetch_feed(&arxiv_id).await {
            Ok(feed) => Ok(feed
                .entries
                .first()
                .and_then(|entry| Self::parse_entry(entry, &arxiv_id))
                .into_iter()
                .collect()),
            Err(e) => {
                // a well-formed ID is still good enough to download from
                warn!(arxiv_id, error = %e, "arXiv lookup failed, keeping extracted ID");
                Ok(vec![ResolutionCandidate::new(CandidateSource::ArXiv, 1.0)
                    .arxiv_id(arxiv_id.clone())
                    .link(FullTextLink::pdf(Self::pdf_url(&arxiv_id)))])
            }
        }
    }
}
