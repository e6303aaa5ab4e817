//! Semantic Scholar resolver.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::models::{CandidateSource, FullTextLink, ResolutionCandidate, ResolveQuery};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{match_confidence, normalize_doi, HttpClient};

const SEMANTIC_API_BASE: &str = "https://api.semanticscholar.org/graph/v1";

const SEARCH_FIELDS: &str = "title,venue,externalIds,openAccessPdf";

/// Confidence penalty per result rank
const RANK_DECAY: f64 = 0.05;

/// Semantic Scholar resolver
///
/// Only registered when an API key is configured; the key is sent as the
/// `x-api-key` header on every request.
#[derive(Debug, Clone)]
pub struct SemanticScholarSource {
    client: Arc<HttpClient>,
    base_url: String,
    api_key: String,
    limit: usize,
}

impl SemanticScholarSource {
    pub fn new(client: Arc<HttpClient>, api_key: impl Into<String>, limit: usize) -> Self {
        Self {
            client,
            base_url: SEMANTIC_API_BASE.to_string(),
            api_key: api_key.into(),
            limit: limit.max(1),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn parse_paper(data: S2Paper, query: &ResolveQuery, rank: usize) -> Option<ResolutionCandidate> {
        let title = data.title?;
        let confidence = match_confidence(&query.text, query.title.as_deref(), &title)
            - RANK_DECAY * rank as f64;

        let mut candidate =
            ResolutionCandidate::new(CandidateSource::SemanticScholar, confidence).title(title);

        if let Some(ids) = data.external_ids {
            if let Some(doi) = ids.doi.as_deref().and_then(normalize_doi) {
                candidate = candidate.doi(doi);
            }
            if let Some(arxiv_id) = ids.arxiv.filter(|id| !id.is_empty()) {
                candidate = candidate.arxiv_id(arxiv_id);
            }
        }

        if let Some(venue) = data.venue.filter(|v| !v.is_empty()) {
            candidate = candidate.venue(venue);
        }

        if let Some(url) = data
            .open_access_pdf
            .and_then(|pdf| pdf.url)
            .filter(|url| !url.is_empty())
        {
            candidate = candidate.link(FullTextLink::pdf(url));
        }

        Some(candidate)
    }
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn id(&self) -> &str {
        "semantic"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::RESOLVE
    }

    async fn resolve(&self, query: &ResolveQuery) -> Result<Vec<ResolutionCandidate>, SourceError> {
        let search = query.title.as_deref().unwrap_or(&query.text);
        if search.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = format!(
            "{}/paper/search?query={}&limit={}&fields={}",
            self.base_url,
            urlencoding::encode(search),
            self.limit,
            SEARCH_FIELDS
        );
        debug!(url, "semantic scholar request");

        let response = self
            .client
            .get(&url)
            .header("x-api-key", &self.api_key)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to search Semantic Scholar: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::from_status("Semantic Scholar", response.status()));
        }

        let data: S2SearchResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        Ok(data
            .data
            .into_iter()
            .enumerate()
            .filter_map(|(rank, paper)| Self::parse_paper(paper, query, rank))
            .collect())
    }
}

// ===== Semantic Scholar API Types =====

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    title: Option<String>,
    venue: Option<String>,
    external_ids: Option<S2ExternalIds>,
    open_access_pdf: Option<S2OpenAccessPdf>,
}

#[derive(Debug, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(rename = "ArXiv")]
    arxiv: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2OpenAccessPdf {
    url: Option<String>,
}
