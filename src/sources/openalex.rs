//! OpenAlex resolver.
//!
//! Used as a backfill when Crossref finds nothing convincing. OpenAlex does
//! not return a relevance score we can trust across queries, so confidence
//! comes from title matching, decayed by result rank.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::models::{CandidateSource, FullTextLink, ResolutionCandidate, ResolveQuery};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{match_confidence, normalize_arxiv_id, normalize_doi, HttpClient};

const OPENALEX_API_BASE: &str = "https://api.openalex.org";

/// Confidence penalty per result rank
const RANK_DECAY: f64 = 0.05;

/// OpenAlex resolver
#[derive(Debug, Clone)]
pub struct OpenAlexSource {
    client: Arc<HttpClient>,
    base_url: String,
    email: Option<String>,
    per_page: usize,
}

impl OpenAlexSource {
    pub fn new(client: Arc<HttpClient>, per_page: usize) -> Self {
        Self {
            client,
            base_url: OPENALEX_API_BASE.to_string(),
            email: None,
            per_page: per_page.max(1),
        }
    }

    /// Create with an email (recommended for better rate limits)
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Add email to request URL if available (for polite pool)
    fn add_email_if_present(&self, url: &str) -> String {
        if let Some(ref email) = self.email {
            format!("{}&mailto={}", url, urlencoding::encode(email))
        } else {
            url.to_string()
        }
    }

    fn parse_work(work: OAWork, query: &ResolveQuery, rank: usize) -> Option<ResolutionCandidate> {
        let title = work.title.or(work.display_name)?;
        let confidence = match_confidence(&query.text, query.title.as_deref(), &title)
            - RANK_DECAY * rank as f64;

        let mut candidate =
            ResolutionCandidate::new(CandidateSource::OpenAlex, confidence).title(title);

        if let Some(doi) = work.doi.as_deref().and_then(normalize_doi) {
            candidate = candidate.doi(doi);
        }

        // arXiv-hosted works expose the preprint as a location on arxiv.org
        let arxiv = work
            .locations
            .iter()
            .filter_map(|loc| loc.landing_page_url.as_deref())
            .find(|url| url.contains("arxiv.org/abs/"))
            .map(normalize_arxiv_id);
        if let Some(arxiv_id) = arxiv {
            candidate = candidate.arxiv_id(arxiv_id);
        }

        if let Some(venue) = work
            .primary_location
            .and_then(|loc| loc.source)
            .and_then(|source| source.display_name)
        {
            candidate = candidate.venue(venue);
        }

        if let Some(pdf_url) = work.best_oa_location.and_then(|loc| loc.pdf_url) {
            candidate = candidate.link(FullTextLink::pdf(pdf_url));
        }

        Some(candidate)
    }
}

#[async_trait]
impl Source for OpenAlexSource {
    fn id(&self) -> &str {
        "openalex"
    }

    fn name(&self) -> &str {
        "OpenAlex"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::RESOLVE
    }

    async fn resolve(&self, query: &ResolveQuery) -> Result<Vec<ResolutionCandidate>, SourceError> {
        let search = query.title.as_deref().unwrap_or(&query.text);
        if search.trim().is_empty() {
            return Ok(Vec::new());
        }

        let url = self.add_email_if_present(&format!(
            "{}/works?search={}&per-page={}",
            self.base_url,
            urlencoding::encode(search),
            self.per_page
        ));
        debug!(url, "openalex request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to search OpenAlex: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::from_status("OpenAlex", response.status()));
        }

        let data: WorksResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse JSON: {}", e)))?;

        Ok(data
            .results
            .into_iter()
            .enumerate()
            .filter_map(|(rank, work)| Self::parse_work(work, query, rank))
            .collect())
    }
}

// ===== OpenAlex API Types =====

#[derive(Debug, Deserialize)]
struct WorksResponse {
    #[serde(default)]
    results: Vec<OAWork>,
}

#[derive(Debug, Deserialize)]
struct OAWork {
    title: Option<String>,
    display_name: Option<String>,
    doi: Option<String>,
    primary_location: Option<OALocation>,
    best_oa_location: Option<OALocation>,
    #[serde(default)]
    locations: Vec<OALocation>,
}

#[derive(Debug, Deserialize)]
struct OALocation {
    landing_page_url: Option<String>,
    pdf_url: Option<String>,
    source: Option<OASource>,
}

#[derive(Debug, Deserialize)]
struct OASource {
    display_name: Option<String>,
}
