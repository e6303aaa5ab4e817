//! Crossref resolver.
//!
//! Free-text references go through the `query.bibliographic` search, which is
//! Crossref's fuzzy reference matcher. A DOI already known from extraction
//! is confirmed with a direct `/works/{doi}` lookup instead.

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{CandidateSource, FullTextLink, ResolutionCandidate, ResolveQuery};
use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{normalize_doi, title_similarity, HttpClient};

const CROSSREF_API_BASE: &str = "https://api.crossref.org";

/// Crossref scores are unbounded; this is the score that maps to 0.5
const SCORE_MIDPOINT: f64 = 40.0;

/// Crossref resolver
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: Arc<HttpClient>,
    base_url: String,
    email: Option<String>,
    rows: usize,
}

impl CrossRefSource {
    pub fn new(client: Arc<HttpClient>, rows: usize) -> Self {
        Self {
            client,
            base_url: CROSSREF_API_BASE.to_string(),
            email: None,
            rows: rows.max(1),
        }
    }

    /// Identify ourselves for the polite pool
    pub fn with_email(mut self, email: Option<String>) -> Self {
        self.email = email;
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn mailto_param(&self) -> String {
        self.email
            .as_ref()
            .map(|email| format!("&mailto={}", urlencoding::encode(email)))
            .unwrap_or_default()
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, url: &str) -> Result<T, SourceError> {
        debug!(url, "crossref request");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to query Crossref: {}", e)))?;

        if !response.status().is_success() {
            return Err(SourceError::from_status("Crossref", response.status()));
        }

        response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse Crossref JSON: {}", e)))
    }

    async fn lookup_doi(&self, doi: &str) -> Result<Vec<ResolutionCandidate>, SourceError> {
        let url = format!(
            "{}/works/{}?{}",
            self.base_url,
            urlencoding::encode(doi).replace("%2F", "/"),
            self.mailto_param().trim_start_matches('&')
        );

        let found = match self.get_json::<CRWorkResponse>(&url).await {
            Ok(data) => Self::to_candidate(data.message, 1.0),
            Err(e) => {
                // DataCite DOIs (Zenodo, arXiv) are unknown to Crossref
                warn!(doi, error = %e, "Crossref DOI lookup failed, keeping extracted DOI");
                None
            }
        };

        Ok(vec![found.unwrap_or_else(|| Self::known_doi_candidate(doi))])
    }

    /// Candidate carrying only a DOI that extraction already supplied
    fn known_doi_candidate(doi: &str) -> ResolutionCandidate {
        let doi = normalize_doi(doi).unwrap_or_else(|| doi.trim().to_string());
        ResolutionCandidate::new(CandidateSource::Crossref, 1.0).doi(doi)
    }

    async fn search(&self, query: &ResolveQuery) -> Result<Vec<ResolutionCandidate>, SourceError> {
        let url = format!(
            "{}/works?query.bibliographic={}&rows={}&select=DOI,title,container-title,score,link{}",
            self.base_url,
            urlencoding::encode(&query.text),
            self.rows,
            self.mailto_param()
        );

        let data: CRSearchResponse = self.get_json(&url).await?;

        Ok(data
            .message
            .items
            .into_iter()
            .filter_map(|item| {
                let similarity = match (&query.title, item.title.first()) {
                    (Some(wanted), Some(found)) => Some(title_similarity(wanted, found)),
                    _ => None,
                };
                let confidence = score_to_confidence(item.score.unwrap_or(0.0), similarity);
                Self::to_candidate(item, confidence)
            })
            .collect())
    }

    fn to_candidate(item: CRItem, confidence: f64) -> Option<ResolutionCandidate> {
        let doi = item.doi.as_deref().and_then(normalize_doi)?;
        let mut candidate = ResolutionCandidate::new(CandidateSource::Crossref, confidence).doi(doi);

        if let Some(title) = item.title.into_iter().next() {
            candidate = candidate.title(title);
        }
        if let Some(venue) = item.container_title.into_iter().next() {
            candidate = candidate.venue(venue);
        }

        // text-mining links are the full text; similarity-checking ones are not useful to us
        for link in item.link {
            if link.intended_application.as_deref() == Some("similarity-checking") {
                continue;
            }
            candidate = candidate.link(FullTextLink {
                url: link.url,
                content_type: link.content_type.filter(|ct| ct != "unspecified"),
            });
        }

        Some(candidate)
    }
}

/// Map a Crossref relevance score into `[0, 1]`, blended with title similarity
/// when a title guess is available.
fn score_to_confidence(score: f64, title_similarity: Option<f64>) -> f64 {
    let score = score.max(0.0);
    let mapped = score / (score + SCORE_MIDPOINT);
    match title_similarity {
        Some(similarity) => (mapped + similarity) / 2.0,
        None => mapped,
    }
}

#[async_trait]
impl Source for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "Crossref"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::RESOLVE
    }

    async fn resolve(&self, query: &ResolveQuery) -> Result<Vec<ResolutionCandidate>, SourceError> {
        if let Some(doi) = &query.known.doi {
            return self.lookup_doi(doi).await;
        }
        if query.text.trim().is_empty() {
            return Ok(Vec::new());
        }
        self.search(query).await
    }
}

// ===== Crossref API Types =====

#[derive(Debug, Deserialize)]
struct CRSearchResponse {
    message: CRMessage,
}

#[derive(Debug, Deserialize)]
struct CRWorkResponse {
    message: CRItem,
}

#[derive(Debug, Deserialize)]
struct CRMessage {
    #[serde(default)]
    items: Vec<CRItem>,
}

#[derive(Debug, Deserialize)]
struct CRItem {
    #[serde(rename = "DOI")]
    doi: Option<String>,
    #[serde(default)]
    title: Vec<String>,
    #[serde(rename = "container-title", default)]
    container_title: Vec<String>,
    score: Option<f64>,
    #[serde(default)]
    link: Vec<CRLink>,
}

#[derive(Debug, Deserialize)]
struct CRLink {
    #[serde(rename = "URL")]
    url: String,
    #[serde(rename = "content-type")]
    content_type: Option<String>,
    #[serde(rename = "intended-application")]
    intended_application: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn source(base_url: &str) -> CrossRefSource {
        let client = Arc::new(HttpClient::new(Duration::from_secs(5)).unwrap());
        CrossRefSource::new(client, 3).with_base_url(base_url)
    }

    #[test]
    fn test_score_to_confidence() {
        assert_eq!(score_to_confidence(0.0, None), 0.0);
        assert!((score_to_confidence(40.0, None) - 0.5).abs() < 1e-9);
        assert!(score_to_confidence(120.0, None) >= 0.75);
        assert!((score_to_confidence(40.0, Some(1.0)) - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_search_maps_items() {
        let mut server = mockito::Server::new_async().await;
        let body = r#"{
            "status": "ok",
            "message": {
                "items": [
                    {
                        "DOI": "10.1145/3292500.3330701",
                        "title": ["Learning to rank references"],
                        "container-title": ["Proc. KDD"],
                        "score": 120.0,
                        "link": [
                            {"URL": "https://dl.acm.org/doi/pdf/10.1145/3292500.3330701", "content-type": "application/pdf", "intended-application": "text-mining"},
                            {"URL": "https://dl.acm.org/doi/10.1145/x", "content-type": "unspecified", "intended-application": "similarity-checking"}
                        ]
                    },
                    {"title": ["No DOI here"], "score": 10.0}
                ]
            }
        }"#;
        let mock = server
            .mock("GET", "/works")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await;

        let query = ResolveQuery::new("Smith J. (2020). Learning to rank references. KDD.")
            .title("Learning to rank references");
        let candidates = source(&server.url()).resolve(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(candidates.len(), 1);
        let best = &candidates[0];
        assert_eq!(best.source, CandidateSource::Crossref);
        assert_eq!(best.doi.as_deref(), Some("10.1145/3292500.3330701"));
        assert_eq!(best.venue.as_deref(), Some("Proc. KDD"));
        assert!(best.confidence > 0.85);
        assert_eq!(best.links.len(), 1);
        assert!(best.links[0].is_pdf());
    }

    #[tokio::test]
    async fn test_known_doi_uses_direct_lookup() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/works/10.1000/xyz")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"message": {"DOI": "10.1000/XYZ", "title": ["Known"]}}"#)
            .create_async()
            .await;

        let query = ResolveQuery::new("whatever").known_doi("10.1000/xyz");
        let candidates = source(&server.url()).resolve(&query).await.unwrap();

        mock.assert_async().await;
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].confidence, 1.0);
        assert_eq!(candidates[0].doi.as_deref(), Some("10.1000/XYZ"));
    }

    #[tokio::test]
    async fn test_unknown_doi_keeps_extracted_doi() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(404)
            .create_async()
            .await;

        let query = ResolveQuery::new("whatever").known_doi("10.5281/zenodo.1234567");
        let candidates = source(&server.url()).resolve(&query).await.unwrap();
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].doi.as_deref(), Some("10.5281/zenodo.1234567"));
        assert_eq!(candidates[0].confidence, 1.0);
        assert!(candidates[0].links.is_empty());
    }

    #[tokio::test]
    async fn test_doi_lookup_outage_keeps_extracted_doi() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let query = ResolveQuery::new("whatever").known_doi("10.1000/abc");
        let candidates = source(&server.url()).resolve(&query).await.unwrap();
        assert_eq!(candidates[0].doi.as_deref(), Some("10.1000/abc"));
        assert_eq!(candidates[0].source, CandidateSource::Crossref);
    }

    #[tokio::test]
    async fn test_server_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", mockito::Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let result = source(&server.url())
            .resolve(&ResolveQuery::new("Some reference text"))
            .await;
        assert!(matches!(result, Err(SourceError::Api(_))));
    }
}
