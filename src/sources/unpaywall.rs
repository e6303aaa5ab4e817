//! Unpaywall open-access lookup.
//!
//! API documentation: <https://unpaywall.org/products/api>

use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::debug;

use crate::sources::{Source, SourceCapabilities, SourceError};
use crate::utils::{normalize_doi, HttpClient};

const UNPAYWALL_API_BASE: &str = "https://api.unpaywall.org/v2";

/// Unpaywall open-access source
///
/// The API requires an email address (free, no key needed), so this source
/// is only registered when one is configured.
#[derive(Debug, Clone)]
pub struct UnpaywallSource {
    client: Arc<HttpClient>,
    base_url: String,
    email: String,
}

impl UnpaywallSource {
    pub fn new(client: Arc<HttpClient>, email: impl Into<String>) -> Self {
        Self {
            client,
            base_url: UNPAYWALL_API_BASE.to_string(),
            email: email.into(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Source for UnpaywallSource {
    fn id(&self) -> &str {
        "unpaywall"
    }

    fn name(&self) -> &str {
        "Unpaywall"
    }

    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::OPEN_ACCESS
    }

    async fn open_access_url(&self, doi: &str) -> Result<Option<String>, SourceError> {
        let clean_doi = normalize_doi(doi)
            .ok_or_else(|| SourceError::InvalidRequest(format!("Not a DOI: {}", doi)))?;

        let url = format!(
            "{}/{}?email={}",
            self.base_url,
            urlencoding::encode(&clean_doi).replace("%2F", "/"),
            urlencoding::encode(&self.email)
        );
        debug!(url, "unpaywall request");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| SourceError::Network(format!("Failed to lookup DOI in Unpaywall: {}", e)))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !response.status().is_success() {
            return Err(SourceError::from_status("Unpaywall", response.status()));
        }

        let data: UnpaywallResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Parse(format!("Failed to parse Unpaywall response: {}", e)))?;

        Ok(data
            .best_oa_location
            .and_then(|loc| loc.url_for_pdf.or(loc.url))
            .filter(|url| !url.is_empty()))
    }
}

/// Unpaywall API response
#[derive(Debug, Deserialize)]
struct UnpaywallResponse {
    best_oa_location: Option<UnpaywallLocation>,
}

#[derive(Debug, Deserialize)]
struct UnpaywallLocation {
    url_for_pdf: Option<String>,
    url: Option<String>,
}
