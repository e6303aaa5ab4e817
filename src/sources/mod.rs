//! Identifier resolvers and open-access lookups, one module per external API.
//!
//! Every source implements the [`Source`] trait. Resolvers (Crossref,
//! OpenAlex, Semantic Scholar, arXiv) implement [`Source::resolve`] and map
//! their API's JSON/Atom into uniform [`ResolutionCandidate`]s; raw response
//! shapes stay private to each module. Unpaywall implements
//! [`Source::open_access_url`] only.
//!
//! Sources never read the environment. Credentials and contact addresses are
//! passed in from [`crate::config::Config`] when the [`SourceRegistry`] is
//! built, and optional sources are simply not registered when their
//! credential is absent:
//!
//! - Semantic Scholar requires `api_keys.semantic_scholar`
//! - Unpaywall requires `unpaywall_email`

mod arxiv;
mod crossref;
mod openalex;
mod registry;
mod semantic;
mod unpaywall;

pub mod mock;

pub use arxiv::ArxivSource;
pub use crossref::CrossRefSource;
pub use mock::{MockFetcher, MockSource};
pub use openalex::OpenAlexSource;
pub use registry::{SourceCapabilities, SourceRegistry};
pub use semantic::SemanticScholarSource;
pub use unpaywall::UnpaywallSource;

use crate::models::{ResolutionCandidate, ResolveQuery};
use async_trait::async_trait;

/// The Source trait defines the interface for all external metadata sources.
///
/// # Implementing a New Source
///
/// 1. Create a struct that implements `Source`
/// 2. Implement `id`, `name` and `capabilities`
/// 3. Implement `resolve` and/or `open_access_url` to match the capabilities
/// 4. Register it in `SourceRegistry::from_config` (or dynamically)
#[async_trait]
pub trait Source: Send + Sync + std::fmt::Debug {
    /// Unique identifier for this source (e.g. "crossref", "openalex")
    fn id(&self) -> &str;

    /// Human-readable name of this source
    fn name(&self) -> &str;

    /// Describe the capabilities of this source
    fn capabilities(&self) -> SourceCapabilities {
        SourceCapabilities::RESOLVE
    }

    /// Whether this source maps reference text to identifiers
    fn supports_resolve(&self) -> bool {
        self.capabilities().contains(SourceCapabilities::RESOLVE)
    }

    /// Whether this source can look up open-access PDFs by DOI
    fn supports_open_access(&self) -> bool {
        self.capabilities()
            .contains(SourceCapabilities::OPEN_ACCESS)
    }

    /// Find candidate identifiers for a reference.
    ///
    /// An empty vector means "no match"; errors are reserved for transport,
    /// status and parse failures.
    async fn resolve(&self, _query: &ResolveQuery) -> Result<Vec<ResolutionCandidate>, SourceError> {
        Err(SourceError::NotImplemented)
    }

    /// Look up an open-access PDF URL for a DOI
    async fn open_access_url(&self, _doi: &str) -> Result<Option<String>, SourceError> {
        Err(SourceError::NotImplemented)
    }
}

/// Errors that can occur when interacting with a source
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The requested operation is not implemented for this source
    #[error("Operation not implemented for this source")]
    NotImplemented,

    /// Network or HTTP error
    #[error("Network error: {0}")]
    Network(String),

    /// Parsing error (XML, JSON, HTML, etc.)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Invalid request parameters
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Rate limit exceeded
    #[error("Rate limit exceeded")]
    RateLimit,

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// API error from the source
    #[error("API error: {0}")]
    Api(String),

    /// IO error (file system)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("Error: {0}")]
    Other(String),
}

impl SourceError {
    /// Map a non-success HTTP status to an error.
    pub fn from_status(source: &str, status: reqwest::StatusCode) -> Self {
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            SourceError::RateLimit
        } else if status == reqwest::StatusCode::NOT_FOUND {
            SourceError::NotFound(format!("{} returned 404", source))
        } else {
            SourceError::Api(format!("{} API returned status: {}", source, status))
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        SourceError::Network(err.to_string())
    }
}

impl From<serde_json::Error> for SourceError {
    fn from(err: serde_json::Error) -> Self {
        SourceError::Parse(format!("JSON: {}", err))
    }
}
