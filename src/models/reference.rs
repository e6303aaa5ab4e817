//! Reference models flowing through the resolution pipeline.

use serde::{Deserialize, Serialize};

/// Structured data an extractor recovered alongside the raw text (GROBID `idno`, `title`, ...)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceHints {
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub title: Option<String>,
    pub year: Option<String>,
}

impl ReferenceHints {
    pub fn is_empty(&self) -> bool {
        self.doi.is_none() && self.arxiv_id.is_none() && self.title.is_none() && self.year.is_none()
    }
}

/// A bibliography entry exactly as the extractor produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawReference {
    /// 1-based position in the source paper's bibliography
    pub ordinal: usize,

    /// Original entry text
    pub text: String,

    /// Extractor-supplied hints (empty for plain-text extractors)
    #[serde(default)]
    pub hints: ReferenceHints,
}

impl RawReference {
    pub fn new(ordinal: usize, text: impl Into<String>) -> Self {
        Self {
            ordinal,
            text: text.into(),
            hints: ReferenceHints::default(),
        }
    }

    pub fn with_hints(mut self, hints: ReferenceHints) -> Self {
        self.hints = hints;
        self
    }

    /// Number a plain list of reference strings in bibliography order.
    pub fn from_texts<I, S>(texts: I) -> Vec<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        texts
            .into_iter()
            .enumerate()
            .map(|(i, text)| Self::new(i + 1, text))
            .collect()
    }
}

/// Identifiers known before any search runs (from extractor hints).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnownIdentifiers {
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
}

impl KnownIdentifiers {
    pub fn is_empty(&self) -> bool {
        self.doi.is_none() && self.arxiv_id.is_none()
    }
}

/// A reference after cleaning and direct pattern extraction.
///
/// Derived fields are `None` / empty when nothing was found; they are never
/// filled with placeholder values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedReference {
    pub raw: RawReference,

    /// Whitespace-collapsed, de-hyphenated text
    pub text: String,

    /// First DOI found literally in the text
    pub doi: Option<String>,

    /// arXiv ID found literally in the text
    pub arxiv_id: Option<String>,

    /// Inline URLs in order of appearance, deduplicated
    pub urls: Vec<String>,

    /// Identifiers supplied by the extractor
    pub known: KnownIdentifiers,

    /// Title used for similarity scoring (extractor title, else a guess from the text)
    pub title_guess: Option<String>,
}

impl NormalizedReference {
    pub fn ordinal(&self) -> usize {
        self.raw.ordinal
    }

    /// The URL to fall back on when nothing better is known.
    pub fn inline_url(&self) -> Option<&str> {
        self.urls.first().map(String::as_str)
    }

    /// Whether the text itself carries a DOI or arXiv ID.
    pub fn has_inline_identifier(&self) -> bool {
        self.doi.is_some() || self.arxiv_id.is_some()
    }

    /// Build the query handed to each resolver.
    pub fn query(&self) -> ResolveQuery {
        ResolveQuery {
            text: self.text.clone(),
            title: self.title_guess.clone(),
            known: self.known.clone(),
        }
    }
}

/// Input to a single resolver call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolveQuery {
    /// Full cleaned reference text
    pub text: String,

    /// Best available title for ranking
    pub title: Option<String>,

    /// Identifiers already known for this reference
    pub known: KnownIdentifiers,
}

impl ResolveQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn known_doi(mut self, doi: impl Into<String>) -> Self {
        self.known.doi = Some(doi.into());
        self
    }

    pub fn known_arxiv(mut self, arxiv_id: impl Into<String>) -> Self {
        self.known.arxiv_id = Some(arxiv_id.into());
        self
    }
}

/// Where a resolution candidate came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    Inline,
    #[serde(rename = "arxiv")]
    ArXiv,
    Crossref,
    #[serde(rename = "openalex")]
    OpenAlex,
    SemanticScholar,
}

impl CandidateSource {
    /// Returns the display name of the source
    pub fn name(&self) -> &'static str {
        match self {
            CandidateSource::Inline => "Inline",
            CandidateSource::ArXiv => "arXiv",
            CandidateSource::Crossref => "Crossref",
            CandidateSource::OpenAlex => "OpenAlex",
            CandidateSource::SemanticScholar => "Semantic Scholar",
        }
    }

    /// Rank used to break confidence ties; lower wins.
    pub fn priority(&self) -> u8 {
        match self {
            CandidateSource::Inline => 0,
            CandidateSource::ArXiv => 1,
            CandidateSource::Crossref => 2,
            CandidateSource::OpenAlex => 3,
            CandidateSource::SemanticScholar => 4,
        }
    }
}

impl std::fmt::Display for CandidateSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A canonical identifier for a work.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Identifier {
    Doi(String),
    Arxiv(String),
}

impl Identifier {
    pub fn as_str(&self) -> &str {
        match self {
            Identifier::Doi(doi) => doi,
            Identifier::Arxiv(id) => id,
        }
    }
}

impl std::fmt::Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Identifier::Doi(doi) => write!(f, "doi:{}", doi),
            Identifier::Arxiv(id) => write!(f, "arXiv:{}", id),
        }
    }
}

/// A full-text link advertised by a source's metadata
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FullTextLink {
    pub url: String,
    pub content_type: Option<String>,
}

impl FullTextLink {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: None,
        }
    }

    pub fn pdf(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            content_type: Some("application/pdf".to_string()),
        }
    }

    pub fn is_pdf(&self) -> bool {
        self.content_type
            .as_deref()
            .is_some_and(|ct| ct.to_ascii_lowercase().contains("pdf"))
            || self.url.to_ascii_lowercase().ends_with(".pdf")
    }
}

/// One possible match for a reference, produced by a resolver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionCandidate {
    pub source: CandidateSource,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,
    pub title: Option<String>,
    pub venue: Option<String>,

    /// Match confidence in `[0, 1]`
    pub confidence: f64,

    /// Full-text links from the source's metadata
    pub links: Vec<FullTextLink>,
}

impl ResolutionCandidate {
    pub fn new(source: CandidateSource, confidence: f64) -> Self {
        Self {
            source,
            doi: None,
            arxiv_id: None,
            title: None,
            venue: None,
            confidence: confidence.clamp(0.0, 1.0),
            links: Vec::new(),
        }
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.doi = Some(doi.into());
        self
    }

    pub fn arxiv_id(mut self, arxiv_id: impl Into<String>) -> Self {
        self.arxiv_id = Some(arxiv_id.into());
        self
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn venue(mut self, venue: impl Into<String>) -> Self {
        self.venue = Some(venue.into());
        self
    }

    pub fn link(mut self, link: FullTextLink) -> Self {
        self.links.push(link);
        self
    }

    /// DOI takes precedence over arXiv ID.
    pub fn identifier(&self) -> Option<Identifier> {
        self.doi
            .clone()
            .map(Identifier::Doi)
            .or_else(|| self.arxiv_id.clone().map(Identifier::Arxiv))
    }

    pub fn has_identifier(&self) -> bool {
        self.doi.is_some() || self.arxiv_id.is_some()
    }
}

/// Terminal state of the resolution stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Resolved,
    Unresolved,
}

/// A reference together with its chosen identifier and candidate download URLs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedReference {
    pub reference: NormalizedReference,
    pub status: ResolutionStatus,

    /// Why resolution ended the way it did (set for unresolved references)
    pub reason: Option<String>,

    /// The winning candidate's identifier; DOI preferred over arXiv ID
    pub identifier: Option<Identifier>,
    pub doi: Option<String>,
    pub arxiv_id: Option<String>,

    /// Source that produced the winning identifier
    pub source: Option<CandidateSource>,
    pub confidence: Option<f64>,
    pub title: Option<String>,

    /// Download URLs in priority order, deduplicated
    pub candidate_urls: Vec<String>,
}

impl ResolvedReference {
    pub fn ordinal(&self) -> usize {
        self.reference.ordinal()
    }

    pub fn is_resolved(&self) -> bool {
        self.status == ResolutionStatus::Resolved
    }
}
