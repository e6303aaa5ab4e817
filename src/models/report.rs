//! Download outcomes and the aggregate report.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::path::PathBuf;

use super::reference::{CandidateSource, ResolutionStatus, ResolvedReference};

/// Outcome of a download (or of a single download attempt)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DownloadStatus {
    Downloaded,
    NotFound,
    NetworkError,
    InvalidContent,
    Skipped,
}

impl DownloadStatus {
    pub fn label(&self) -> &'static str {
        match self {
            DownloadStatus::Downloaded => "downloaded",
            DownloadStatus::NotFound => "not found",
            DownloadStatus::NetworkError => "network error",
            DownloadStatus::InvalidContent => "invalid content",
            DownloadStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for DownloadStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single URL tried by the downloader
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAttempt {
    pub url: String,
    pub status: DownloadStatus,
    pub detail: String,
}

/// Result of downloading one reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadResult {
    pub status: DownloadStatus,

    /// URL the PDF was fetched from
    pub url: Option<String>,

    /// Where the PDF was written
    pub path: Option<PathBuf>,

    /// Human-readable explanation
    pub reason: String,

    /// Every URL tried, in order
    pub attempts: Vec<DownloadAttempt>,
}

impl DownloadResult {
    pub fn downloaded(url: String, path: PathBuf, attempts: Vec<DownloadAttempt>) -> Self {
        Self {
            status: DownloadStatus::Downloaded,
            reason: format!("saved {}", path.display()),
            url: Some(url),
            path: Some(path),
            attempts,
        }
    }

    pub fn not_found(reason: impl Into<String>, attempts: Vec<DownloadAttempt>) -> Self {
        Self {
            status: DownloadStatus::NotFound,
            url: None,
            path: None,
            reason: reason.into(),
            attempts,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self {
            status: DownloadStatus::Skipped,
            url: None,
            path: None,
            reason: reason.into(),
            attempts: Vec::new(),
        }
    }

    pub fn tried_urls(&self) -> Vec<&str> {
        self.attempts.iter().map(|a| a.url.as_str()).collect()
    }
}

/// Final record for one input reference.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceReport {
    pub resolved: ResolvedReference,
    pub download: DownloadResult,
}

impl ReferenceReport {
    pub fn ordinal(&self) -> usize {
        self.resolved.ordinal()
    }
}

/// Flat JSON shape of a report entry
#[derive(Serialize)]
struct ReportEntry<'a> {
    ordinal: usize,
    reference: &'a str,
    identifier: Option<&'a str>,
    identifier_source: Option<CandidateSource>,
    confidence: Option<f64>,
    resolution: ResolutionStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    resolution_reason: Option<&'a str>,
    doi: Option<&'a str>,
    arxiv_id: Option<&'a str>,
    title: Option<&'a str>,
    candidate_urls: &'a [String],
    tried_urls: Vec<&'a str>,
    status: DownloadStatus,
    reason: &'a str,
    url: Option<&'a str>,
    path: Option<&'a PathBuf>,
}

impl Serialize for ReferenceReport {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let resolved = &self.resolved;
        ReportEntry {
            ordinal: resolved.ordinal(),
            reference: &resolved.reference.raw.text,
            identifier: resolved.identifier.as_ref().map(|id| id.as_str()),
            identifier_source: resolved.source,
            confidence: resolved.confidence,
            resolution: resolved.status,
            resolution_reason: resolved.reason.as_deref(),
            doi: resolved.doi.as_deref(),
            arxiv_id: resolved.arxiv_id.as_deref(),
            title: resolved.title.as_deref(),
            candidate_urls: &resolved.candidate_urls,
            tried_urls: self.download.tried_urls(),
            status: self.download.status,
            reason: &self.download.reason,
            url: self.download.url.as_deref(),
            path: self.download.path.as_ref(),
        }
        .serialize(serializer)
    }
}

/// Per-status counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub resolved: usize,
    pub unresolved: usize,
    pub downloaded: usize,
    pub not_found: usize,
    pub skipped: usize,
}

impl ReportSummary {
    pub fn from_results(results: &[ReferenceReport]) -> Self {
        let mut summary = Self::default();
        for entry in results {
            if entry.resolved.is_resolved() {
                summary.resolved += 1;
            } else {
                summary.unresolved += 1;
            }
            match entry.download.status {
                DownloadStatus::Downloaded => summary.downloaded += 1,
                DownloadStatus::Skipped => summary.skipped += 1,
                _ => summary.not_found += 1,
            }
        }
        summary
    }
}

/// The aggregate report written at the end of a run
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    /// PDF path or URL the references came from
    pub input: String,

    /// Extraction engine ("grobid" or "local")
    pub engine: String,
    pub generated_at: DateTime<Utc>,
    pub count: usize,
    pub summary: ReportSummary,
    pub results: Vec<ReferenceReport>,
}

impl Report {
    pub fn new(input: impl Into<String>, engine: impl Into<String>, results: Vec<ReferenceReport>) -> Self {
        Self {
            input: input.into(),
            engine: engine.into(),
            generated_at: Utc::now(),
            count: results.len(),
            summary: ReportSummary::from_results(&results),
            results,
        }
    }
}
