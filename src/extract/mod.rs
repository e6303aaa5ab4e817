//! Reference extraction from a paper.
//!
//! Two engines produce the ordered [`RawReference`] list the pipeline
//! consumes: a GROBID client and a local heuristic splitter over the PDF's
//! text layer. Extraction failures are fatal for a run.

mod grobid;
mod local;
pub mod pdf;

pub use grobid::{parse_tei, GrobidExtractor};
pub use local::{find_references_block, split_references, LocalExtractor};

use async_trait::async_trait;
use std::io::Write;
use std::path::Path;
use thiserror::Error;
use tracing::info;

use crate::config::Config;
use crate::models::RawReference;
use crate::pipeline::{fetch_pdf, PdfFetcher};

/// Errors that abort extraction
#[derive(Error, Debug)]
pub enum ExtractError {
    #[error("GROBID error: {0}")]
    Grobid(String),

    #[error("TEI parse error: {0}")]
    Tei(String),

    #[error("PDF text extraction failed: {0}")]
    PdfText(String),

    #[error("No references found in {0}")]
    NoReferences(String),

    #[error("Could not obtain a PDF from {url}: {reason}")]
    Fetch { url: String, reason: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Available extraction engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Engine {
    #[default]
    Grobid,
    Local,
}

impl Engine {
    pub fn name(&self) -> &'static str {
        match self {
            Engine::Grobid => "grobid",
            Engine::Local => "local",
        }
    }
}

/// Turns a PDF on disk into its bibliography
#[async_trait]
pub trait ReferenceExtractor: Send + Sync {
    /// Engine name recorded in the report
    fn engine(&self) -> &'static str;

    async fn extract(&self, pdf: &Path) -> Result<Vec<RawReference>, ExtractError>;
}

/// Build the extractor for `engine`
pub fn extractor_for(engine: Engine, config: &Config) -> Result<Box<dyn ReferenceExtractor>, ExtractError> {
    Ok(match engine {
        Engine::Grobid => Box::new(GrobidExtractor::new(&config.grobid)?),
        Engine::Local => Box::new(LocalExtractor),
    })
}

/// Download the paper at `url` into a temporary file.
///
/// A landing page is followed one hop to its PDF link, the same way
/// reference downloads are.
pub async fn fetch_paper(
    url: &str,
    fetcher: &dyn PdfFetcher,
    max_bytes: usize,
) -> Result<tempfile::NamedTempFile, ExtractError> {
    let mut attempts = Vec::new();
    let (source_url, bytes) = fetch_pdf(fetcher, url, max_bytes, &mut attempts)
        .await
        .map_err(|e| ExtractError::Fetch {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    info!(url = %source_url, bytes = bytes.len(), "fetched input paper");

    let mut file = tempfile::Builder::new()
        .prefix("citation-input-")
        .suffix(".pdf")
        .tempfile()?;
    file.write_all(&bytes)?;
    file.flush()?;
    Ok(file)
}
