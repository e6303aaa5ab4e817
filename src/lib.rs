//! # Citation Downloader
//!
//! Extracts the bibliography of a research paper, resolves each reference to
//! a DOI or arXiv ID and downloads the PDFs it can reach.
//!
//! ## Architecture
//!
//! - [`extract`]: GROBID and local heuristic reference extraction
//! - [`models`]: references, resolution candidates, download outcomes, report
//! - [`sources`]: metadata resolvers (arXiv, Crossref, OpenAlex, Semantic Scholar)
//!   and the Unpaywall open-access lookup behind one trait
//! - [`pipeline`]: normalization, resolution, link collection, download, report
//! - [`utils`]: HTTP client, identifier and URL helpers
//! - [`config`]: configuration management
//! - [`ui`]: terminal progress and summary output

pub mod config;
pub mod extract;
pub mod models;
pub mod pipeline;
pub mod sources;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use config::Config;
pub use extract::{ExtractError, ReferenceExtractor};
pub use models::{RawReference, ReferenceReport, Report};
pub use pipeline::Pipeline;
pub use sources::{Source, SourceRegistry};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
