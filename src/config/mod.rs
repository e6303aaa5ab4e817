//! Configuration management.
//!
//! Settings come from an optional TOML file layered under
//! `CITATION_DOWNLOADER_*` environment variables (nested keys use `__`,
//! e.g. `CITATION_DOWNLOADER_DOWNLOADS__TIMEOUT_SECS=30`). Command-line flags
//! are applied on top by the binary.
//!
//! ```toml
//! unpaywall_email = "me@example.org"
//!
//! [api_keys]
//! semantic_scholar = "your-api-key"
//!
//! [resolution]
//! acceptance_threshold = 0.75
//! backfill_threshold = 0.6
//! min_confidence = 0.3
//! max_candidates = 5
//!
//! [downloads]
//! output_dir = "./downloads"
//! timeout_secs = 15
//! concurrency = 4
//! max_file_size_mb = 100
//!
//! [grobid]
//! url = "http://localhost:8070"
//! consolidate_citations = 0
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeys,

    /// Contact email; enables the Unpaywall link step and Crossref's polite pool
    #[serde(default)]
    pub unpaywall_email: Option<String>,

    /// Resolution thresholds
    #[serde(default)]
    pub resolution: ResolutionConfig,

    /// Download settings
    #[serde(default)]
    pub downloads: DownloadConfig,

    /// GROBID extraction service
    #[serde(default)]
    pub grobid: GrobidConfig,
}

impl Config {
    /// Fill unset credentials from the conventional environment variables
    /// (`SEMANTIC_SCHOLAR_API_KEY`, `UNPAYWALL_EMAIL`).
    pub fn apply_env_fallbacks(&mut self) {
        self.apply_fallbacks(|key| std::env::var(key).ok());
    }

    fn apply_fallbacks(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if self.api_keys.semantic_scholar.is_none() {
            self.api_keys.semantic_scholar =
                lookup("SEMANTIC_SCHOLAR_API_KEY").filter(|v| !v.trim().is_empty());
        }
        if self.unpaywall_email.is_none() {
            self.unpaywall_email = lookup("UNPAYWALL_EMAIL").filter(|v| !v.trim().is_empty());
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.downloads.timeout_secs.max(1))
    }
}

/// API keys for external services
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ApiKeys {
    /// Semantic Scholar API key; the resolver is skipped without one
    #[serde(default)]
    pub semantic_scholar: Option<String>,
}

/// Confidence thresholds used by the resolution coordinator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Stop querying further resolvers once a candidate reaches this score
    #[serde(default = "default_acceptance")]
    pub acceptance_threshold: f64,

    /// Below this score the backfill resolvers (OpenAlex, Semantic Scholar) run
    #[serde(default = "default_backfill")]
    pub backfill_threshold: f64,

    /// Candidates under this score leave the reference unresolved
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,

    /// Top-K results requested from search resolvers
    #[serde(default = "default_max_candidates")]
    pub max_candidates: usize,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            acceptance_threshold: default_acceptance(),
            backfill_threshold: default_backfill(),
            min_confidence: default_min_confidence(),
            max_candidates: default_max_candidates(),
        }
    }
}

fn default_acceptance() -> f64 {
    0.75
}

fn default_backfill() -> f64 {
    0.6
}

fn default_min_confidence() -> f64 {
    0.3
}

fn default_max_candidates() -> usize {
    5
}

/// Download configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadConfig {
    /// Directory PDFs and `report.json` are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Per-request timeout for every network call
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// References processed in parallel
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Maximum accepted PDF size (in MB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size_mb: usize,

    /// Resolve only; never fetch PDFs
    #[serde(default)]
    pub dry_run: bool,

    /// Process only the first N references
    #[serde(default)]
    pub max_refs: Option<usize>,
}

impl DownloadConfig {
    pub fn max_file_size_bytes(&self) -> usize {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
            timeout_secs: default_timeout(),
            concurrency: default_concurrency(),
            max_file_size_mb: default_max_file_size(),
            dry_run: false,
            max_refs: None,
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./downloads")
}

fn default_timeout() -> u64 {
    15
}

fn default_concurrency() -> usize {
    4
}

fn default_max_file_size() -> usize {
    100
}

/// GROBID service settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrobidConfig {
    #[serde(default = "default_grobid_url")]
    pub url: String,

    /// `consolidateCitations` level (0, 1 or 2)
    #[serde(default)]
    pub consolidate_citations: u8,

    /// Processing a full document is slow; this timeout is separate from downloads
    #[serde(default = "default_grobid_timeout")]
    pub timeout_secs: u64,
}

impl Default for GrobidConfig {
    fn default() -> Self {
        Self {
            url: default_grobid_url(),
            consolidate_citations: 0,
            timeout_secs: default_grobid_timeout(),
        }
    }
}

fn default_grobid_url() -> String {
    "http://localhost:8070".to_string()
}

fn default_grobid_timeout() -> u64 {
    60
}

/// Load configuration from an optional file plus environment overrides
pub fn load_config(path: Option<&Path>) -> Result<Config, config::ConfigError> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    let settings = builder
        .add_source(
            config::Environment::with_prefix("CITATION_DOWNLOADER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    let mut config: Config = settings.try_deserialize()?;
    config.apply_env_fallbacks();
    Ok(config)
}

/// Look for a config file in the working directory, then the user config directory
pub fn find_config_file() -> Option<PathBuf> {
    let local = PathBuf::from("citation-downloader.toml");
    if local.is_file() {
        return Some(local);
    }

    dirs::config_dir()
        .map(|dir| dir.join("citation-downloader").join("config.toml"))
        .filter(|path| path.is_file())
}
