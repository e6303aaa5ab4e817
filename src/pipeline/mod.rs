//! The resolution and download pipeline.
//!
//! Raw references flow through [`normalize`] → [`ResolutionCoordinator`] →
//! [`LinkCollector`] → [`Downloader`] → [`assemble`]. References are
//! independent of each other and are processed with bounded concurrency;
//! results come back in bibliography order regardless of completion order.

mod coordinator;
mod download;
mod links;
mod normalize;
mod report;

pub use coordinator::{pick_best, Resolution, ResolutionCoordinator, UNRESOLVED_REASON};
pub use download::{
    fetch_pdf, file_name, DownloadError, Downloader, FetchedResponse, HttpFetcher, PdfFetcher,
};
pub use links::LinkCollector;
pub use normalize::{clean_text, extract_arxiv_id, extract_doi, extract_urls, normalize, normalize_all};
pub use report::{assemble, write_report, REPORT_FILE};

use futures_util::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info};

use crate::config::Config;
use crate::models::{
    DownloadResult, NormalizedReference, RawReference, ReferenceReport, ResolvedReference,
};
use crate::sources::{SourceError, SourceRegistry};

/// Called once per reference as soon as it has been downloaded (or skipped)
pub type ProgressFn<'a> = dyn Fn(&ResolvedReference, &DownloadResult) + Send + Sync + 'a;

/// Wires the stages together for a whole reference list
#[derive(Debug, Clone)]
pub struct Pipeline {
    coordinator: ResolutionCoordinator,
    links: LinkCollector,
    downloader: Downloader,
    concurrency: usize,
    max_refs: Option<usize>,
}

impl Pipeline {
    /// Build a pipeline from explicit parts
    pub fn new(registry: &SourceRegistry, fetcher: Arc<dyn PdfFetcher>, config: &Config) -> Self {
        let downloads = &config.downloads;
        Self {
            coordinator: ResolutionCoordinator::from_registry(registry, config.resolution.clone()),
            links: LinkCollector::new(registry.open_access()),
            downloader: Downloader::new(fetcher, &downloads.output_dir, downloads.max_file_size_bytes())
                .dry_run(downloads.dry_run),
            concurrency: downloads.concurrency.max(1),
            max_refs: downloads.max_refs,
        }
    }

    /// Build the standard pipeline: configured sources plus an HTTP fetcher
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let registry = SourceRegistry::from_config(config)?;
        let fetcher = HttpFetcher::new(
            config.request_timeout(),
            config.downloads.max_file_size_bytes(),
        )?;
        Ok(Self::new(&registry, Arc::new(fetcher), config))
    }

    pub async fn run(&self, references: Vec<RawReference>) -> Vec<ReferenceReport> {
        self.run_with_progress(references, None).await
    }

    pub async fn run_with_progress(
        &self,
        references: Vec<RawReference>,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Vec<ReferenceReport> {
        let prepared = self.prepare(references);
        self.run_prepared(prepared, on_progress).await
    }

    /// Apply the `max_refs` cap, normalize, and drop duplicate references.
    /// The returned length is the number of progress callbacks a run makes.
    pub fn prepare(&self, mut references: Vec<RawReference>) -> Vec<NormalizedReference> {
        if let Some(max) = self.max_refs {
            if references.len() > max {
                debug!(max, total = references.len(), "truncating reference list");
                references.truncate(max);
            }
        }
        normalize_all(references)
    }

    /// Resolve and download references that went through [`Pipeline::prepare`]
    pub async fn run_prepared(
        &self,
        normalized: Vec<NormalizedReference>,
        on_progress: Option<&ProgressFn<'_>>,
    ) -> Vec<ReferenceReport> {
        info!(references = normalized.len(), concurrency = self.concurrency, "processing references");

        let mut slots: Vec<Option<(ResolvedReference, DownloadResult)>> =
            vec![None; normalized.len()];

        let mut completed = stream::iter(normalized.into_iter().enumerate())
            .map(|(index, reference)| async move { (index, self.process_one(reference).await) })
            .buffer_unordered(self.concurrency);

        while let Some((index, (resolved, download))) = completed.next().await {
            if let Some(callback) = on_progress {
                callback(&resolved, &download);
            }
            slots[index] = Some((resolved, download));
        }

        assemble(slots.into_iter().flatten())
    }

    async fn process_one(&self, reference: NormalizedReference) -> (ResolvedReference, DownloadResult) {
        let resolution = self.coordinator.resolve(&reference).await;
        let resolved = self.links.collect(reference, resolution).await;
        let download = self.downloader.download(&resolved).await;
        (resolved, download)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DownloadStatus;
    use crate::sources::{MockFetcher, MockSource};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn config(dir: &std::path::Path) -> Config {
        let mut config = Config::default();
        config.downloads.output_dir = dir.to_path_buf();
        config.downloads.concurrency = 3;
        config
    }

    fn stub_registry() -> SourceRegistry {
        let mut registry = SourceRegistry::new();
        for id in ["crossref", "openalex"] {
            registry.register(Arc::new(MockSource::new(id)));
        }
        registry
    }

    #[tokio::test]
    async fn test_results_keep_bibliography_order() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = Arc::new(
            MockFetcher::new()
                .with_pdf("https://arxiv.org/pdf/2001.01234", b"%PDF-1.4 a")
                .with_pdf("https://arxiv.org/pdf/1706.03762", b"%PDF-1.4 b"),
        );
        let pipeline = Pipeline::new(&stub_registry(), fetcher, &config(dir.path()));

        let seen = AtomicUsize::new(0);
        let progress = |_: &ResolvedReference, _: &DownloadResult| {
            seen.fetch_add(1, Ordering::SeqCst);
        };
        let results = pipeline
            .run_with_progress(
                RawReference::from_texts([
                    "A. Title one. arXiv:2001.01234",
                    "B. Unknown thing without identifiers.",
                    "C. Title three. arXiv:1706.03762",
                    "A. Title one. arXiv:2001.01234",
                ]),
                Some(&progress),
            )
            .await;

        let ordinals: Vec<usize> = results.iter().map(|r| r.ordinal()).collect();
        assert_eq!(ordinals, vec![1, 2, 3]);
        assert_eq!(seen.load(Ordering::SeqCst), 3);
        assert_eq!(results[0].download.status, DownloadStatus::Downloaded);
        assert_eq!(results[1].download.status, DownloadStatus::NotFound);
        assert_eq!(results[2].download.status, DownloadStatus::Downloaded);
        assert!(dir.path().join("001-2001.01234.pdf").is_file());
        assert!(dir.path().join("003-1706.03762.pdf").is_file());
    }

    #[tokio::test]
    async fn test_prepared_count_matches_progress_calls() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config(dir.path());
        config.downloads.dry_run = true;
        config.downloads.max_refs = Some(4);
        let pipeline = Pipeline::new(&stub_registry(), Arc::new(MockFetcher::new()), &config);

        let prepared = pipeline.prepare(RawReference::from_texts([
            "A. Title one. doi:10.1000/one",
            "a. title one. DOI:10.1000/one",
            "B. Title two. arXiv:2001.01234",
            "B. Title two. arXiv:2001.01234",
            "C. Past the cap. doi:10.1000/three",
        ]));
        assert_eq!(prepared.len(), 2);

        let seen = AtomicUsize::new(0);
        let progress = |_: &ResolvedReference, _: &DownloadResult| {
            seen.fetch_add(1, Ordering::SeqCst);
        };
        let results = pipeline.run_prepared(prepared, Some(&progress)).await;
        assert_eq!(results.len(), 2);
        assert_eq!(seen.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(&stub_registry(), Arc::new(MockFetcher::new()), &config(dir.path()));
        assert!(pipeline.run(Vec::new()).await.is_empty());
    }
}
