//! Link collection: turns a resolution into an ordered download URL list.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::models::{NormalizedReference, ResolutionStatus, ResolvedReference};
use crate::pipeline::Resolution;
use crate::sources::{ArxivSource, Source};
use crate::utils::dedup_urls;

/// Gathers candidate download URLs for resolved references
#[derive(Debug, Clone, Default)]
pub struct LinkCollector {
    open_access: Option<Arc<dyn Source>>,
}

impl LinkCollector {
    /// `open_access` is consulted for DOIs when present (Unpaywall)
    pub fn new(open_access: Option<Arc<dyn Source>>) -> Self {
        Self { open_access }
    }

    /// Build the [`ResolvedReference`] for a reference and its resolution.
    ///
    /// URL order: arXiv PDF, the winning source's own links (PDFs first),
    /// `doi.org` redirect, open-access lookup, inline URL.
    pub async fn collect(&self, reference: NormalizedReference, resolution: Resolution) -> ResolvedReference {
        let Some(best) = resolution.best else {
            let candidate_urls = reference.urls.first().cloned().into_iter().collect();
            return ResolvedReference {
                reference,
                status: resolution.status,
                reason: resolution.reason,
                identifier: None,
                doi: None,
                arxiv_id: None,
                source: None,
                confidence: None,
                title: None,
                candidate_urls,
            };
        };

        let mut urls = Vec::new();

        if let Some(arxiv_id) = &best.arxiv_id {
            urls.push(ArxivSource::pdf_url(arxiv_id));
        }

        let (pdf_links, other_links): (Vec<_>, Vec<_>) =
            best.links.iter().partition(|link| link.is_pdf());
        urls.extend(pdf_links.into_iter().map(|link| link.url.clone()));
        urls.extend(other_links.into_iter().map(|link| link.url.clone()));

        if let Some(doi) = &best.doi {
            urls.push(format!("https://doi.org/{}", doi));
            if let Some(url) = self.open_access_url(doi).await {
                urls.push(url);
            }
        }

        if let Some(inline) = reference.inline_url() {
            urls.push(inline.to_string());
        }

        let candidate_urls = dedup_urls(urls);
        debug!(ordinal = reference.ordinal(), urls = candidate_urls.len(), "links collected");

        ResolvedReference {
            reference,
            status: ResolutionStatus::Resolved,
            reason: resolution.reason,
            identifier: best.identifier(),
            doi: best.doi.clone(),
            arxiv_id: best.arxiv_id.clone(),
            source: Some(best.source),
            confidence: Some(best.confidence),
            title: best.title.clone(),
            candidate_urls,
        }
    }

    async fn open_access_url(&self, doi: &str) -> Option<String> {
        let source = self.open_access.as_ref()?;
        match source.open_access_url(doi).await {
            Ok(url) => url,
            Err(e) => {
                warn!(doi, source = source.id(), error = %e, "open-access lookup failed");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        CandidateSource, FullTextLink, Identifier, RawReference, ResolutionCandidate,
    };
    use crate::pipeline::normalize;
    use crate::sources::MockSource;
    use crate::utils::normalize_url;

    #[tokio::test]
    async fn test_link_order() {
        let unpaywall = Arc::new(
            MockSource::new("unpaywall").with_open_access("https://repo.example.org/oa.pdf"),
        );
        let collector = LinkCollector::new(Some(unpaywall.clone()));
        let reference = normalize(RawReference::new(
            3,
            "Author. Title. Venue 2021. https://author.example.org/paper",
        ));
        let best = ResolutionCandidate::new(CandidateSource::Crossref, 0.9)
            .doi("10.1000/xyz")
            .arxiv_id("2101.00001")
            .link(FullTextLink::new("https://publisher.example/html/xyz"))
            .link(FullTextLink::pdf("https://publisher.example/pdf/xyz"));

        let resolved = collector.collect(reference, Resolution::resolved(best)).await;

        assert_eq!(
            resolved.candidate_urls,
            vec![
                "https://arxiv.org/pdf/2101.00001",
                "https://publisher.example/pdf/xyz",
                "https://publisher.example/html/xyz",
                "https://doi.org/10.1000/xyz",
                "https://repo.example.org/oa.pdf",
                "https://author.example.org/paper",
            ]
        );
        assert_eq!(resolved.identifier, Some(Identifier::Doi("10.1000/xyz".to_string())));
        assert_eq!(resolved.source, Some(CandidateSource::Crossref));
        assert_eq!(unpaywall.calls(), 1);
    }

    #[tokio::test]
    async fn test_arxiv_only_and_dedup() {
        let collector = LinkCollector::default();
        let reference = normalize(RawReference::new(
            1,
            "Smith, J. (2020). Title X. arXiv:2001.01234 http://arxiv.org/pdf/2001.01234/",
        ));
        let best = ResolutionCandidate::new(CandidateSource::Inline, 1.0).arxiv_id("2001.01234");

        let resolved = collector.collect(reference, Resolution::resolved(best)).await;

        assert_eq!(resolved.candidate_urls, vec!["https://arxiv.org/pdf/2001.01234"]);
        assert_eq!(resolved.identifier, Some(Identifier::Arxiv("2001.01234".to_string())));
    }

    #[tokio::test]
    async fn test_unresolved_keeps_only_inline_url() {
        let collector = LinkCollector::default();
        let reference = normalize(RawReference::new(
            1,
            "Blog post. https://blog.example/post and https://other.example/",
        ));

        let resolved = collector.collect(reference, Resolution::unresolved()).await;
        assert_eq!(resolved.status, ResolutionStatus::Unresolved);
        assert!(resolved.identifier.is_none());
        assert_eq!(resolved.candidate_urls, vec!["https://blog.example/post"]);
    }

    #[tokio::test]
    async fn test_open_access_failure_is_ignored() {
        let failing = Arc::new(MockSource::new("unpaywall").with_open_access("x").failing());
        let collector = LinkCollector::new(Some(failing));
        let reference = normalize(RawReference::new(1, "Some reference"));
        let best = ResolutionCandidate::new(CandidateSource::OpenAlex, 0.8).doi("10.1000/a");

        let resolved = collector.collect(reference, Resolution::resolved(best)).await;
        assert_eq!(resolved.candidate_urls, vec!["https://doi.org/10.1000/a"]);
    }

    #[tokio::test]
    async fn test_collected_urls_are_normalized_unique() {
        let collector = LinkCollector::default();
        let reference = normalize(RawReference::new(1, "X. https://doi.org/10.1000/a/"));
        let best = ResolutionCandidate::new(CandidateSource::Inline, 1.0)
            .doi("10.1000/a")
            .link(FullTextLink::pdf("http://www.doi.org/10.1000/a"));

        let resolved = collector.collect(reference, Resolution::resolved(best)).await;
        let keys: Vec<String> = resolved.candidate_urls.iter().map(|u| normalize_url(u)).collect();
        let mut unique = keys.clone();
        unique.dedup();
        assert_eq!(keys, unique);
        assert_eq!(dedup_urls(resolved.candidate_urls.clone()), resolved.candidate_urls);
    }
}
