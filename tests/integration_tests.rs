//! Integration tests for Citation Downloader
//!
//! These tests drive the public pipeline end to end with stub resolvers and an
//! in-memory fetcher, so no network access is needed.

use citation_downloader::config::Config;
use citation_downloader::extract::parse_tei;
use citation_downloader::models::{
    CandidateSource, DownloadStatus, FullTextLink, Identifier, RawReference, Report,
    ResolutionCandidate, ResolutionStatus,
};
use citation_downloader::pipeline::{write_report, Pipeline, UNRESOLVED_REASON};
use citation_downloader::sources::{
    CrossRefSource, MockFetcher, MockSource, Source, SourceRegistry,
};
use citation_downloader::utils::HttpClient;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

struct Stubs {
    resolvers: Vec<Arc<MockSource>>,
    registry: SourceRegistry,
}

/// All four resolvers, each returning nothing unless given candidates
fn stubs(crossref: Vec<ResolutionCandidate>) -> Stubs {
    let resolvers = vec![
        Arc::new(MockSource::new("arxiv")),
        Arc::new(MockSource::new("crossref").with_candidates(crossref)),
        Arc::new(MockSource::new("openalex")),
        Arc::new(MockSource::new("semantic")),
    ];
    let mut registry = SourceRegistry::new();
    for resolver in &resolvers {
        registry.register(resolver.clone() as Arc<dyn Source>);
    }
    Stubs {
        resolvers,
        registry,
    }
}

impl Stubs {
    fn total_calls(&self) -> usize {
        self.resolvers.iter().map(|r| r.calls()).sum()
    }
}

fn config(out: &Path) -> Config {
    let mut config = Config::default();
    config.downloads.output_dir = out.to_path_buf();
    config
}

#[tokio::test]
async fn test_inline_arxiv_reference_is_downloaded() {
    let dir = tempfile::tempdir().unwrap();
    let stubs = stubs(Vec::new());
    let fetcher = Arc::new(
        MockFetcher::new().with_pdf("https://arxiv.org/pdf/2001.01234", b"%PDF-1.5 content"),
    );
    let pipeline = Pipeline::new(&stubs.registry, fetcher.clone(), &config(dir.path()));

    let results = pipeline
        .run(vec![RawReference::new(
            1,
            "Smith, J. (2020). Title X. arXiv:2001.01234",
        )])
        .await;

    assert_eq!(results.len(), 1);
    let entry = &results[0];
    assert_eq!(entry.resolved.status, ResolutionStatus::Resolved);
    assert_eq!(
        entry.resolved.identifier,
        Some(Identifier::Arxiv("2001.01234".to_string()))
    );
    assert_eq!(entry.resolved.source, Some(CandidateSource::Inline));
    assert_eq!(entry.resolved.confidence, Some(1.0));
    assert_eq!(
        entry.resolved.candidate_urls,
        vec!["https://arxiv.org/pdf/2001.01234"]
    );
    assert_eq!(entry.download.status, DownloadStatus::Downloaded);

    let path = entry.download.path.as_ref().unwrap();
    assert_eq!(std::fs::read(path).unwrap(), b"%PDF-1.5 content");
    assert_eq!(stubs.total_calls(), 0);
}

#[tokio::test]
async fn test_reference_without_identifiers_is_not_found() {
    let dir = tempfile::tempdir().unwrap();
    let stubs = stubs(Vec::new());
    let fetcher = Arc::new(MockFetcher::new());
    let pipeline = Pipeline::new(&stubs.registry, fetcher.clone(), &config(dir.path()));

    let results = pipeline
        .run(vec![RawReference::new(
            1,
            "Doe, A. An unpublished manuscript on something obscure. 1987.",
        )])
        .await;

    let entry = &results[0];
    assert_eq!(entry.resolved.status, ResolutionStatus::Unresolved);
    assert_eq!(entry.resolved.reason.as_deref(), Some(UNRESOLVED_REASON));
    assert!(entry.resolved.identifier.is_none());
    assert!(entry.resolved.candidate_urls.is_empty());
    assert_eq!(entry.download.status, DownloadStatus::NotFound);
    assert_eq!(entry.download.reason, "no candidate URLs");
    assert_eq!(fetcher.calls(), 0);
    // arXiv is only consulted for known IDs
    assert_eq!(stubs.total_calls(), 3);
}

#[tokio::test]
async fn test_dry_run_never_fetches() {
    let dir = tempfile::tempdir().unwrap();
    let stubs = stubs(vec![ResolutionCandidate::new(CandidateSource::Crossref, 0.9)
        .doi("10.1000/example")
        .link(FullTextLink::pdf("https://publisher.example/example.pdf"))]);
    let fetcher = Arc::new(MockFetcher::new());
    let mut config = config(dir.path());
    config.downloads.dry_run = true;
    let pipeline = Pipeline::new(&stubs.registry, fetcher.clone(), &config);

    let results = pipeline
        .run(RawReference::from_texts([
            "Smith, J. (2020). Title X. arXiv:2001.01234",
            "Roe, R. A resolved article title in a journal. 2019.",
            "https://blog.example/post about things",
        ]))
        .await;

    assert_eq!(results.len(), 3);
    assert!(results
        .iter()
        .all(|r| r.download.status == DownloadStatus::Skipped));
    assert_eq!(results[1].resolved.doi.as_deref(), Some("10.1000/example"));
    assert_eq!(
        results[1].resolved.candidate_urls,
        vec![
            "https://publisher.example/example.pdf",
            "https://doi.org/10.1000/example",
        ]
    );
    assert_eq!(fetcher.calls(), 0);
}

#[tokio::test]
async fn test_max_refs_truncates_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let stubs = stubs(Vec::new());
    let mut config = config(dir.path());
    config.downloads.max_refs = Some(2);
    config.downloads.dry_run = true;
    let pipeline = Pipeline::new(&stubs.registry, Arc::new(MockFetcher::new()), &config);

    let results = pipeline
        .run(RawReference::from_texts([
            "First reference. doi:10.1000/one",
            "Second reference. doi:10.1000/two",
            "Third reference. doi:10.1000/three",
            "Fourth reference. doi:10.1000/four",
            "Fifth reference. doi:10.1000/five",
        ]))
        .await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].ordinal(), 1);
    assert_eq!(results[1].ordinal(), 2);
    assert_eq!(results[1].resolved.doi.as_deref(), Some("10.1000/two"));
}

#[tokio::test]
async fn test_failed_urls_fall_through_to_next_candidate() {
    let dir = tempfile::tempdir().unwrap();
    let stubs = stubs(vec![ResolutionCandidate::new(CandidateSource::Crossref, 0.95)
        .doi("10.1000/paywalled")
        .link(FullTextLink::pdf("https://publisher.example/paywalled.pdf"))]);
    let fetcher = Arc::new(
        MockFetcher::new()
            .with_status("https://publisher.example/paywalled.pdf", 403)
            .with_html(
                "https://doi.org/10.1000/paywalled",
                r#"<html><body><a href="/files/free-copy.pdf">PDF</a></body></html>"#,
            )
            .with_pdf("https://doi.org/files/free-copy.pdf", b"%PDF-1.4 free"),
    );
    let pipeline = Pipeline::new(&stubs.registry, fetcher.clone(), &config(dir.path()));

    let results = pipeline
        .run(vec![RawReference::new(1, "Roe, R. Paywalled work. Journal 2019.")])
        .await;

    let download = &results[0].download;
    assert_eq!(download.status, DownloadStatus::Downloaded);
    assert_eq!(download.url.as_deref(), Some("https://doi.org/files/free-copy.pdf"));
    assert_eq!(download.attempts.len(), 3);
    assert_eq!(download.attempts[0].status, DownloadStatus::NetworkError);
    assert_eq!(download.attempts[1].status, DownloadStatus::InvalidContent);
}

#[tokio::test]
async fn test_tei_to_report() {
    let tei = r#"<TEI xmlns="http://www.tei-c.org/ns/1.0"><text><back><listBibl>
        <biblStruct>
          <analytic>
            <title level="a">A known DOI work</title>
            <author><persName><forename>Ada</forename><surname>Lovelace</surname></persName></author>
          </analytic>
          <monogr><imprint><date when="1843"/></imprint></monogr>
          <idno type="DOI">10.1000/notes</idno>
        </biblStruct>
    </listBibl></back></text></TEI>"#;
    let references = parse_tei(tei).unwrap();
    assert_eq!(references[0].text, "Lovelace, Ada (1843) A known DOI work");

    // the extracted DOI is confirmed with a direct Crossref lookup
    let mut server = mockito::Server::new_async().await;
    let lookup = server
        .mock("GET", "/works/10.1000/notes")
        .match_query(mockito::Matcher::Any)
        .with_status(200)
        .with_body(r#"{"message": {"DOI": "10.1000/notes", "title": ["A known DOI work"]}}"#)
        .create_async()
        .await;

    let client = Arc::new(HttpClient::new(Duration::from_secs(5)).unwrap());
    let openalex = Arc::new(MockSource::new("openalex"));
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(CrossRefSource::new(client, 5).with_base_url(server.url())));
    registry.register(openalex.clone());

    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.downloads.dry_run = true;
    let pipeline = Pipeline::new(&registry, Arc::new(MockFetcher::new()), &config);

    let results = pipeline.run(references).await;
    lookup.assert_async().await;
    assert_eq!(results[0].resolved.doi.as_deref(), Some("10.1000/notes"));
    assert_eq!(results[0].resolved.source, Some(CandidateSource::Crossref));
    assert_eq!(results[0].resolved.confidence, Some(1.0));
    assert_eq!(openalex.calls(), 0);

    let report = Report::new("paper.pdf", "grobid", results);
    let path = write_report(dir.path(), &report).unwrap();
    let value: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert_eq!(value["engine"], "grobid");
    assert_eq!(value["results"][0]["status"], "skipped");
    assert_eq!(
        value["results"][0]["candidate_urls"],
        serde_json::json!(["https://doi.org/10.1000/notes"])
    );
}

#[tokio::test]
async fn test_extracted_doi_survives_crossref_miss() {
    let mut server = mockito::Server::new_async().await;
    let lookup = server
        .mock("GET", "/works/10.5281/zenodo.1234567")
        .match_query(mockito::Matcher::Any)
        .with_status(404)
        .create_async()
        .await;

    let client = Arc::new(HttpClient::new(Duration::from_secs(5)).unwrap());
    let openalex = Arc::new(MockSource::new("openalex"));
    let mut registry = SourceRegistry::new();
    registry.register(Arc::new(CrossRefSource::new(client, 5).with_base_url(server.url())));
    registry.register(openalex.clone());

    let dir = tempfile::tempdir().unwrap();
    let mut config = config(dir.path());
    config.downloads.dry_run = true;
    let pipeline = Pipeline::new(&registry, Arc::new(MockFetcher::new()), &config);

    let mut reference = RawReference::new(1, "Doe, J. (2021) Dataset release. Zenodo.");
    reference.hints.doi = Some("10.5281/zenodo.1234567".to_string());
    let results = pipeline.run(vec![reference]).await;

    lookup.assert_async().await;
    let resolved = &results[0].resolved;
    assert_eq!(resolved.status, ResolutionStatus::Resolved);
    assert_eq!(resolved.doi.as_deref(), Some("10.5281/zenodo.1234567"));
    assert_eq!(
        resolved.candidate_urls,
        vec!["https://doi.org/10.5281/zenodo.1234567"]
    );
    assert_eq!(openalex.calls(), 0);
}
