use anyhow::{bail, Context, Result};
use citation_downloader::config::{find_config_file, load_config, Config};
use citation_downloader::extract::{extractor_for, fetch_paper, Engine};
use citation_downloader::models::{DownloadResult, Report, ResolvedReference};
use citation_downloader::pipeline::{write_report, HttpFetcher, Pipeline};
use citation_downloader::ui::{self, ReferenceProgress};
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Citation Downloader - extract a paper's references and download the cited PDFs
#[derive(Parser, Debug)]
#[command(name = "citation-downloader")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Extract citations and download cited PDFs from a paper (PDF or URL)", long_about = None)]
#[command(group(ArgGroup::new("input").required(true).args(["pdf", "url"])))]
struct Cli {
    /// Path to a local PDF file
    #[arg(long, value_name = "FILE")]
    pdf: Option<PathBuf>,

    /// URL of a paper (PDF or landing page)
    #[arg(long)]
    url: Option<String>,

    /// Output directory for PDFs and report.json
    #[arg(long, value_name = "DIR")]
    out: Option<PathBuf>,

    /// Limit the number of references processed
    #[arg(long)]
    max_refs: Option<usize>,

    /// Only resolve links, do not download
    #[arg(long)]
    dry_run: bool,

    /// Contact email; enables the Unpaywall lookup
    #[arg(long)]
    email: Option<String>,

    /// Network timeout in seconds
    #[arg(long)]
    timeout: Option<u64>,

    /// GROBID server URL
    #[arg(long)]
    grobid_url: Option<String>,

    /// GROBID consolidateCitations level
    #[arg(long, value_parser = clap::value_parser!(u8).range(0..=2))]
    grobid_consolidate: Option<u8>,

    /// Reference extraction engine
    #[arg(long, value_enum, default_value_t = Engine::Grobid)]
    extractor: Engine,

    /// References processed in parallel
    #[arg(long)]
    concurrency: Option<usize>,

    /// Configuration file path
    #[arg(long)]
    config: Option<PathBuf>,

    /// Enable verbose logging (-v, -vv)
    #[arg(long, short, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(long, short)]
    quiet: bool,
}

impl Cli {
    /// Command-line flags override whatever the config file and environment set
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(out) = &self.out {
            config.downloads.output_dir = out.clone();
        }
        if let Some(max_refs) = self.max_refs {
            config.downloads.max_refs = Some(max_refs);
        }
        if self.dry_run {
            config.downloads.dry_run = true;
        }
        if let Some(email) = &self.email {
            config.unpaywall_email = Some(email.clone());
        }
        if let Some(timeout) = self.timeout {
            config.downloads.timeout_secs = timeout;
        }
        if let Some(url) = &self.grobid_url {
            config.grobid.url = url.clone();
        }
        if let Some(level) = self.grobid_consolidate {
            config.grobid.consolidate_citations = level;
        }
        if let Some(concurrency) = self.concurrency {
            config.downloads.concurrency = concurrency;
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_level = match cli.verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let env_filter = if cli.quiet { "error" } else { log_level };

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| format!("citation_downloader={}", env_filter)),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config_path = cli.config.clone().or_else(find_config_file);
    if let Some(path) = &config_path {
        info!("Using config file: {}", path.display());
    }
    let mut config = load_config(config_path.as_deref()).context("failed to load configuration")?;
    cli.apply_overrides(&mut config);

    // A fetched paper lives in a temp file until extraction is done
    let mut input_file = None;
    let (pdf_path, input) = match (&cli.pdf, &cli.url) {
        (Some(pdf), _) => {
            if !pdf.is_file() {
                bail!("PDF not found: {}", pdf.display());
            }
            (pdf.clone(), pdf.display().to_string())
        }
        (None, Some(url)) => {
            info!("Fetching URL: {}", url);
            let fetcher = HttpFetcher::new(
                config.request_timeout(),
                config.downloads.max_file_size_bytes(),
            )
            .context("failed to create HTTP client")?;
            let file = fetch_paper(url, &fetcher, config.downloads.max_file_size_bytes())
                .await
                .context("could not locate a PDF at the provided URL")?;
            let path = file.path().to_path_buf();
            input_file = Some(file);
            (path, url.clone())
        }
        (None, None) => bail!("either --pdf or --url is required"),
    };

    let extractor = extractor_for(cli.extractor, &config).context("failed to set up extractor")?;
    info!("Extracting references from {} with {}", input, extractor.engine());
    let references = extractor
        .extract(&pdf_path)
        .await
        .with_context(|| format!("reference extraction failed for {}", input))?;
    drop(input_file);
    info!("Found {} references", references.len());

    let pipeline = Pipeline::from_config(&config).context("failed to set up resolvers")?;

    let prepared = pipeline.prepare(references);
    let progress = ReferenceProgress::new(prepared.len());
    let on_progress = |resolved: &ResolvedReference, download: &DownloadResult| {
        progress.advance(resolved.ordinal(), download.status);
    };
    let results = pipeline.run_prepared(prepared, Some(&on_progress)).await;
    progress.finish();

    let report = Report::new(input, extractor.engine(), results);
    let report_path = write_report(&config.downloads.output_dir, &report).with_context(|| {
        format!(
            "failed to write report to {}",
            config.downloads.output_dir.display()
        )
    })?;

    if !cli.quiet {
        ui::print_summary(&report, &report_path);
    }

    Ok(())
}
