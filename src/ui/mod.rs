//! Terminal output for the command-line tool.
//!
//! A progress bar on stderr while references are processed, and a colored
//! per-reference summary once the report has been written.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use owo_colors::OwoColorize;
use std::io::IsTerminal;
use std::path::Path;

use crate::models::{CandidateSource, DownloadStatus, ReferenceReport, Report};

/// Check if stderr is a terminal.
pub fn is_terminal() -> bool {
    std::io::stderr().is_terminal()
}

/// Icons for the source that supplied an identifier.
pub fn source_icon(source: CandidateSource) -> &'static str {
    match source {
        CandidateSource::Inline => "📌",
        CandidateSource::ArXiv => "📝",
        CandidateSource::Crossref => "🔗",
        CandidateSource::OpenAlex => "🔗",
        CandidateSource::SemanticScholar => "🧠",
    }
}

/// Status icons for download outcomes.
pub fn status_icon(status: DownloadStatus) -> &'static str {
    match status {
        DownloadStatus::Downloaded => "✓",
        DownloadStatus::NotFound => "✗",
        DownloadStatus::NetworkError => "⚠",
        DownloadStatus::InvalidContent => "⚠",
        DownloadStatus::Skipped => "○",
    }
}

/// Truncate text to `max_chars`, ending with an ellipsis when cut.
pub fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if max_chars <= 3 {
        return "...".to_string();
    }
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars - 3).collect();
    format!("{}...", kept.trim_end())
}

/// Get a human-readable file size.
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// Progress over the reference list, drawn only on an interactive stderr
pub struct ReferenceProgress {
    pb: ProgressBar,
}

impl ReferenceProgress {
    pub fn new(total: usize) -> Self {
        let pb = ProgressBar::new(total as u64);
        if !is_terminal() {
            pb.set_draw_target(ProgressDrawTarget::hidden());
        }
        pb.set_style(
            ProgressStyle::with_template(
                "{spinner:.cyan} {msg:30} {bar:40.cyan/blue} {pos}/{len} ({elapsed})",
            )
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .progress_chars("█▓▒░ "),
        );
        pb.set_message("Resolving references");
        Self { pb }
    }

    /// Record one finished reference.
    pub fn advance(&self, ordinal: usize, status: DownloadStatus) {
        self.pb.set_message(format!("[{}] {}", ordinal, status));
        self.pb.inc(1);
    }

    pub fn finish(&self) {
        self.pb.finish_and_clear();
    }
}

/// Print a section header.
pub fn print_section(title: &str) {
    println!();
    println!("{}", format!("━━━ {} ━━━", title).bold().cyan());
}

fn print_entry(entry: &ReferenceReport) {
    let status = entry.download.status;
    let icon = status_icon(status);
    let icon = match status {
        DownloadStatus::Downloaded => icon.green().bold().to_string(),
        DownloadStatus::Skipped => icon.white().dimmed().to_string(),
        DownloadStatus::NotFound => icon.red().bold().to_string(),
        _ => icon.yellow().bold().to_string(),
    };

    println!(
        "{} {:>3}. {}",
        icon,
        entry.ordinal(),
        truncate_with_ellipsis(&entry.resolved.reference.text, 90)
    );

    match (&entry.resolved.identifier, entry.resolved.source) {
        (Some(identifier), Some(source)) => println!(
            "       {} {} via {}",
            source_icon(source),
            identifier.as_str().cyan(),
            source.name().green()
        ),
        _ => println!("       {}", "no identifier".dimmed()),
    }

    match &entry.download.path {
        Some(path) => {
            let size = std::fs::metadata(path).map(|m| m.len()).unwrap_or(0);
            println!(
                "       {} {} ({})",
                "→".magenta(),
                path.display(),
                format_file_size(size)
            );
        }
        None => println!("       {} {}", status.label().yellow(), entry.download.reason.dimmed()),
    }
}

/// Print every reference and the totals.
pub fn print_summary(report: &Report, report_path: &Path) {
    print_section(&format!("{} references from {}", report.count, report.input));
    for entry in &report.results {
        print_entry(entry);
    }

    let summary = &report.summary;
    println!();
    println!(
        "{} resolved, {} unresolved | {} downloaded, {} not found, {} skipped",
        summary.resolved.to_string().green().bold(),
        summary.unresolved.to_string().red(),
        summary.downloaded.to_string().green().bold(),
        summary.not_found.to_string().red(),
        summary.skipped.to_string().dimmed()
    );
    println!("Report written to {}", report_path.display().to_string().cyan());
}
