//! Report assembly and writing.

use std::io;
use std::path::{Path, PathBuf};

use crate::models::{DownloadResult, ReferenceReport, Report, ResolvedReference};

/// File name of the report inside the output directory
pub const REPORT_FILE: &str = "report.json";

/// Pair every resolved reference with its download result, in bibliography order.
pub fn assemble<I>(entries: I) -> Vec<ReferenceReport>
where
    I: IntoIterator<Item = (ResolvedReference, DownloadResult)>,
{
    let mut results: Vec<ReferenceReport> = entries
        .into_iter()
        .map(|(resolved, download)| ReferenceReport { resolved, download })
        .collect();
    results.sort_by_key(ReferenceReport::ordinal);
    results
}

/// Write `report` as pretty JSON to `<output_dir>/report.json`.
pub fn write_report(output_dir: &Path, report: &Report) -> io::Result<PathBuf> {
    std::fs::create_dir_all(output_dir)?;
    let path = output_dir.join(REPORT_FILE);
    let json = serde_json::to_string_pretty(report).map_err(io::Error::other)?;
    std::fs::write(&path, json)?;
    Ok(path)
}
