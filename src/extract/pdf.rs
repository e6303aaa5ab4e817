//! PDF text extraction using the pdf-extract crate.

use std::path::Path;

use super::ExtractError;

/// Extract the text of every page of a PDF.
///
/// pdf-extract panics on some malformed files, so the work runs on a
/// blocking thread and a panic there surfaces as an error.
pub async fn extract_text(path: &Path) -> Result<String, ExtractError> {
    if !path.is_file() {
        return Err(ExtractError::PdfText(format!(
            "File not found: {}",
            path.display()
        )));
    }

    let owned = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || pdf_extract::extract_text(&owned))
        .await
        .map_err(|e| ExtractError::PdfText(format!("extraction aborted: {}", e)))?
        .map_err(|e| ExtractError::PdfText(e.to_string()))?;

    if text.trim().is_empty() {
        tracing::debug!("Extracted empty text from PDF: {}", path.display());
        return Err(ExtractError::PdfText(format!(
            "no text layer in {} (scanned PDF?)",
            path.display()
        )));
    }

    Ok(text)
}
