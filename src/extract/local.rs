//! Heuristic reference extraction from a PDF's text layer.

use async_trait::async_trait;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

use super::{pdf, ExtractError, ReferenceExtractor};
use crate::models::RawReference;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:references|bibliography|works\s+cited)\b").expect("valid regex")
});

static LEADING_HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:references|bibliography|works\s+cited)\s*").expect("valid regex")
});

static BRACKET_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\[(\d+)\]\s+").expect("valid regex"));

static DOTTED_ENTRY_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*(\d+)[.)]\s+").expect("valid regex"));

static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

/// Fewer numbered entries than this means the numbering heuristic failed
const MIN_NUMBERED_ENTRIES: usize = 3;

/// Shortest paragraph kept by the blank-line fallback
const MIN_PARAGRAPH_CHARS: usize = 20;

/// Extracts references from the PDF text without any external service
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalExtractor;

#[async_trait]
impl ReferenceExtractor for LocalExtractor {
    fn engine(&self) -> &'static str {
        "local"
    }

    async fn extract(&self, pdf: &Path) -> Result<Vec<RawReference>, ExtractError> {
        let text = pdf::extract_text(pdf).await?;
        debug!(chars = text.len(), "extracted PDF text");

        let references = split_references(&text);
        info!(count = references.len(), "local parser extracted references");
        if references.is_empty() {
            return Err(ExtractError::NoReferences(pdf.display().to_string()));
        }
        Ok(references)
    }
}

fn floor_char_boundary(text: &str, mut index: usize) -> usize {
    while index > 0 && !text.is_char_boundary(index) {
        index -= 1;
    }
    index
}

/// Locate the bibliography near the end of the document.
///
/// Looks for the first header in the final 40% of the text, then anywhere,
/// and otherwise returns the last quarter.
pub fn find_references_block(text: &str) -> &str {
    let tail_start = floor_char_boundary(text, text.len() * 6 / 10);

    if let Some(m) = HEADER_RE.find(&text[tail_start..]) {
        return &text[tail_start + m.start()..];
    }
    if let Some(m) = HEADER_RE.find(text) {
        return &text[m.start()..];
    }
    &text[floor_char_boundary(text, text.len() * 3 / 4)..]
}

/// Collapse whitespace within each line and drop blank lines. Line breaks
/// stay so normalization can rejoin words hyphenated across lines.
fn tidy_lines(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn split_numbered(block: &str) -> Vec<String> {
    let mut entries: Vec<Vec<&str>> = Vec::new();

    for line in block.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let entry_start = BRACKET_ENTRY_RE
            .find(line)
            .or_else(|| DOTTED_ENTRY_RE.find(line));

        match entry_start {
            Some(m) => entries.push(vec![line[m.end()..].trim()]),
            None => match entries.last_mut() {
                Some(current) => current.push(line),
                // leading unnumbered lines still form an entry
                None => entries.push(vec![line]),
            },
        }
    }

    entries
        .into_iter()
        .map(|lines| tidy_lines(&lines.join("\n")))
        .filter(|entry| !entry.is_empty())
        .collect()
}

fn split_paragraphs(block: &str) -> Vec<String> {
    PARAGRAPH_BREAK_RE
        .split(block)
        .map(tidy_lines)
        .filter(|p| p.chars().count() >= MIN_PARAGRAPH_CHARS)
        .collect()
}

/// Split a document's text into references, numbered from 1.
pub fn split_references(text: &str) -> Vec<RawReference> {
    let block = find_references_block(text);
    let block = LEADING_HEADER_RE.replace(block, "");

    let mut entries = split_numbered(&block);
    if entries.len() < MIN_NUMBERED_ENTRIES {
        debug!(numbered = entries.len(), "falling back to paragraph splitting");
        entries = split_paragraphs(&block);
    }

    entries
        .into_iter()
        .enumerate()
        .map(|(i, text)| RawReference::new(i + 1, text))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paper(body_sentence: &str, bibliography: &str) -> String {
        format!("{}\n{}", body_sentence.repeat(30), bibliography)
    }

    #[test]
    fn test_bracket_numbered_entries() {
        let text = paper(
            "Our method improves on prior work. ",
            "References\n\
             [1] A. Author. First paper title. Journal, 2019.\n\
             [2] B. Author. Second paper\n\
             title continues here. Conf 2020.\n\
             [3] C. Author. Third. arXiv:2001.01234\n",
        );
        let refs = split_references(&text);
        let texts: Vec<&str> = refs.iter().map(|r| r.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "A. Author. First paper title. Journal, 2019.",
                "B. Author. Second paper\ntitle continues here. Conf 2020.",
                "C. Author. Third. arXiv:2001.01234",
            ]
        );
        assert_eq!(refs[2].ordinal, 3);
    }

    #[test]
    fn test_dotted_numbering_and_paren_numbering() {
        let text = paper(
            "Body text. ",
            "BIBLIOGRAPHY\n1. Knuth. The Art.\n2) Dijkstra. Notes.\n3. Hoare. Monitors.\n",
        );
        let refs = split_references(&text);
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[1].text, "Dijkstra. Notes.");
    }

    #[test]
    fn test_earliest_header_in_tail_wins() {
        let bibliography = "References\n\
             [1] Smith. A study of references in papers. 2001.\n\
             [2] Jones. Another. 2002.\n\
             [3] Brown. Third. 2003.\n";
        let text = paper("Results are summarized below. ", bibliography);
        let block = find_references_block(&text);
        assert!(block.starts_with("References\n[1] Smith"));
        assert_eq!(split_references(&text).len(), 3);
    }

    #[test]
    fn test_header_outside_tail() {
        let text = format!("References\n{}", "Filler text without a header. ".repeat(10));
        assert!(find_references_block(&text).starts_with("References"));
    }

    #[test]
    fn test_no_header_uses_last_quarter() {
        let text = "x".repeat(100);
        assert_eq!(find_references_block(&text).len(), 25);
    }

    #[test]
    fn test_paragraph_fallback() {
        let text = paper(
            "Body text. ",
            "Works Cited\n\n\
             Smith, John. A long enough unnumbered reference entry. 2001.\n\n\
             short\n\n\
             Jones, Amy. Another unnumbered reference that spans\n\
             two lines of text. 2005.\n",
        );
        let refs = split_references(&text);
        assert_eq!(refs.len(), 2);
        assert_eq!(
            refs[1].text,
            "Jones, Amy. Another unnumbered reference that spans\ntwo lines of text. 2005."
        );
        assert_eq!(refs[1].ordinal, 2);
    }

    #[test]
    fn test_line_wrapped_words_rejoin_after_normalize() {
        let text = paper(
            "Body text. ",
            "References\n\
             [1] Boyd, S. Convex opti-\n\
             mization methods. doi:10.1016/S0140-\n\
             6736(20)30183-5\n\
             [2] Knuth. The Art.\n\
             [3] Hoare. Monitors.\n",
        );
        let refs = split_references(&text);
        assert_eq!(refs.len(), 3);

        let normalized = crate::pipeline::normalize(refs[0].clone());
        assert_eq!(
            normalized.text,
            "Boyd, S. Convex optimization methods. doi:10.1016/S0140-6736(20)30183-5"
        );
        assert_eq!(normalized.doi.as_deref(), Some("10.1016/S0140-6736(20)30183-5"));
    }

    #[test]
    fn test_multibyte_text_does_not_panic() {
        let text = "é".repeat(101);
        let _ = split_references(&text);
    }

    #[tokio::test]
    async fn test_extract_unreadable_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("paper.pdf");
        std::fs::write(&path, b"not a pdf").unwrap();
        assert!(LocalExtractor.extract(&path).await.is_err());
    }
}
