//! Reference normalization: text cleanup and literal identifier extraction.
//!
//! Nothing here fails. Text that matches no pattern simply yields a
//! [`NormalizedReference`] with empty derived fields.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;

use crate::models::{KnownIdentifiers, NormalizedReference, RawReference};
use crate::utils::{dedup_urls, guess_title, is_valid_arxiv_id, normalize_arxiv_id, normalize_doi};

// DOIs keep their hyphen when wrapped at one
static DOI_WRAP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(10\.\d{4,9}/\S*-)[ \t]*\r?\n\s*").expect("valid regex")
});

static HYPHEN_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"([a-z])-[ \t]*\r?\n\s*([a-z])").expect("valid regex"));

static WHITESPACE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

static DOI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"10\.\d{4,9}/[-._;()/:A-Za-z0-9]+").expect("valid regex"));

static ARXIV_PREFIXED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\barxiv:\s*(\d{4}\.\d{4,5}(?:v\d+)?|[a-z][a-z\-]*(?:\.[a-z]{2})?/\d{7}(?:v\d+)?)")
        .expect("valid regex")
});

static ARXIV_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)arxiv\.org/(?:abs|pdf)/(\d{4}\.\d{4,5}(?:v\d+)?)").expect("valid regex")
});

static ARXIV_DOI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)10\.48550/arxiv\.(\d{4}\.\d{4,5}(?:v\d+)?)").expect("valid regex")
});

// "arXiv preprint 2001.01234", "arXiv 2001.01234", "(arXiv, 2001.01234)"
static ARXIV_CONTEXT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\barxiv\b[^0-9]{0,30}?\b(\d{4}\.\d{4,5}(?:v\d+)?)\b").expect("valid regex")
});

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"https?://[^\s<>"]+"#).expect("valid regex"));

/// Normalize a single raw reference.
pub fn normalize(raw: RawReference) -> NormalizedReference {
    let text = clean_text(&raw.text);
    let doi = extract_doi(&text);
    let arxiv_id = extract_arxiv_id(&text);
    let urls = extract_urls(&text);

    let known = KnownIdentifiers {
        doi: raw.hints.doi.as_deref().and_then(normalize_doi),
        arxiv_id: raw
            .hints
            .arxiv_id
            .as_deref()
            .map(normalize_arxiv_id)
            .filter(|id| !id.is_empty()),
    };

    let title_guess = raw
        .hints
        .title
        .clone()
        .filter(|t| !t.trim().is_empty())
        .or_else(|| guess_title(&text));

    NormalizedReference {
        raw,
        text,
        doi,
        arxiv_id,
        urls,
        known,
        title_guess,
    }
}

/// Normalize a reference list, dropping entries whose cleaned text repeats
/// an earlier one (case-insensitively). Survivors keep their ordinals.
pub fn normalize_all(raws: Vec<RawReference>) -> Vec<NormalizedReference> {
    let mut seen = HashSet::new();
    raws.into_iter()
        .map(normalize)
        .filter(|reference| seen.insert(reference.text.to_lowercase()))
        .collect()
}

/// Join hyphenated line breaks and collapse whitespace.
pub fn clean_text(text: &str) -> String {
    let joined = DOI_WRAP_RE.replace_all(text, "$1");
    let joined = HYPHEN_BREAK_RE.replace_all(&joined, "$1$2");
    WHITESPACE_RE.replace_all(&joined, " ").trim().to_string()
}

/// First DOI in the text, without resolver prefixes or trailing punctuation.
pub fn extract_doi(text: &str) -> Option<String> {
    let found = DOI_RE.find(text)?;
    let doi = trim_trailing(found.as_str(), &['.', ',', ';', ':']);
    normalize_doi(doi)
}

/// arXiv ID stated in the text, if well formed.
pub fn extract_arxiv_id(text: &str) -> Option<String> {
    [&*ARXIV_PREFIXED_RE, &*ARXIV_URL_RE, &*ARXIV_DOI_RE, &*ARXIV_CONTEXT_RE]
        .iter()
        .filter_map(|re| re.captures(text))
        .map(|caps| normalize_arxiv_id(&caps[1]))
        .find(|id| is_valid_arxiv_id(id))
}

/// Inline URLs in order of appearance, deduplicated.
pub fn extract_urls(text: &str) -> Vec<String> {
    let urls: Vec<String> = URL_RE
        .find_iter(text)
        .map(|m| trim_trailing(m.as_str(), &['.', ',', ';', ':', '\'', '"']).to_string())
        .filter(|url| url.len() > "https://".len())
        .collect();
    dedup_urls(urls)
}

/// Strip trailing punctuation plus closing brackets that have no opening partner.
fn trim_trailing<'a>(mut s: &'a str, punctuation: &[char]) -> &'a str {
    loop {
        let before = s.len();
        s = s.trim_end_matches(punctuation);
        for (open, close) in [('(', ')'), ('[', ']')] {
            if s.ends_with(close) && s.matches(close).count() > s.matches(open).count() {
                s = &s[..s.len() - 1];
            }
        }
        if s.len() == before {
            return s;
        }
    }
}
