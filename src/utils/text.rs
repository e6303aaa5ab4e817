//! Text helpers: title matching, title guessing and file-name slugs.

use regex::Regex;
use std::sync::LazyLock;
use strsim::jaro_winkler;

static QUOTED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[“"]([^”"]{10,})[”"]"#).expect("valid regex"));

static YEAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\(?\b(?:19|20)\d{2}[a-z]?\)?[.,:]\s+").expect("valid regex"));

/// Lower-case, strip punctuation, collapse whitespace.
pub fn normalize_title(title: &str) -> String {
    title
        .chars()
        .map(|c| if c.is_alphanumeric() { c.to_ascii_lowercase() } else { ' ' })
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Jaro-Winkler similarity of two normalized titles, 0.0 when either is empty.
pub fn title_similarity(a: &str, b: &str) -> f64 {
    let a = normalize_title(a);
    let b = normalize_title(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    jaro_winkler(&a, &b)
}

/// Confidence that a search hit with `found_title` is the referenced work.
///
/// Uses the title guess when there is one; a found title that appears
/// verbatim inside the reference text scores at least 0.9.
pub fn match_confidence(reference_text: &str, title_guess: Option<&str>, found_title: &str) -> f64 {
    let found = normalize_title(found_title);
    if found.is_empty() {
        return 0.0;
    }

    let similarity = title_guess
        .map(|guess| title_similarity(guess, found_title))
        .unwrap_or(0.0);

    let contained = found.split_whitespace().count() >= 3
        && normalize_title(reference_text).contains(&found);

    if contained {
        similarity.max(0.9)
    } else {
        similarity
    }
}

/// Best-effort title extraction from a free-form reference string.
///
/// Tries a quoted segment first, then the sentence following the
/// publication year, then the longest sentence after the author list.
pub fn guess_title(text: &str) -> Option<String> {
    if let Some(caps) = QUOTED_RE.captures(text) {
        let quoted = caps[1].trim().trim_end_matches([',', '.']);
        if quoted.split_whitespace().count() >= 2 {
            return Some(quoted.to_string());
        }
    }

    if let Some(m) = YEAR_RE.find(text) {
        let rest = &text[m.end()..];
        let sentence = first_sentence(rest);
        if sentence.split_whitespace().count() >= 2 {
            return Some(sentence.to_string());
        }
    }

    text.split(". ")
        .skip(1)
        .map(str::trim)
        .filter(|s| s.split_whitespace().count() >= 3)
        .max_by_key(|s| s.len())
        .map(|s| s.trim_end_matches('.').to_string())
}

fn first_sentence(text: &str) -> &str {
    let end = text
        .find(". ")
        .or_else(|| text.find('?').map(|i| i + 1))
        .unwrap_or(text.len());
    text[..end].trim().trim_end_matches('.')
}

/// File-system safe slug: ASCII alphanumerics plus `._-`, capped in length.
pub fn slugify(text: &str, max_len: usize) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut last_dash = false;
    for c in text.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '_') {
            slug.push(c);
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }

    let mut slug = slug.trim_matches(|c| matches!(c, '-' | '.' | '_')).to_string();
    if slug.len() > max_len {
        slug.truncate(max_len);
        slug = slug
            .trim_end_matches(|c| matches!(c, '-' | '.' | '_'))
            .to_string();
    }

    if slug.is_empty() {
        "file".to_string()
    } else {
        slug
    }
}
