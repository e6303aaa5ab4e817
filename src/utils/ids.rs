//! DOI and arXiv identifier helpers shared by the normalizer and the sources.

use regex::Regex;
use std::sync::LazyLock;

static DOI_PREFIX_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^(?:https?://(?:dx\.)?doi\.org/|doi:\s*)").expect("valid regex")
});

static NEW_ARXIV_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})(\d{2})\.(\d{4,5})(v\d+)?$").expect("valid regex"));

static OLD_ARXIV_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z\-]*(?:\.[A-Z]{2})?/\d{7}(v\d+)?$").expect("valid regex")
});

/// Strip resolver prefixes and surrounding whitespace from a DOI.
///
/// Returns `None` for strings that do not look like a DOI at all.
pub fn normalize_doi(doi: &str) -> Option<String> {
    let doi = DOI_PREFIX_RE.replace(doi.trim(), "");
    let doi = doi.trim();
    if doi.starts_with("10.") && doi.contains('/') {
        Some(doi.to_string())
    } else {
        None
    }
}

/// Strip an `arXiv:` prefix or an `arxiv.org/abs/` URL from an arXiv ID.
pub fn normalize_arxiv_id(id: &str) -> String {
    let id = id.trim();
    let lower = id.to_ascii_lowercase();
    for marker in ["/abs/", "/pdf/"] {
        if let Some(pos) = lower.find(marker) {
            let after = &id[pos + marker.len()..];
            return after.trim_end_matches(".pdf").trim_end_matches('/').to_string();
        }
    }
    if lower.starts_with("arxiv:") {
        return id[6..].trim().to_string();
    }
    id.to_string()
}

/// Whether an arXiv ID is well formed: `YYMM.NNNNN[vN]` with a real month,
/// or a legacy `archive/YYMMNNN[vN]` ID.
pub fn is_valid_arxiv_id(id: &str) -> bool {
    if let Some(caps) = NEW_ARXIV_RE.captures(id) {
        let month: u32 = caps[2].parse().unwrap_or(0);
        // 5-digit sequence numbers started in 1501
        let five_digit_ok = caps[3].len() == 4 || &caps[1] >= "15";
        return (1..=12).contains(&month) && five_digit_ok;
    }
    OLD_ARXIV_RE.is_match(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_doi() {
        assert_eq!(normalize_doi("https://doi.org/10.1000/xyz").as_deref(), Some("10.1000/xyz"));
        assert_eq!(normalize_doi("http://dx.doi.org/10.1000/xyz").as_deref(), Some("10.1000/xyz"));
        assert_eq!(normalize_doi("doi: 10.1000/xyz ").as_deref(), Some("10.1000/xyz"));
        assert_eq!(normalize_doi("not a doi"), None);
    }

    #[test]
    fn test_normalize_arxiv_id() {
        assert_eq!(normalize_arxiv_id("arXiv:2001.01234"), "2001.01234");
        assert_eq!(normalize_arxiv_id("https://arxiv.org/abs/2001.01234v2"), "2001.01234v2");
        assert_eq!(normalize_arxiv_id("https://arxiv.org/pdf/2001.01234.pdf"), "2001.01234");
        assert_eq!(normalize_arxiv_id("hep-th/9901001"), "hep-th/9901001");
    }

    #[test]
    fn test_arxiv_id_validation() {
        assert!(is_valid_arxiv_id("2001.01234"));
        assert!(is_valid_arxiv_id("1706.03762v5"));
        assert!(is_valid_arxiv_id("0704.0001"));
        assert!(is_valid_arxiv_id("hep-th/9901001"));
        assert!(is_valid_arxiv_id("math.AG/0601001"));
        assert!(!is_valid_arxiv_id("2013.01234"));
        assert!(!is_valid_arxiv_id("1201.12345"));
        assert!(!is_valid_arxiv_id("2001.123"));
    }
}
