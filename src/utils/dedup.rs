//! URL normalization and order-preserving deduplication.

use std::collections::HashSet;
use url::Url;

/// Comparison key for a URL: scheme-insensitive host + path + query,
/// trailing slash stripped, fragment dropped.
pub fn normalize_url(raw: &str) -> String {
    let trimmed = raw.trim();
    match Url::parse(trimmed) {
        Ok(url) if url.has_host() => {
            let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
            let host = host.strip_prefix("www.").unwrap_or(&host).to_string();
            let mut key = host;
            if let Some(port) = url.port() {
                key.push_str(&format!(":{}", port));
            }
            key.push_str(url.path().trim_end_matches('/'));
            if let Some(query) = url.query() {
                key.push('?');
                key.push_str(query);
            }
            key
        }
        _ => trimmed.trim_end_matches('/').to_ascii_lowercase(),
    }
}

/// Remove duplicate URLs, keeping the first occurrence of each.
pub fn dedup_urls<I, S>(urls: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut seen: HashSet<String> = HashSet::new();
    let mut out = Vec::new();

    for url in urls {
        let url = url.into();
        if url.trim().is_empty() {
            continue;
        }
        if seen.insert(normalize_url(&url)) {
            out.push(url);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_ignores_scheme_and_trailing_slash() {
        assert_eq!(
            normalize_url("http://Example.org/paper/"),
            normalize_url("https://example.org/paper")
        );
        assert_eq!(normalize_url("https://www.example.org/a"), "example.org/a");
    }

    #[test]
    fn test_normalize_keeps_query_drops_fragment() {
        assert_eq!(
            normalize_url("https://example.org/get?id=1#page=2"),
            "example.org/get?id=1"
        );
        assert_ne!(
            normalize_url("https://example.org/get?id=1"),
            normalize_url("https://example.org/get?id=2")
        );
    }

    #[test]
    fn test_dedup_keeps_first_occurrence() {
        let urls = dedup_urls([
            "https://arxiv.org/pdf/2001.01234",
            "https://doi.org/10.1000/xyz",
            "http://arxiv.org/pdf/2001.01234/",
            "https://doi.org/10.1000/xyz",
        ]);
        assert_eq!(
            urls,
            vec![
                "https://arxiv.org/pdf/2001.01234".to_string(),
                "https://doi.org/10.1000/xyz".to_string(),
            ]
        );
    }

    #[test]
    fn test_dedup_is_idempotent() {
        let input = vec![
            "https://example.org/a/",
            "http://example.org/a",
            "https://example.org/b?x=1",
            "not a url",
            "NOT A URL",
            "",
        ];
        let once = dedup_urls(input);
        let twice = dedup_urls(once.clone());
        assert_eq!(once, twice);
        assert_eq!(once.len(), 3);
    }
}
