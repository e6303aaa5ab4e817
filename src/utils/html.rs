//! PDF link discovery on HTML landing pages.

use scraper::{Html, Selector};
use url::Url;

/// Find the most likely PDF link on a landing page.
///
/// Order: `citation_pdf_url` meta tag, anchors ending in `.pdf`, arXiv
/// `/pdf/` anchors, `<link>` tags ending in `.pdf`, anchors whose text
/// mentions "pdf". Relative links are resolved against `page_url`.
pub fn find_pdf_link(page_url: &str, html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let base = Url::parse(page_url).ok();
    let resolve = |href: &str| -> Option<String> {
        let href = href.trim();
        if href.is_empty() || href.starts_with("javascript:") {
            return None;
        }
        match &base {
            Some(base) => base.join(href).ok().map(|u| u.to_string()),
            None => Url::parse(href).ok().map(|u| u.to_string()),
        }
    };

    if let Some(href) = select_attr(&document, r#"meta[name="citation_pdf_url"]"#, "content")
        .into_iter()
        .next()
    {
        if let Some(url) = resolve(&href) {
            return Some(url);
        }
    }

    let anchors = select_attr(&document, "a[href]", "href");
    if let Some(url) = anchors
        .iter()
        .find(|href| ends_with_pdf(href))
        .and_then(|href| resolve(href))
    {
        return Some(url);
    }

    if page_url.contains("arxiv.org") {
        if let Some(url) = anchors
            .iter()
            .find(|href| href.contains("/pdf/"))
            .and_then(|href| resolve(href))
        {
            return Some(url);
        }
    }

    if let Some(url) = select_attr(&document, "link[href]", "href")
        .iter()
        .find(|href| ends_with_pdf(href))
        .and_then(|href| resolve(href))
    {
        return Some(url);
    }

    let selector = Selector::parse("a[href]").ok()?;
    document
        .select(&selector)
        .filter(|a| {
            a.text()
                .collect::<String>()
                .to_ascii_lowercase()
                .contains("pdf")
        })
        .filter_map(|a| a.value().attr("href"))
        .find_map(resolve)
}

fn select_attr(document: &Html, selector: &str, attr: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector) else {
        return Vec::new();
    };
    document
        .select(&selector)
        .filter_map(|el| el.value().attr(attr))
        .map(|v| v.trim().to_string())
        .collect()
}

fn ends_with_pdf(href: &str) -> bool {
    let path = href.split(['?', '#']).next().unwrap_or(href);
    path.to_ascii_lowercase().ends_with(".pdf")
}
