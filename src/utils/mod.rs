//! Utility modules supporting the resolution pipeline.
//!
//! - [`HttpClient`]: shared reqwest client with timeouts and user agent
//! - [`dedup_urls`] / [`normalize_url`]: order-preserving URL deduplication
//! - [`normalize_doi`] / [`is_valid_arxiv_id`]: identifier cleanup and validation
//! - [`find_pdf_link`]: PDF link discovery on HTML landing pages
//! - [`title_similarity`], [`guess_title`], [`slugify`]: text helpers

mod dedup;
mod html;
mod http;
mod ids;
mod text;

pub use dedup::{dedup_urls, normalize_url};
pub use html::find_pdf_link;
pub use http::{HttpClient, BROWSER_USER_AGENT};
pub use ids::{is_valid_arxiv_id, normalize_arxiv_id, normalize_doi};
pub use text::{guess_title, match_confidence, normalize_title, slugify, title_similarity};
