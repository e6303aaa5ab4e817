//! GROBID client and TEI reference parser.
//!
//! GROBID returns the whole document as TEI XML; the bibliography lives in
//! `listBibl/biblStruct` elements. Each entry becomes a [`RawReference`]
//! whose hints carry the title, year, DOI and arXiv ID GROBID recognized.

use async_trait::async_trait;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use reqwest::multipart::{Form, Part};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

use super::{ExtractError, ReferenceExtractor};
use crate::config::GrobidConfig;
use crate::models::{RawReference, ReferenceHints};
use crate::utils::HttpClient;

const FULLTEXT_ENDPOINT: &str = "/api/processFulltextDocument";

/// Reference extraction through a GROBID service
#[derive(Debug, Clone)]
pub struct GrobidExtractor {
    client: HttpClient,
    url: String,
    consolidate_citations: u8,
}

impl GrobidExtractor {
    pub fn new(config: &GrobidConfig) -> Result<Self, ExtractError> {
        let client = HttpClient::new(Duration::from_secs(config.timeout_secs.max(1)))
            .map_err(|e| ExtractError::Grobid(e.to_string()))?;
        Ok(Self {
            client,
            url: config.url.trim_end_matches('/').to_string(),
            consolidate_citations: config.consolidate_citations.min(2),
        })
    }

    /// Send the PDF to GROBID and return the TEI document
    pub async fn process_fulltext(&self, pdf: &Path) -> Result<String, ExtractError> {
        let bytes = tokio::fs::read(pdf).await?;
        let file_name = pdf
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "paper.pdf".to_string());

        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("application/pdf")
            .map_err(|e| ExtractError::Grobid(e.to_string()))?;
        let form = Form::new()
            .part("input", part)
            .text("consolidateCitations", self.consolidate_citations.to_string())
            .text("includeRawCitations", "1");

        let endpoint = format!("{}{}", self.url, FULLTEXT_ENDPOINT);
        debug!(endpoint, "sending PDF to GROBID");

        let response = self
            .client
            .post(&endpoint)
            .multipart(form)
            .send()
            .await
            .map_err(|e| ExtractError::Grobid(format!("{} unreachable: {}", self.url, e)))?;

        if !response.status().is_success() {
            return Err(ExtractError::Grobid(format!(
                "{} returned status {}",
                endpoint,
                response.status()
            )));
        }

        response
            .text()
            .await
            .map_err(|e| ExtractError::Grobid(format!("failed to read TEI: {}", e)))
    }
}

#[async_trait]
impl ReferenceExtractor for GrobidExtractor {
    fn engine(&self) -> &'static str {
        "grobid"
    }

    async fn extract(&self, pdf: &Path) -> Result<Vec<RawReference>, ExtractError> {
        let tei = self.process_fulltext(pdf).await?;
        let references = parse_tei(&tei)?;
        info!(count = references.len(), "GROBID extracted references");
        if references.is_empty() {
            return Err(ExtractError::NoReferences(pdf.display().to_string()));
        }
        Ok(references)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Forename,
    Surname,
    Title,
    Date,
    Doi,
    Arxiv,
    RawNote,
}

/// Fields of one `biblStruct` while it is being read
#[derive(Debug, Default)]
struct BiblEntry {
    analytic_authors: Vec<String>,
    monogr_authors: Vec<String>,
    analytic_title: Option<String>,
    monogr_title: Option<String>,
    year: Option<String>,
    doi: Option<String>,
    arxiv_id: Option<String>,
    raw_note: Option<String>,
    forenames: Vec<String>,
    surname: Option<String>,
}

impl BiblEntry {
    fn finish_person(&mut self, in_analytic: bool) {
        let forename = self.forenames.join(" ");
        let Some(surname) = self.surname.take() else {
            self.forenames.clear();
            return;
        };
        let name = if forename.is_empty() {
            surname
        } else {
            format!("{}, {}", surname, forename)
        };
        if in_analytic {
            self.analytic_authors.push(name);
        } else {
            self.monogr_authors.push(name);
        }
        self.forenames.clear();
    }

    fn set(&mut self, field: Field, text: String, in_analytic: bool) {
        match field {
            Field::Forename => self.forenames.push(text),
            Field::Surname => self.surname = Some(text),
            Field::Title if in_analytic => {
                self.analytic_title.get_or_insert(text);
            }
            Field::Title => {
                self.monogr_title.get_or_insert(text);
            }
            Field::Date => {
                self.year.get_or_insert_with(|| year_of(&text));
            }
            Field::Doi => {
                self.doi.get_or_insert(text);
            }
            Field::Arxiv => {
                self.arxiv_id.get_or_insert(text);
            }
            Field::RawNote => self.raw_note = Some(text),
        }
    }

    fn into_reference(self, ordinal: usize) -> Option<RawReference> {
        let authors = if self.analytic_authors.is_empty() {
            self.monogr_authors
        } else {
            self.analytic_authors
        };
        let title = self.analytic_title.or(self.monogr_title);

        let mut parts = Vec::new();
        if !authors.is_empty() {
            parts.push(authors.join(", "));
        }
        if let Some(year) = &self.year {
            parts.push(format!("({})", year));
        }
        if let Some(title) = &title {
            parts.push(title.clone());
        }

        let text = match self.raw_note {
            Some(note) => note,
            None if !parts.is_empty() => parts.join(" "),
            None => title
                .clone()
                .or_else(|| self.doi.clone())
                .or_else(|| self.arxiv_id.clone())
                .unwrap_or_default(),
        };
        if text.is_empty() {
            return None;
        }

        Some(RawReference::new(ordinal, text).with_hints(ReferenceHints {
            doi: self.doi,
            arxiv_id: self.arxiv_id,
            title,
            year: self.year,
        }))
    }
}

fn year_of(date: &str) -> String {
    date.trim().chars().take(4).collect()
}

fn attr(e: &BytesStart, name: &str) -> Option<String> {
    e.try_get_attribute(name)
        .ok()
        .flatten()
        .and_then(|a| a.unescape_value().ok())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn local_name(e: &BytesStart) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

/// Parse the bibliography of a GROBID TEI document.
pub fn parse_tei(tei: &str) -> Result<Vec<RawReference>, ExtractError> {
    let mut reader = Reader::from_str(tei);

    let mut references = Vec::new();
    let mut stack: Vec<String> = Vec::new();
    let mut entry: Option<BiblEntry> = None;
    // field being captured and the stack depth of the element that opened it
    let mut capture: Option<(Field, usize, String)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => {
                let name = local_name(e);
                if name == "biblStruct" && stack.last().map(String::as_str) == Some("listBibl") {
                    entry = Some(BiblEntry::default());
                }
                stack.push(name);
                if let Some(current) = entry.as_mut() {
                    if capture.is_none() {
                        capture = start_capture(e, &stack, current).map(|f| (f, stack.len(), String::new()));
                    }
                }
            }
            Ok(Event::Empty(ref e)) => {
                if let Some(current) = entry.as_mut() {
                    if local_name(e) == "date" && in_section(&stack, "monogr") {
                        if let Some(when) = attr(e, "when").or_else(|| attr(e, "from")) {
                            current.year.get_or_insert_with(|| year_of(&when));
                        }
                    }
                }
            }
            Ok(Event::Text(ref t)) => {
                if let Some((_, _, buf)) = capture.as_mut() {
                    let text = t
                        .unescape()
                        .map_err(|e| ExtractError::Tei(e.to_string()))?;
                    buf.push_str(&text);
                }
            }
            Ok(Event::CData(ref t)) => {
                if let Some((_, _, buf)) = capture.as_mut() {
                    buf.push_str(&String::from_utf8_lossy(t));
                }
            }
            Ok(Event::End(_)) => {
                let depth = stack.len();
                let in_analytic = in_section(&stack, "analytic");
                let name = stack.pop().unwrap_or_default();

                if let Some(current) = entry.as_mut() {
                    if capture.as_ref().is_some_and(|(_, d, _)| *d == depth) {
                        if let Some((field, _, buf)) = capture.take() {
                            let text = buf.split_whitespace().collect::<Vec<_>>().join(" ");
                            if !text.is_empty() {
                                current.set(field, text, in_analytic);
                            }
                        }
                    }
                    if name == "persName" {
                        current.finish_person(in_analytic);
                    }
                }

                if name == "biblStruct" && stack.last().map(String::as_str) == Some("listBibl") {
                    if let Some(done) = entry.take() {
                        if let Some(reference) = done.into_reference(references.len() + 1) {
                            references.push(reference);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(ExtractError::Tei(format!(
                    "XML error at position {}: {}",
                    reader.buffer_position(),
                    e
                )));
            }
        }
    }

    Ok(references)
}

fn in_section(stack: &[String], section: &str) -> bool {
    stack.iter().any(|name| name == section)
}

/// Which field, if any, the element just opened holds
fn start_capture(e: &BytesStart, stack: &[String], entry: &mut BiblEntry) -> Option<Field> {
    let name = stack.last()?.as_str();
    let in_author = in_section(stack, "author");
    let in_bibl_part = in_section(stack, "analytic") || in_section(stack, "monogr");

    match name {
        "forename" if in_author && in_bibl_part => Some(Field::Forename),
        "surname" if in_author && in_bibl_part => Some(Field::Surname),
        "title" if in_bibl_part => Some(Field::Title),
        "date" if in_section(stack, "monogr") => {
            match attr(e, "when").or_else(|| attr(e, "from")) {
                Some(when) => {
                    entry.year.get_or_insert_with(|| year_of(&when));
                    None
                }
                None => Some(Field::Date),
            }
        }
        "idno" => match attr(e, "type").as_deref() {
            Some(t) if t.eq_ignore_ascii_case("doi") => Some(Field::Doi),
            Some(t) if t.eq_ignore_ascii_case("arxiv") => Some(Field::Arxiv),
            _ => None,
        },
        "note" if attr(e, "type").as_deref() == Some("raw_reference") => Some(Field::RawNote),
        _ => None,
    }
}
