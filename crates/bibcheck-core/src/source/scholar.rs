//! Google Scholar validation source (HTML scraping).
//!
//! Scholar has no public API; we fetch the regular search page and read the
//! first result block. The byline (`.gs_a`) packs authors, venue, and year
//! into one dash-separated line, so everything parsed here is best-effort and
//! feeds only the fuzzy comparison. DOI search is unsupported.

use bibcheck_bibtex::Entry;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

use crate::retry::send_with_retry;
use crate::{FieldMap, Source, SourceRecord};

use super::SearchFuture;

const SEARCH_URL: &str = "https://scholar.google.com/scholar";

// Scholar serves a JS challenge to clients without a browser user agent.
const USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:128.0) Gecko/20100101 Firefox/128.0";

/// First-result fields scraped from the search page.
#[derive(Debug, Clone, Default)]
pub struct ScholarHit {
    pub title: String,
    pub authors: Vec<String>,
    pub venue: Option<String>,
    pub year: Option<String>,
}

pub struct ScholarSource {
    client: reqwest::Client,
    max_retries: u32,
}

impl ScholarSource {
    pub fn new(client: reqwest::Client, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
        }
    }

    async fn search(&self, query: &str) -> Option<SourceRecord> {
        let builder = self
            .client
            .get(SEARCH_URL)
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .query(&[("q", query), ("hl", "en")]);
        let resp = send_with_retry(builder, "scholar", self.max_retries).await?;

        let body = match resp.text().await {
            Ok(b) => b,
            Err(e) => {
                log::debug!("scholar: failed to read body: {}", e);
                return None;
            }
        };

        parse_first_hit(&body).map(SourceRecord::Scholar)
    }
}

impl Source for ScholarSource {
    fn name(&self) -> &'static str {
        "scholar"
    }

    fn should_attempt(&self, entry: &Entry) -> (bool, String) {
        if entry.title().is_none() {
            return (false, "missing title".into());
        }
        (true, "ok".into())
    }

    /// Scholar does not support DOI lookup.
    fn search_by_doi<'a>(&'a self, _doi: &'a str) -> SearchFuture<'a> {
        Box::pin(std::future::ready(None))
    }

    fn search_by_title<'a>(&'a self, title: &'a str) -> SearchFuture<'a> {
        Box::pin(self.search(title))
    }

    fn extract_fields(&self, record: &SourceRecord) -> FieldMap {
        let SourceRecord::Scholar(hit) = record else {
            return FieldMap::default();
        };

        FieldMap {
            title: Some(hit.title.clone()).filter(|t| !t.is_empty()),
            author: if hit.authors.is_empty() {
                None
            } else {
                Some(hit.authors.join(" and "))
            },
            year: hit.year.clone(),
            venue: hit.venue.clone(),
            // Scholar never exposes DOIs in result listings
            doi: None,
        }
    }
}

/// Parse the first `.gs_ri` result block out of a Scholar results page.
fn parse_first_hit(html: &str) -> Option<ScholarHit> {
    let document = Html::parse_document(html);
    let result_sel = Selector::parse("div.gs_ri").ok()?;
    let title_sel = Selector::parse("h3.gs_rt").ok()?;
    let byline_sel = Selector::parse("div.gs_a").ok()?;

    let result = document.select(&result_sel).next()?;

    let title_text: String = result
        .select(&title_sel)
        .next()?
        .text()
        .collect::<String>();
    let title = strip_result_tags(&title_text);
    if title.is_empty() {
        return None;
    }

    let byline: String = result
        .select(&byline_sel)
        .next()
        .map(|b| b.text().collect::<String>())
        .unwrap_or_default();
    let (authors, venue, year) = parse_byline(&byline);

    Some(ScholarHit {
        title,
        authors,
        venue,
        year,
    })
}

/// Remove leading result-type tags like "[PDF]" or "[BOOK]" from a title.
fn strip_result_tags(title: &str) -> String {
    static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^(\s*\[[A-Z]+\])+\s*").unwrap());
    TAG_RE.replace(title.trim(), "").trim().to_string()
}

/// Split a `.gs_a` byline of the form
/// `"A Author, B Author - Venue Name, 2020 - publisher.com"` into its parts.
fn parse_byline(byline: &str) -> (Vec<String>, Option<String>, Option<String>) {
    static YEAR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b((?:19|20)\d{2})\b").unwrap());

    let mut segments = byline.split(" - ");

    let authors: Vec<String> = segments
        .next()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        // Scholar truncates long author lists with an ellipsis
        .filter(|a| !a.is_empty() && *a != "\u{2026}" && *a != "...")
        .map(String::from)
        .collect();

    let middle = segments.next().unwrap_or_default();
    let year = YEAR_RE
        .captures(middle)
        .map(|caps| caps[1].to_string());
    let venue = {
        let v = YEAR_RE.replace(middle, "");
        let v = v.trim().trim_end_matches(',').trim();
        if v.is_empty() { None } else { Some(v.to_string()) }
    };

    (authors, venue, year)
}
