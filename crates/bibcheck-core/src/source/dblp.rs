//! DBLP validation source (public JSON search API).

use bibcheck_bibtex::Entry;
use serde::Deserialize;

use crate::retry::send_with_retry;
use crate::{FieldMap, Source, SourceRecord};

use super::SearchFuture;

const SEARCH_URL: &str = "https://dblp.org/search/publ/api";

/// Title substrings that mark an entry as out of DBLP's coverage
/// (web resources, documentation, agency reports).
const SKIP_PATTERNS: [&str; 15] = [
    "github.com",
    "github issue",
    "pull request",
    "documentation",
    "readme",
    "security policy",
    "vulnerability disclosure",
    "nasa.gov",
    "esa.int",
    "manual",
    "guide",
    "tutorial",
    "blog",
    "website",
    "webpage",
];

pub struct DblpSource {
    client: reqwest::Client,
    max_retries: u32,
}

impl DblpSource {
    pub fn new(client: reqwest::Client, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
        }
    }

    async fn search(&self, query: String) -> Option<SourceRecord> {
        let builder = self.client.get(SEARCH_URL).query(&[
            ("q", query.as_str()),
            ("format", "json"),
            ("h", "1"),
        ]);
        let resp = send_with_retry(builder, "dblp", self.max_retries).await?;

        let payload: DblpResponse = match resp.json().await {
            Ok(p) => p,
            Err(e) => {
                log::debug!("dblp: malformed response: {}", e);
                return None;
            }
        };

        payload
            .result
            .hits
            .hit
            .into_iter()
            .next()
            .map(|hit| SourceRecord::Dblp(hit.info))
    }
}

impl Source for DblpSource {
    fn name(&self) -> &'static str {
        "dblp"
    }

    fn should_attempt(&self, entry: &Entry) -> (bool, String) {
        let title = entry.title().unwrap_or_default().to_lowercase();

        for pattern in SKIP_PATTERNS {
            if title.contains(pattern) {
                return (false, format!("title contains '{}'", pattern));
            }
        }

        let entry_type = entry.entry_type.as_str();
        if entry_type == "online" && entry.doi().is_none() {
            return (false, "online entry without DOI".into());
        }
        if matches!(entry_type, "techreport" | "misc" | "manual") && entry.doi().is_none() {
            return (false, format!("{} without DOI", entry_type));
        }

        (true, "ok".into())
    }

    fn search_by_doi<'a>(&'a self, doi: &'a str) -> SearchFuture<'a> {
        Box::pin(self.search(format!("doi:{}", doi)))
    }

    fn search_by_title<'a>(&'a self, title: &'a str) -> SearchFuture<'a> {
        Box::pin(self.search(title.to_string()))
    }

    fn extract_fields(&self, record: &SourceRecord) -> FieldMap {
        let SourceRecord::Dblp(info) = record else {
            return FieldMap::default();
        };

        FieldMap {
            title: info.title.clone(),
            author: info.authors.as_ref().and_then(|a| {
                let names = a.names();
                if names.is_empty() {
                    None
                } else {
                    Some(names.join(" and "))
                }
            }),
            year: info.year.clone(),
            venue: info.venue.as_ref().map(DblpVenue::joined),
            doi: info.doi.clone(),
        }
    }
}

// ── Wire shapes ──
//
// DBLP's JSON is duck-typed in places: `author` is a string, an object, or a
// list of either; `venue` is a string or a list. Untagged enums absorb all
// observed shapes.

#[derive(Debug, Deserialize)]
struct DblpResponse {
    result: DblpResult,
}

#[derive(Debug, Deserialize)]
struct DblpResult {
    #[serde(default)]
    hits: DblpHits,
}

#[derive(Debug, Default, Deserialize)]
struct DblpHits {
    #[serde(default)]
    hit: Vec<DblpHit>,
}

#[derive(Debug, Deserialize)]
struct DblpHit {
    info: DblpInfo,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DblpInfo {
    pub title: Option<String>,
    pub authors: Option<DblpAuthors>,
    pub year: Option<String>,
    pub venue: Option<DblpVenue>,
    pub doi: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DblpAuthors {
    #[serde(default)]
    author: DblpAuthorField,
}

impl DblpAuthors {
    fn names(&self) -> Vec<String> {
        match &self.author {
            DblpAuthorField::One(a) => vec![a.text().to_string()],
            DblpAuthorField::Many(list) => list.iter().map(|a| a.text().to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DblpAuthorField {
    One(DblpAuthor),
    Many(Vec<DblpAuthor>),
}

impl Default for DblpAuthorField {
    fn default() -> Self {
        DblpAuthorField::Many(Vec::new())
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum DblpAuthor {
    Text(String),
    Tagged {
        text: String,
    },
}

impl DblpAuthor {
    fn text(&self) -> &str {
        match self {
            DblpAuthor::Text(s) => s,
            DblpAuthor::Tagged { text } => text,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DblpVenue {
    One(String),
    Many(Vec<String>),
}

impl DblpVenue {
    fn joined(&self) -> String {
        match self {
            DblpVenue::One(s) => s.clone(),
            DblpVenue::Many(list) => list.join(", "),
        }
    }
}
