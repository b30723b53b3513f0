//! Semantic Scholar validation source (Graph API).

use bibcheck_bibtex::Entry;
use serde::Deserialize;

use crate::retry::send_with_retry;
use crate::{FieldMap, Source, SourceRecord};

use super::SearchFuture;

const API_BASE: &str = "https://api.semanticscholar.org/graph/v1";
const PAPER_FIELDS: &str = "title,authors,year,venue,externalIds";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SemanticPaper {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub authors: Vec<SemanticAuthor>,
    #[serde(default)]
    pub year: Option<i64>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default, rename = "externalIds")]
    pub external_ids: Option<SemanticExternalIds>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SemanticAuthor {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SemanticExternalIds {
    #[serde(default, rename = "DOI")]
    pub doi: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    data: Vec<SemanticPaper>,
}

pub struct SemanticScholarSource {
    client: reqwest::Client,
    api_key: Option<String>,
    max_retries: u32,
}

impl SemanticScholarSource {
    pub fn new(client: reqwest::Client, api_key: Option<String>, max_retries: u32) -> Self {
        Self {
            client,
            api_key,
            max_retries,
        }
    }

    fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.get(url);
        if let Some(key) = &self.api_key {
            builder = builder.header("x-api-key", key);
        }
        builder
    }

    async fn lookup_doi(&self, doi: &str) -> Option<SourceRecord> {
        let url = format!("{}/paper/DOI:{}", API_BASE, doi);
        let builder = self.get(&url).query(&[("fields", PAPER_FIELDS)]);
        let resp = send_with_retry(builder, "semantic", self.max_retries).await?;
        match resp.json::<SemanticPaper>().await {
            Ok(paper) => Some(SourceRecord::Semantic(paper)),
            Err(e) => {
                log::debug!("semantic: bad DOI lookup payload: {}", e);
                None
            }
        }
    }

    async fn search_title(&self, title: &str) -> Option<SourceRecord> {
        let url = format!("{}/paper/search", API_BASE);
        let builder = self
            .get(&url)
            .query(&[("query", title), ("limit", "1"), ("fields", PAPER_FIELDS)]);
        let resp = send_with_retry(builder, "semantic", self.max_retries).await?;
        match resp.json::<SearchResponse>().await {
            Ok(body) => body
                .data
                .into_iter()
                .next()
                .map(SourceRecord::Semantic),
            Err(e) => {
                log::debug!("semantic: bad search payload: {}", e);
                None
            }
        }
    }
}

impl Source for SemanticScholarSource {
    fn name(&self) -> &'static str {
        "semantic"
    }

    fn should_attempt(&self, entry: &Entry) -> (bool, String) {
        if entry.doi().is_none() && entry.title().is_none() {
            return (false, "missing both DOI and title".into());
        }
        (true, "ok".into())
    }

    fn search_by_doi<'a>(&'a self, doi: &'a str) -> SearchFuture<'a> {
        Box::pin(self.lookup_doi(doi))
    }

    fn search_by_title<'a>(&'a self, title: &'a str) -> SearchFuture<'a> {
        Box::pin(self.search_title(title))
    }

    fn extract_fields(&self, record: &SourceRecord) -> FieldMap {
        let SourceRecord::Semantic(paper) = record else {
            return FieldMap::default();
        };

        let authors: Vec<&str> = paper
            .authors
            .iter()
            .map(|a| a.name.as_str())
            .filter(|n| !n.is_empty())
            .collect();

        FieldMap {
            title: paper.title.clone().filter(|t| !t.is_empty()),
            author: if authors.is_empty() {
                None
            } else {
                Some(authors.join(" and "))
            },
            year: paper.year.map(|y| y.to_string()),
            venue: paper.venue.clone().filter(|v| !v.is_empty()),
            doi: paper
                .external_ids
                .as_ref()
                .and_then(|ids| ids.doi.clone())
                .filter(|d| !d.is_empty()),
        }
    }
}
