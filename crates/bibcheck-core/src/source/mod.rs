//! Validation sources: per-provider search and field-extraction policy.

pub mod dblp;
pub mod scholar;
pub mod semantic;

#[cfg(test)]
pub(crate) mod mock;

use std::future::Future;
use std::pin::Pin;

use bibcheck_bibtex::Entry;

use crate::{Config, FieldMap};

pub use dblp::DblpSource;
pub use scholar::ScholarSource;
pub use semantic::SemanticScholarSource;

/// Canonical source priority order. Reused both for search iteration and for
/// corrected-field selection when multiple sources match.
pub const DEFAULT_ORDER: [&str; 3] = ["dblp", "scholar", "semantic"];

/// A provider-native search result. Each source's `extract_fields` unwraps
/// its own variant; a foreign variant yields an empty [`FieldMap`].
#[derive(Debug, Clone)]
pub enum SourceRecord {
    Dblp(dblp::DblpInfo),
    Scholar(scholar::ScholarHit),
    Semantic(semantic::SemanticPaper),
    #[cfg(test)]
    Mock(FieldMap),
}

pub type SearchFuture<'a> = Pin<Box<dyn Future<Output = Option<SourceRecord>> + Send + 'a>>;

/// A bibliographic database that can be queried by DOI or title.
///
/// Search methods never surface errors: transport failures, rate limiting
/// (after the retry budget), and malformed payloads all degrade to `None`.
pub trait Source: Send + Sync {
    /// Canonical lowercase name ("dblp", "scholar", "semantic").
    fn name(&self) -> &'static str;

    /// Per-source skip policy. Pure, no I/O. Returns whether this source
    /// should attempt the entry and a short reason either way.
    fn should_attempt(&self, entry: &Entry) -> (bool, String);

    /// Search by DOI. `None` when unsupported, not found, or failed.
    fn search_by_doi<'a>(&'a self, doi: &'a str) -> SearchFuture<'a>;

    /// Search by free-text title, returning the best hit if any.
    fn search_by_title<'a>(&'a self, title: &'a str) -> SearchFuture<'a>;

    /// Map a provider-native result to the common field shape. Fields the
    /// provider did not return are omitted, never defaulted.
    fn extract_fields(&self, record: &SourceRecord) -> FieldMap;
}

/// Build the active sources in canonical priority order, keeping only the
/// selected names. An empty selection is a configuration error the caller
/// surfaces before validation starts.
pub fn build_sources(
    selected: &[String],
    client: &reqwest::Client,
    config: &Config,
) -> Vec<Box<dyn Source>> {
    let mut sources: Vec<Box<dyn Source>> = Vec::new();

    for name in DEFAULT_ORDER {
        if !selected.iter().any(|s| s == name) {
            continue;
        }
        match name {
            "dblp" => sources.push(Box::new(DblpSource::new(client.clone(), config.max_retries))),
            "scholar" => {
                sources.push(Box::new(ScholarSource::new(client.clone(), config.max_retries)))
            }
            "semantic" => sources.push(Box::new(SemanticScholarSource::new(
                client.clone(),
                config.s2_api_key.clone(),
                config.max_retries,
            ))),
            _ => unreachable!(),
        }
    }

    sources
}
