use std::collections::BTreeMap;

use thiserror::Error;

pub mod batch;
pub mod correct;
pub mod matching;
mod retry;
pub mod source;
pub mod urlcheck;
pub mod validator;

// Re-export for convenience
pub use batch::check_entries;
pub use bibcheck_bibtex::Entry;
pub use correct::apply_corrections;
pub use source::{DEFAULT_ORDER, Source, SourceRecord, build_sources};

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("BibTeX error: {0}")]
    Bibtex(#[from] bibcheck_bibtex::BibtexError),
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("no validation sources selected")]
    NoSources,
}

/// The validation status of a single entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Validated,
    Mismatch,
    NotFound,
}

/// Corrected metadata extracted from one source's native result.
///
/// Partial by construction: a source only fills the fields its payload
/// actually carried. Empty strings are treated as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldMap {
    pub title: Option<String>,
    pub author: Option<String>,
    pub year: Option<String>,
    pub venue: Option<String>,
    pub doi: Option<String>,
}

impl FieldMap {
    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }

    /// Present (name, value) pairs, skipping empty values.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &str)> {
        [
            ("title", self.title.as_deref()),
            ("author", self.author.as_deref()),
            ("year", self.year.as_deref()),
            ("venue", self.venue.as_deref()),
            ("doi", self.doi.as_deref()),
        ]
        .into_iter()
        .filter_map(|(name, value)| match value {
            Some(v) if !v.is_empty() => Some((name, v)),
            _ => None,
        })
    }
}

/// A successful (entry, source) lookup: how the record was found, the raw
/// provider payload, and the fields extracted from it.
#[derive(Debug, Clone)]
pub struct SourceMatch {
    /// `"{source}:DOI"` or `"{source}:Title"`.
    pub search_method: String,
    pub record: SourceRecord,
    pub fields: FieldMap,
}

/// Whether a source attempted an entry, and why (not).
#[derive(Debug, Clone)]
pub struct AttemptRecord {
    pub attempted: bool,
    pub reason: String,
}

/// The result of validating a single entry against all active sources.
#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub id: String,
    pub title: String,
    pub status: Status,
    pub issues: Vec<String>,
    /// Fields from the highest-priority matching source.
    pub corrected: FieldMap,
    /// Search method of the match that supplied `corrected`.
    pub search_method: Option<String>,
    pub matches: BTreeMap<String, SourceMatch>,
    pub attempts: BTreeMap<String, AttemptRecord>,
}

/// Outcome of probing one entry's URL field.
#[derive(Debug, Clone)]
pub struct UrlCheckOutcome {
    pub id: String,
    pub url: String,
    pub reachable: bool,
    pub detail: String,
}

/// Results of a whole batch, partitioned by status.
///
/// Every input entry lands in exactly one of the three buckets, in input
/// order. URL checks are annotations and never affect the partition.
#[derive(Debug, Clone, Default)]
pub struct BatchResults {
    pub validated: Vec<ValidationResult>,
    pub mismatches: Vec<ValidationResult>,
    pub not_found: Vec<ValidationResult>,
    pub url_checks: Vec<UrlCheckOutcome>,
}

impl BatchResults {
    pub fn total(&self) -> usize {
        self.validated.len() + self.mismatches.len() + self.not_found.len()
    }

    /// Look up the result for an entry among validated + mismatch buckets.
    pub fn correctable(&self, id: &str) -> Option<&ValidationResult> {
        self.validated
            .iter()
            .chain(self.mismatches.iter())
            .find(|r| r.id == id)
    }
}

/// Progress events emitted during a batch run.
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    Checking {
        index: usize,
        total: usize,
        id: String,
        title: String,
    },
    Result {
        index: usize,
        total: usize,
        result: Box<ValidationResult>,
    },
    UrlChecked {
        id: String,
        url: String,
        reachable: bool,
        detail: String,
    },
}

/// Configuration for the validation engine.
#[derive(Debug, Clone)]
pub struct Config {
    pub s2_api_key: Option<String>,
    /// Per-request HTTP timeout.
    pub http_timeout_secs: u64,
    /// Courtesy delay between sources within one entry.
    pub source_delay_ms: u64,
    /// Courtesy delay between entries.
    pub entry_delay_ms: u64,
    /// Max retries per query on rate limiting or transient failure.
    pub max_retries: u32,
    /// Probe non-DOI URLs found in entries.
    pub check_urls: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            s2_api_key: None,
            http_timeout_secs: 15,
            source_delay_ms: 1000,
            entry_delay_ms: 2000,
            max_retries: 3,
            check_urls: true,
        }
    }
}

impl Config {
    /// Configuration with pacing disabled (tests, offline runs).
    pub fn without_pacing(mut self) -> Self {
        self.source_delay_ms = 0;
        self.entry_delay_ms = 0;
        self
    }
}
