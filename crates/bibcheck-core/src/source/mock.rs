//! Scripted in-memory source for validator and batch tests.

use bibcheck_bibtex::Entry;

use crate::{FieldMap, Source, SourceRecord};

use super::SearchFuture;

pub(crate) struct MockSource {
    pub name: &'static str,
    /// `Some(reason)` makes `should_attempt` refuse every entry.
    pub skip_reason: Option<String>,
    pub doi_result: Option<FieldMap>,
    pub title_result: Option<FieldMap>,
}

impl MockSource {
    pub fn found(name: &'static str, fields: FieldMap) -> Self {
        Self {
            name,
            skip_reason: None,
            doi_result: Some(fields.clone()),
            title_result: Some(fields),
        }
    }

    pub fn not_found(name: &'static str) -> Self {
        Self {
            name,
            skip_reason: None,
            doi_result: None,
            title_result: None,
        }
    }

    pub fn skipping(name: &'static str, reason: &str) -> Self {
        Self {
            name,
            skip_reason: Some(reason.to_string()),
            doi_result: None,
            title_result: None,
        }
    }

    pub fn title_only(name: &'static str, fields: FieldMap) -> Self {
        Self {
            name,
            skip_reason: None,
            doi_result: None,
            title_result: Some(fields),
        }
    }
}

impl Source for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    fn should_attempt(&self, _entry: &Entry) -> (bool, String) {
        match &self.skip_reason {
            Some(reason) => (false, reason.clone()),
            None => (true, "ok".into()),
        }
    }

    fn search_by_doi<'a>(&'a self, _doi: &'a str) -> SearchFuture<'a> {
        let result = self.doi_result.clone().map(SourceRecord::Mock);
        Box::pin(std::future::ready(result))
    }

    fn search_by_title<'a>(&'a self, _title: &'a str) -> SearchFuture<'a> {
        let result = self.title_result.clone().map(SourceRecord::Mock);
        Box::pin(std::future::ready(result))
    }

    fn extract_fields(&self, record: &SourceRecord) -> FieldMap {
        match record {
            SourceRecord::Mock(fields) => fields.clone(),
            _ => FieldMap::default(),
        }
    }
}
