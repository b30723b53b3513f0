//! Single-entry validation: source iteration, field comparison, issue
//! collection.

use std::collections::BTreeMap;
use std::time::Duration;

use bibcheck_bibtex::Entry;

use crate::matching::{
    AUTHOR_THRESHOLD, TITLE_THRESHOLD, VENUE_THRESHOLD, authors_to_list, similarity,
};
use crate::source::{DEFAULT_ORDER, Source};
use crate::{AttemptRecord, Config, FieldMap, SourceMatch, Status, ValidationResult};

/// Validate one entry against the active sources in canonical order.
///
/// Every source gets an attempt record, whether or not it ran. For sources
/// that do run, DOI search comes first when the entry carries one, then
/// title search. A courtesy delay follows each attempted source.
pub async fn validate_entry(
    entry: &Entry,
    sources: &[Box<dyn Source>],
    config: &Config,
) -> ValidationResult {
    let mut matches: BTreeMap<String, SourceMatch> = BTreeMap::new();
    let mut attempts: BTreeMap<String, AttemptRecord> = BTreeMap::new();

    for source in sources {
        let name = source.name();

        let (can_try, reason) = source.should_attempt(entry);
        attempts.insert(
            name.to_string(),
            AttemptRecord {
                attempted: can_try,
                reason,
            },
        );
        if !can_try {
            continue;
        }

        let mut found = None;
        let mut search_method = None;

        if let Some(doi) = entry.doi() {
            found = source.search_by_doi(doi).await;
            if found.is_some() {
                search_method = Some(format!("{}:DOI", name));
            }
        }

        if found.is_none()
            && let Some(title) = entry.title()
        {
            found = source.search_by_title(title).await;
            if found.is_some() {
                search_method = Some(format!("{}:Title", name));
            }
        }

        if let Some(record) = found {
            let fields = source.extract_fields(&record);
            log::debug!("{}: matched entry '{}' via {:?}", name, entry.key, search_method);
            matches.insert(
                name.to_string(),
                SourceMatch {
                    search_method: search_method.unwrap_or_default(),
                    record,
                    fields,
                },
            );
        }

        if config.source_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(config.source_delay_ms)).await;
        }
    }

    let mut result = ValidationResult {
        id: entry.key.clone(),
        title: entry.title().unwrap_or_default().to_string(),
        status: Status::NotFound,
        issues: Vec::new(),
        corrected: FieldMap::default(),
        search_method: None,
        matches,
        attempts,
    };

    if result.matches.is_empty() {
        result.issues.push("Entry not found in any source".to_string());
        return result;
    }

    // Corrected fields come from the highest-priority matching source,
    // regardless of how complete lower-priority matches are.
    for preferred in DEFAULT_ORDER {
        if let Some(m) = result.matches.get(preferred) {
            result.corrected = m.fields.clone();
            result.search_method = Some(m.search_method.clone());
            break;
        }
    }

    let mut issues = Vec::new();
    for name in DEFAULT_ORDER {
        let Some(m) = result.matches.get(name) else {
            continue;
        };
        for issue in compare_with_corrected(entry, &m.fields) {
            issues.push(format!("{}: {}", name.to_uppercase(), issue));
        }
    }
    dedup_preserving_order(&mut issues);

    result.status = if issues.is_empty() {
        Status::Validated
    } else {
        Status::Mismatch
    };
    result.issues = issues;
    result
}

/// Field-level comparison of an entry against one source's corrected fields.
///
/// Each field is only compared when both sides carry it. Author lists with
/// more than three low-similarity pairs produce no author issue at all.
pub fn compare_with_corrected(entry: &Entry, corrected: &FieldMap) -> Vec<String> {
    let mut issues = Vec::new();

    if let (Some(orig_author), Some(corr_author)) = (entry.get("author"), &corrected.author) {
        let orig_authors = authors_to_list(orig_author);
        let corr_authors = authors_to_list(corr_author);

        if orig_authors.len() != corr_authors.len() {
            issues.push(format!(
                "AUTHORS: Different count ({} vs {})",
                orig_authors.len(),
                corr_authors.len()
            ));
        } else {
            let mismatches: Vec<String> = orig_authors
                .iter()
                .zip(corr_authors.iter())
                .filter(|(oa, ca)| similarity(oa, ca) < AUTHOR_THRESHOLD)
                .map(|(oa, ca)| format!("'{}' vs '{}'", oa, ca))
                .collect();
            if !mismatches.is_empty() && mismatches.len() <= 3 {
                issues.push(format!("AUTHORS: {}", mismatches.join("; ")));
            }
        }
    }

    if let (Some(orig_venue), Some(corr_venue)) = (entry.venue(), &corrected.venue)
        && similarity(orig_venue, corr_venue) < VENUE_THRESHOLD
    {
        issues.push(format!("VENUE: '{}' vs '{}'", orig_venue, corr_venue));
    }

    if let (Some(orig_year), Some(corr_year)) = (entry.get("year"), &corrected.year)
        && orig_year != corr_year
    {
        issues.push(format!("YEAR: {} vs {}", orig_year, corr_year));
    }

    if let (Some(orig_title), Some(corr_title)) = (entry.title(), &corrected.title) {
        let sim = similarity(orig_title, corr_title);
        if sim < TITLE_THRESHOLD {
            issues.push(format!("TITLE: Low similarity ({:.2})", sim));
        }
    }

    issues
}

fn dedup_preserving_order(issues: &mut Vec<String>) {
    let mut seen = std::collections::BTreeSet::new();
    issues.retain(|i| seen.insert(i.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::mock::MockSource;

    fn entry(fields: &[(&str, &str)]) -> Entry {
        let mut e = Entry::new("key1", "inproceedings");
        for (name, value) in fields {
            e.set(*name, *value);
        }
        e
    }

    fn config() -> Config {
        Config::default().without_pacing()
    }

    fn fields(pairs: &[(&str, &str)]) -> FieldMap {
        let mut f = FieldMap::default();
        for (name, value) in pairs {
            let v = Some(value.to_string());
            match *name {
                "title" => f.title = v,
                "author" => f.author = v,
                "year" => f.year = v,
                "venue" => f.venue = v,
                "doi" => f.doi = v,
                _ => unreachable!(),
            }
        }
        f
    }

    #[tokio::test]
    async fn clean_match_is_validated() {
        let e = entry(&[
            ("title", "Deep Residual Learning"),
            ("author", "Kaiming He and Xiangyu Zhang"),
            ("year", "2016"),
        ]);
        let sources: Vec<Box<dyn Source>> = vec![Box::new(MockSource::found(
            "dblp",
            fields(&[
                ("title", "Deep Residual Learning"),
                ("author", "Kaiming He and Xiangyu Zhang"),
                ("year", "2016"),
            ]),
        ))];

        let result = validate_entry(&e, &sources, &config()).await;
        assert_eq!(result.status, Status::Validated);
        assert!(result.issues.is_empty());
        assert_eq!(result.search_method.as_deref(), Some("dblp:Title"));
    }

    #[tokio::test]
    async fn no_match_anywhere_is_not_found() {
        let e = entry(&[("title", "Ghost Paper")]);
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(MockSource::not_found("dblp")),
            Box::new(MockSource::not_found("scholar")),
        ];

        let result = validate_entry(&e, &sources, &config()).await;
        assert_eq!(result.status, Status::NotFound);
        assert_eq!(result.issues, vec!["Entry not found in any source"]);
        assert!(result.corrected.is_empty());
        assert!(result.attempts["dblp"].attempted);
    }

    #[tokio::test]
    async fn skipped_sources_record_reason_and_do_not_search() {
        let e = entry(&[("title", "Some Title")]);
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(MockSource::skipping("dblp", "workshop venue")),
            Box::new(MockSource::found("scholar", fields(&[("title", "Some Title")]))),
        ];

        let result = validate_entry(&e, &sources, &config()).await;
        assert!(!result.attempts["dblp"].attempted);
        assert_eq!(result.attempts["dblp"].reason, "workshop venue");
        assert!(!result.matches.contains_key("dblp"));
        assert_eq!(result.search_method.as_deref(), Some("scholar:Title"));
    }

    #[tokio::test]
    async fn doi_search_preferred_over_title() {
        let e = entry(&[("title", "T"), ("doi", "10.1/x")]);
        let sources: Vec<Box<dyn Source>> =
            vec![Box::new(MockSource::found("dblp", fields(&[("title", "T")])))];

        let result = validate_entry(&e, &sources, &config()).await;
        assert_eq!(result.search_method.as_deref(), Some("dblp:DOI"));
    }

    #[tokio::test]
    async fn doi_miss_falls_back_to_title() {
        let e = entry(&[("title", "T"), ("doi", "10.1/x")]);
        let sources: Vec<Box<dyn Source>> = vec![Box::new(MockSource::title_only(
            "dblp",
            fields(&[("title", "T")]),
        ))];

        let result = validate_entry(&e, &sources, &config()).await;
        assert_eq!(result.search_method.as_deref(), Some("dblp:Title"));
    }

    #[tokio::test]
    async fn corrected_fields_follow_priority_not_completeness() {
        let e = entry(&[("title", "T")]);
        let sparse = fields(&[("title", "T")]);
        let rich = fields(&[("title", "T"), ("year", "2020"), ("doi", "10.1/y")]);
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(MockSource::found("dblp", sparse.clone())),
            Box::new(MockSource::found("semantic", rich)),
        ];

        let result = validate_entry(&e, &sources, &config()).await;
        assert_eq!(result.corrected, sparse);
        assert_eq!(result.search_method.as_deref(), Some("dblp:Title"));
    }

    #[tokio::test]
    async fn issues_are_prefixed_and_deduplicated() {
        let e = entry(&[("title", "T"), ("year", "2019")]);
        let wrong_year = fields(&[("title", "T"), ("year", "2020")]);
        let sources: Vec<Box<dyn Source>> = vec![
            Box::new(MockSource::found("dblp", wrong_year.clone())),
            Box::new(MockSource::found("scholar", wrong_year)),
        ];

        let result = validate_entry(&e, &sources, &config()).await;
        assert_eq!(result.status, Status::Mismatch);
        assert_eq!(
            result.issues,
            vec!["DBLP: YEAR: 2019 vs 2020", "SCHOLAR: YEAR: 2019 vs 2020"]
        );
    }

    #[test]
    fn author_count_difference_reported() {
        let e = entry(&[("author", "A One and B Two")]);
        let issues = compare_with_corrected(&e, &fields(&[("author", "A One")]));
        assert_eq!(issues, vec!["AUTHORS: Different count (2 vs 1)"]);
    }

    #[test]
    fn few_author_mismatches_are_listed() {
        let e = entry(&[("author", "John Smith and Jane Doe")]);
        let issues =
            compare_with_corrected(&e, &fields(&[("author", "John Smith and Xuv Qwerty")]));
        assert_eq!(issues, vec!["AUTHORS: 'Jane Doe' vs 'Xuv Qwerty'"]);
    }

    #[test]
    fn many_author_mismatches_are_suppressed() {
        let e = entry(&[("author", "Aaa Aaa and Bbb Bbb and Ccc Ccc and Ddd Ddd")]);
        let corrected = fields(&[("author", "Www Www and Xxx Xxx and Yyy Yyy and Zzz Zzz")]);
        assert!(compare_with_corrected(&e, &corrected).is_empty());
    }

    #[test]
    fn venue_comparison_uses_booktitle_then_journal() {
        let mut e = Entry::new("k", "article");
        e.set("journal", "Journal of Testing");
        let issues = compare_with_corrected(&e, &fields(&[("venue", "Entirely Unrelated Words")]));
        assert_eq!(
            issues,
            vec!["VENUE: 'Journal of Testing' vs 'Entirely Unrelated Words'"]
        );
    }

    #[test]
    fn close_venue_passes() {
        let mut e = Entry::new("k", "inproceedings");
        e.set("booktitle", "Proceedings of the 10th Conference on Testing");
        let issues =
            compare_with_corrected(&e, &fields(&[("venue", "Conference on Testing")]));
        assert!(issues.is_empty());
    }

    #[test]
    fn title_similarity_formatted_two_decimals() {
        let e = entry(&[("title", "Alpha")]);
        let issues = compare_with_corrected(&e, &fields(&[("title", "Qrs Tuv Wxyz")]));
        assert_eq!(issues.len(), 1);
        assert!(issues[0].starts_with("TITLE: Low similarity (0."));
        assert!(issues[0].ends_with(')'));
    }

    #[test]
    fn missing_fields_are_not_compared() {
        let e = entry(&[("title", "Only a Title")]);
        let corrected = fields(&[("year", "1999"), ("author", "Someone Else")]);
        // entry has no year/author, corrected has no title: nothing to compare
        assert!(compare_with_corrected(&e, &corrected).is_empty());
    }
}
