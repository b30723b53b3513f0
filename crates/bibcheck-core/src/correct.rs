//! Merging corrected fields back into entries.

use bibcheck_bibtex::Entry;

use crate::BatchResults;

/// Produce an updated copy of every entry, merging in corrected fields for
/// entries that were validated or mismatched. Not-found entries pass
/// through untouched, as does anything without a result.
///
/// The `venue` field routes to `journal` for articles and `booktitle`
/// otherwise. A provenance note naming the winning search method is
/// appended to any existing `note` with `"; "`.
pub fn apply_corrections(entries: &[Entry], results: &BatchResults) -> Vec<Entry> {
    entries
        .iter()
        .map(|entry| match results.correctable(&entry.key) {
            Some(result) => {
                let mut updated = entry.clone();

                for (field, value) in result.corrected.iter() {
                    if field == "venue" {
                        if entry.entry_type == "article" {
                            updated.set("journal", value);
                        } else {
                            updated.set("booktitle", value);
                        }
                    } else {
                        updated.set(field, value);
                    }
                }

                let method = result.search_method.as_deref().unwrap_or("unknown");
                let note = format!("Validated via {}", method);
                match entry.get("note") {
                    Some(existing) => updated.set("note", &format!("{}; {}", existing, note)),
                    None => updated.set("note", &note),
                }

                updated
            }
            None => entry.clone(),
        })
        .collect()
}
