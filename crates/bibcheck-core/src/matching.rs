//! String normalization and fuzzy comparison for bibliographic fields.
//!
//! All field comparisons go through [`similarity`], which normalizes both
//! sides first so LaTeX markup, punctuation, and case never count as
//! differences.

use once_cell::sync::Lazy;
use regex::Regex;

/// Similarity below which two author names are considered different.
pub const AUTHOR_THRESHOLD: f64 = 0.75;
/// Similarity below which two venue strings are considered different.
pub const VENUE_THRESHOLD: f64 = 0.6;
/// Similarity below which two titles are considered different.
pub const TITLE_THRESHOLD: f64 = 0.85;

/// Canonicalize a string for comparison.
///
/// Strips `\cmd{inner}` LaTeX wrappers down to `inner`, drops remaining
/// braces, lowercases, maps punctuation to spaces, and collapses whitespace.
/// Pure and idempotent; empty input yields an empty string.
pub fn normalize(s: &str) -> String {
    static LATEX_CMD: Lazy<Regex> = Lazy::new(|| Regex::new(r"\\[a-zA-Z]+\{([^}]*)\}").unwrap());
    static NON_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s]").unwrap());

    if s.is_empty() {
        return String::new();
    }

    let s = LATEX_CMD.replace_all(s, "$1");
    let s = s.replace(['{', '}'], "");
    let s = s.to_lowercase();
    let s = NON_WORD.replace_all(&s, " ");
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Sequence similarity ratio in `[0, 1]` over the normalized forms.
///
/// 1.0 for strings that normalize identically (including two strings that
/// both normalize to empty), 0.0 when nothing matches.
pub fn similarity(a: &str, b: &str) -> f64 {
    let na = normalize(a);
    let nb = normalize(b);
    rapidfuzz::distance::indel::normalized_similarity(na.chars(), nb.chars())
}

/// Split an author field on the BibTeX `" and "` conjunction.
pub fn authors_to_list(authors: &str) -> Vec<String> {
    authors
        .split(" and ")
        .map(str::trim)
        .filter(|a| !a.is_empty())
        .map(String::from)
        .collect()
}
