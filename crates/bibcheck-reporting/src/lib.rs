//! Plain-text validation report.
//!
//! The report is a single UTF-8 text file with a summary header followed by
//! sections for mismatches, not-found entries, validated entries, and URL
//! reachability, each rendered only when non-empty.

use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use bibcheck_core::BatchResults;

const RULE: &str = "================================================================================";

/// Write the full report to `path`.
pub fn write_report(
    path: &Path,
    total_entries: usize,
    results: &BatchResults,
    sources: &[String],
) -> std::io::Result<()> {
    fs::write(path, render_report(total_entries, results, sources))
}

/// Render the report as a string. Pure; all I/O lives in [`write_report`].
pub fn render_report(total_entries: usize, results: &BatchResults, sources: &[String]) -> String {
    let mut out = String::new();

    let _ = writeln!(out, "{}", RULE);
    let _ = writeln!(out, "Smart BibTeX Validation Report");
    let _ = writeln!(out, "{}\n", RULE);

    let _ = writeln!(out, "Total entries in file: {}", total_entries);
    let _ = writeln!(out, "Entries validated: {}", results.total());
    let _ = writeln!(out, "Validation sources: {}\n", sources.join(", "));

    let _ = writeln!(out, "✓ Validated: {}", results.validated.len());
    let _ = writeln!(out, "⚠ Mismatches: {}", results.mismatches.len());
    let _ = writeln!(out, "✗ Not found: {}\n", results.not_found.len());

    if !results.mismatches.is_empty() {
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "ENTRIES WITH MISMATCHES (Require Manual Review)");
        let _ = writeln!(out, "{}\n", RULE);

        for result in &results.mismatches {
            let _ = writeln!(out, "Entry ID: {}", result.id);
            let _ = writeln!(out, "Title: {}", result.title);
            let _ = writeln!(
                out,
                "Found via: {}",
                result.search_method.as_deref().unwrap_or("unknown")
            );
            if !result.matches.is_empty() {
                let matched: Vec<&str> = result.matches.keys().map(String::as_str).collect();
                let _ = writeln!(out, "Sources matched: {}", matched.join(", "));
            }
            let _ = writeln!(out, "Issues:");
            for issue in &result.issues {
                let _ = writeln!(out, "  - {}", issue);
            }
            let _ = writeln!(out);
        }
    }

    if !results.not_found.is_empty() {
        let _ = writeln!(out, "{}", RULE);
        let _ = writeln!(out, "ENTRIES NOT FOUND IN ANY SOURCE");
        let _ = writeln!(out, "{}\n", RULE);

        for result in &results.not_found {
            let title: String = result.title.chars().take(60).collect();
            let _ = writeln!(out, "{}: {}...", result.id, title);
        }
    }

    if !results.validated.is_empty() {
        let _ = writeln!(out, "\n{}", RULE);
        let _ = writeln!(out, "VALIDATED ENTRIES");
        let _ = writeln!(out, "{}\n", RULE);
        for result in &results.validated {
            let _ = writeln!(out, "✓ {}", result.id);
        }
    }

    if !results.url_checks.is_empty() {
        let _ = writeln!(out, "\n{}", RULE);
        let _ = writeln!(out, "URL REACHABILITY CHECKS");
        let _ = writeln!(out, "{}\n", RULE);

        let unreachable: Vec<_> = results.url_checks.iter().filter(|r| !r.reachable).collect();
        let reachable = results.url_checks.len() - unreachable.len();

        let _ = writeln!(out, "Total URLs checked: {}", results.url_checks.len());
        let _ = writeln!(out, "✓ Reachable: {}", reachable);
        let _ = writeln!(out, "✗ Unreachable: {}\n", unreachable.len());

        if !unreachable.is_empty() {
            let _ = writeln!(out, "Unreachable URLs:");
            for check in unreachable {
                let _ = writeln!(out, "  {}: {}", check.id, check.url);
                let _ = writeln!(out, "    Error: {}", check.detail);
            }
        }
    }

    out
}
