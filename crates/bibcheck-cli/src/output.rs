//! Console rendering: per-entry progress lines and the final summary.

use std::io::Write;

use bibcheck_core::{BatchResults, ProgressEvent, Status};
use owo_colors::OwoColorize;

const RULE: &str = "================================================================================";

/// Print one progress event. `Checking` writes the line prefix without a
/// newline; the matching `Result` finishes it with a status mark.
pub fn print_progress(
    writer: &mut dyn Write,
    event: &ProgressEvent,
    use_color: bool,
) -> std::io::Result<()> {
    match event {
        ProgressEvent::Checking {
            index,
            total,
            id,
            title,
        } => {
            let short: String = title.chars().take(50).collect();
            write!(writer, "[{}/{}] {}: {}... ", index, total, id, short)?;
            writer.flush()
        }
        ProgressEvent::Result { result, .. } => {
            match result.status {
                Status::Validated => {
                    if use_color {
                        writeln!(writer, "{}", "✓".green())?;
                    } else {
                        writeln!(writer, "✓")?;
                    }
                }
                Status::Mismatch => {
                    if use_color {
                        writeln!(writer, "{}", "⚠".yellow())?;
                    } else {
                        writeln!(writer, "⚠")?;
                    }
                    for issue in &result.issues {
                        writeln!(writer, "    {}", issue)?;
                    }
                }
                Status::NotFound => {
                    if use_color {
                        writeln!(writer, "{}", "✗".red())?;
                    } else {
                        writeln!(writer, "✗")?;
                    }
                }
            }
            Ok(())
        }
        ProgressEvent::UrlChecked {
            url,
            reachable,
            detail,
            ..
        } => {
            if *reachable {
                return Ok(());
            }
            if use_color {
                writeln!(
                    writer,
                    "    {}",
                    format!("URL unreachable ({}): {}", detail, url).dimmed()
                )
            } else {
                writeln!(writer, "    URL unreachable ({}): {}", detail, url)
            }
        }
    }
}

/// Print the end-of-run summary block.
pub fn print_summary(
    writer: &mut dyn Write,
    total_entries: usize,
    results: &BatchResults,
    use_color: bool,
) -> std::io::Result<()> {
    let checked = results.total();
    let validated = results.validated.len();
    let mismatches = results.mismatches.len();
    let not_found = results.not_found.len();

    let pct = |n: usize| {
        if checked == 0 {
            0.0
        } else {
            n as f64 / checked as f64 * 100.0
        }
    };

    writeln!(writer, "\n{}", RULE)?;
    writeln!(writer, "VALIDATION SUMMARY")?;
    writeln!(writer, "{}", RULE)?;
    writeln!(writer, "Total entries:     {}", total_entries)?;
    writeln!(writer, "Checked:           {}", checked)?;
    writeln!(writer)?;

    if use_color {
        writeln!(
            writer,
            "{} Validated:       {} ({:.1}%)",
            "✓".green(),
            validated,
            pct(validated)
        )?;
        writeln!(
            writer,
            "{} Mismatches:      {} ({:.1}%)",
            "⚠".yellow(),
            mismatches,
            pct(mismatches)
        )?;
        writeln!(
            writer,
            "{} Not found:       {} ({:.1}%)",
            "✗".red(),
            not_found,
            pct(not_found)
        )?;
    } else {
        writeln!(writer, "✓ Validated:       {} ({:.1}%)", validated, pct(validated))?;
        writeln!(writer, "⚠ Mismatches:      {} ({:.1}%)", mismatches, pct(mismatches))?;
        writeln!(writer, "✗ Not found:       {} ({:.1}%)", not_found, pct(not_found))?;
    }
    writeln!(writer, "{}", RULE)?;

    if mismatches > 0 {
        writeln!(writer, "\n⚠ {} entries need manual review", mismatches)?;
    }
    if not_found > 0 {
        writeln!(writer, "⚠ {} entries not found in any source", not_found)?;
    }

    Ok(())
}
