use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use anyhow::Context;
use clap::Parser;
use owo_colors::OwoColorize;
use tokio_util::sync::CancellationToken;

mod output;

/// Smart BibTeX validator - checks entries against multiple academic sources
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// BibTeX file to validate
    bibtex_file: PathBuf,

    /// Validation sources to use (default: all)
    #[arg(
        long,
        value_delimiter = ',',
        value_parser = ["dblp", "scholar", "semantic"],
        default_values = ["dblp", "scholar", "semantic"]
    )]
    sources: Vec<String>,

    /// Output file for updated bibliography
    #[arg(long, default_value = "bibliography_updated.bib")]
    output_bib: PathBuf,

    /// Output file for validation report
    #[arg(long, default_value = "validation_report.txt")]
    output_report: PathBuf,

    /// Skip URL reachability checks
    #[arg(long)]
    skip_url_check: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Semantic Scholar API key (or S2_API_KEY env var)
    #[arg(long)]
    s2_api_key: Option<String>,

    /// Max retries per query on rate limiting (default: 3)
    #[arg(long)]
    max_retries: Option<u32>,

    /// Delay between sources within one entry, in milliseconds (default: 1000)
    #[arg(long, value_name = "MS")]
    source_delay: Option<u64>,

    /// Delay between entries, in milliseconds (default: 2000)
    #[arg(long, value_name = "MS")]
    entry_delay: Option<u64>,

    /// Write tracing/debug logs to this file (default: stderr)
    #[arg(long)]
    log: Option<PathBuf>,
}

fn build_config(args: &Args) -> bibcheck_core::Config {
    let mut config = bibcheck_core::Config {
        s2_api_key: args
            .s2_api_key
            .clone()
            .or_else(|| std::env::var("S2_API_KEY").ok()),
        check_urls: !args.skip_url_check,
        ..Default::default()
    };
    if let Some(max_retries) = args.max_retries {
        config.max_retries = max_retries;
    }
    if let Some(source_delay) = args.source_delay {
        config.source_delay_ms = source_delay;
    }
    if let Some(entry_delay) = args.entry_delay {
        config.entry_delay_ms = entry_delay;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize tracing: file (no ANSI) if --log given, otherwise stderr.
    if let Some(ref log_path) = args.log {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)
            .with_context(|| format!("Cannot open log file {}", log_path.display()))?;
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt::init();
    }

    let use_color = !args.no_color;

    println!("📖 Parsing BibTeX file: {}", args.bibtex_file.display());
    let entries = bibcheck_bibtex::load_entries(&args.bibtex_file)
        .with_context(|| format!("Error parsing BibTeX file {}", args.bibtex_file.display()))?;
    println!("✓ Found {} entries\n", entries.len());

    let config = build_config(&args);

    println!("🔍 Starting validation against multiple sources...");
    println!("⏱ Estimated time: ~{} minutes\n", entries.len() * 3 / 60);

    let progress_writer: Arc<Mutex<std::io::Stdout>> = Arc::new(Mutex::new(std::io::stdout()));
    let progress_cb = {
        let pw = Arc::clone(&progress_writer);
        move |event: bibcheck_core::ProgressEvent| {
            if let Ok(mut w) = pw.lock() {
                let _ = output::print_progress(&mut *w, &event, use_color);
                let _ = w.flush();
            }
        }
    };

    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel_clone.cancel();
        }
    });

    let results =
        bibcheck_core::check_entries(&entries, &args.sources, &config, &cancel, progress_cb)
            .await?;

    if cancel.is_cancelled() {
        println!("\n⚠ Validation interrupted; writing partial results");
    }

    let updated = bibcheck_core::apply_corrections(&entries, &results);
    bibcheck_bibtex::write_entries(&args.output_bib, &updated)
        .with_context(|| format!("Cannot write {}", args.output_bib.display()))?;
    println!("✓ Updated BibTeX saved to {}", args.output_bib.display());

    println!("\n📊 Generating report: {}", args.output_report.display());
    bibcheck_reporting::write_report(&args.output_report, entries.len(), &results, &args.sources)
        .with_context(|| format!("Cannot write {}", args.output_report.display()))?;
    println!("✓ Report saved to {}", args.output_report.display());

    let mut stdout = std::io::stdout();
    output::print_summary(&mut stdout, entries.len(), &results, use_color)?;

    if use_color {
        println!(
            "\n{} Validation complete! Check '{}' for details and '{}' for corrected entries.",
            "✓".green(),
            args.output_report.display(),
            args.output_bib.display()
        );
    } else {
        println!(
            "\n✓ Validation complete! Check '{}' for details and '{}' for corrected entries.",
            args.output_report.display(),
            args.output_bib.display()
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delay_flags_override_pacing() {
        let args = Args::parse_from([
            "bibcheck",
            "refs.bib",
            "--source-delay",
            "0",
            "--entry-delay",
            "250",
        ]);
        let config = build_config(&args);
        assert_eq!(config.source_delay_ms, 0);
        assert_eq!(config.entry_delay_ms, 250);
    }

    #[test]
    fn pacing_defaults_without_flags() {
        let args = Args::parse_from(["bibcheck", "refs.bib"]);
        let config = build_config(&args);
        assert_eq!(config.source_delay_ms, 1000);
        assert_eq!(config.entry_delay_ms, 2000);
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn max_retries_flag_overrides() {
        let args = Args::parse_from(["bibcheck", "refs.bib", "--max-retries", "1"]);
        assert_eq!(build_config(&args).max_retries, 1);
    }
}
