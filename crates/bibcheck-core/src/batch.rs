//! Batch orchestration: validate a list of entries, probe URLs, collect
//! partitioned results.

use std::time::Duration;

use bibcheck_bibtex::Entry;
use tokio_util::sync::CancellationToken;

use crate::source::{Source, build_sources};
use crate::validator::validate_entry;
use crate::{
    BatchResults, Config, CoreError, ProgressEvent, Status, UrlCheckOutcome, urlcheck,
};

/// Validate `entries` against the selected sources, in input order.
///
/// Emits a [`ProgressEvent`] pair per entry and an extra event per URL
/// probe. Cancellation stops before the next entry; results gathered so
/// far are returned.
pub async fn check_entries(
    entries: &[Entry],
    selected: &[String],
    config: &Config,
    cancel: &CancellationToken,
    progress: impl FnMut(ProgressEvent),
) -> Result<BatchResults, CoreError> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.http_timeout_secs))
        .build()?;

    let sources = build_sources(selected, &client, config);
    if sources.is_empty() {
        return Err(CoreError::NoSources);
    }

    Ok(run_batch(entries, &sources, &client, config, cancel, progress).await)
}

pub(crate) async fn run_batch(
    entries: &[Entry],
    sources: &[Box<dyn Source>],
    client: &reqwest::Client,
    config: &Config,
    cancel: &CancellationToken,
    mut progress: impl FnMut(ProgressEvent),
) -> BatchResults {
    let mut results = BatchResults::default();
    let total = entries.len();

    for (idx, entry) in entries.iter().enumerate() {
        if cancel.is_cancelled() {
            log::info!("validation cancelled after {} of {} entries", idx, total);
            break;
        }

        let index = idx + 1;
        progress(ProgressEvent::Checking {
            index,
            total,
            id: entry.key.clone(),
            title: entry.title().unwrap_or_default().to_string(),
        });

        let result = validate_entry(entry, sources, config).await;

        progress(ProgressEvent::Result {
            index,
            total,
            result: Box::new(result.clone()),
        });

        match result.status {
            Status::Validated => results.validated.push(result),
            Status::Mismatch => results.mismatches.push(result),
            Status::NotFound => results.not_found.push(result),
        }

        if config.check_urls
            && let Some(url) = entry.url()
            && !urlcheck::is_doi_url(url)
        {
            let (reachable, detail) = urlcheck::check_url(url, client).await;
            progress(ProgressEvent::UrlChecked {
                id: entry.key.clone(),
                url: url.to_string(),
                reachable,
                detail: detail.clone(),
            });
            results.url_checks.push(UrlCheckOutcome {
                id: entry.key.clone(),
                url: url.to_string(),
                reachable,
                detail,
            });
        }

        // Pacing between entries, skipped after the last one.
        if config.entry_delay_ms > 0 && index < total {
            tokio::time::sleep(Duration::from_millis(config.entry_delay_ms)).await;
        }
    }

    results
}
