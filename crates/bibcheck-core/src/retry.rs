//! Bounded retry with exponential backoff for source queries.
//!
//! Every failure mode degrades to `None` at this boundary: rate limiting and
//! transient transport errors are retried up to the budget, everything else
//! gives up immediately. Callers never see an error cross the source
//! boundary.

use std::time::Duration;

/// Base delay before the first retry; doubles per attempt.
const BASE_DELAY: Duration = Duration::from_secs(3);
/// Upper bound on any single backoff sleep.
const MAX_DELAY: Duration = Duration::from_secs(30);

/// Send a request, retrying on 429 and transient transport failures.
///
/// Returns `Some(response)` only for a success status. Non-retryable HTTP
/// errors (4xx other than 429) and exhausted budgets return `None`.
pub(crate) async fn send_with_retry(
    builder: reqwest::RequestBuilder,
    label: &str,
    max_retries: u32,
) -> Option<reqwest::Response> {
    for attempt in 0..=max_retries {
        let req = match builder.try_clone() {
            Some(b) => b,
            // Non-cloneable request (streaming body); single shot.
            None => return builder.send().await.ok().filter(|r| r.status().is_success()),
        };

        match req.send().await {
            Ok(resp) if resp.status().is_success() => return Some(resp),
            Ok(resp) if resp.status().as_u16() == 429 || resp.status().is_server_error() => {
                if attempt == max_retries {
                    log::warn!("{}: HTTP {} after {} retries, giving up", label, resp.status(), max_retries);
                    return None;
                }
                let wait = backoff_delay(attempt);
                log::info!(
                    "{}: HTTP {}, retry {}/{} after {:.1}s",
                    label,
                    resp.status(),
                    attempt + 1,
                    max_retries,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
            }
            Ok(resp) => {
                log::debug!("{}: HTTP {}, treating as no match", label, resp.status());
                return None;
            }
            Err(e) if e.is_timeout() || e.is_connect() || e.is_request() => {
                if attempt == max_retries {
                    log::warn!("{}: {} after {} retries, giving up", label, classify(&e), max_retries);
                    return None;
                }
                let wait = backoff_delay(attempt);
                log::debug!(
                    "{}: {}, retry {}/{} after {:.1}s",
                    label,
                    classify(&e),
                    attempt + 1,
                    max_retries,
                    wait.as_secs_f64()
                );
                tokio::time::sleep(wait).await;
            }
            Err(e) => {
                log::warn!("{}: {}, giving up", label, classify(&e));
                return None;
            }
        }
    }

    None
}

/// Exponential backoff with jitter: 3s, 6s, 12s, ... capped at 30s.
fn backoff_delay(attempt: u32) -> Duration {
    let base_ms = BASE_DELAY.as_millis() as u64 * (1 << attempt.min(4));
    let jitter_ms = fastrand::u64(0..500);
    Duration::from_millis(base_ms + jitter_ms).min(MAX_DELAY)
}

/// Classify a transport error into a short label for logging.
pub(crate) fn classify(e: &reqwest::Error) -> &'static str {
    if e.is_timeout() {
        "timeout"
    } else if e.is_connect() {
        "connect"
    } else if e.is_decode() {
        "decode"
    } else {
        "request_error"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[test]
    fn backoff_grows_and_caps() {
        assert!(backoff_delay(0) >= Duration::from_secs(3));
        assert!(backoff_delay(1) >= Duration::from_secs(6));
        assert!(backoff_delay(10) <= MAX_DELAY);
    }

    /// Serve one scripted status line per incoming connection, then stop.
    async fn serve_statuses(statuses: &'static [&'static str]) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            for status in statuses {
                let (mut sock, _) = listener.accept().await.unwrap();
                let mut buf = [0u8; 2048];
                let _ = sock.read(&mut buf).await;
                let resp = format!(
                    "HTTP/1.1 {}\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
                    status
                );
                let _ = sock.write_all(resp.as_bytes()).await;
            }
        });
        format!("http://{}/", addr)
    }

    #[tokio::test]
    async fn retries_rate_limit_then_succeeds() {
        let url = serve_statuses(&["429 Too Many Requests", "200 OK"]).await;
        let client = reqwest::Client::new();

        let resp = send_with_retry(client.get(&url), "test", 1).await;
        assert_eq!(resp.unwrap().status().as_u16(), 200);
    }

    #[tokio::test]
    async fn non_retryable_status_gives_up_immediately() {
        // One scripted response only; the elapsed bound proves no retry slept.
        let url = serve_statuses(&["404 Not Found"]).await;
        let client = reqwest::Client::new();

        let start = std::time::Instant::now();
        let resp = send_with_retry(client.get(&url), "test", 3).await;
        assert!(resp.is_none());
        assert!(start.elapsed() < BASE_DELAY);
    }

    #[tokio::test]
    async fn exhausted_budget_on_server_errors_gives_none() {
        let url = serve_statuses(&["500 Internal Server Error"]).await;
        let client = reqwest::Client::new();

        let resp = send_with_retry(client.get(&url), "test", 0).await;
        assert!(resp.is_none());
    }
}
