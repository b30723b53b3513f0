//! Reachability probing for `url` fields.

use std::time::Duration;

/// Probes are kept short so one dead link cannot stall a batch.
const PROBE_TIMEOUT: Duration = Duration::from_secs(6);

/// True for DOI resolver URLs (doi.org, dx.doi.org, www.doi.org).
///
/// These resolve through the `doi` field instead and are never probed.
/// The scheme matches case-insensitively; hosts are lowercased.
pub fn is_doi_url(url: &str) -> bool {
    let Some(rest) = strip_http_scheme(url) else {
        return false;
    };
    let host = rest
        .split(['/', '?', '#'])
        .next()
        .unwrap_or_default()
        .to_lowercase();
    host.contains("doi.org")
}

fn strip_http_scheme(url: &str) -> Option<&str> {
    for scheme in ["https://", "http://"] {
        if let Some(prefix) = url.get(..scheme.len())
            && prefix.eq_ignore_ascii_case(scheme)
        {
            return Some(&url[scheme.len()..]);
        }
    }
    None
}

/// Probe a URL with HEAD, falling back to GET when the server refuses HEAD
/// with 405 or 403. 2xx and 3xx count as reachable.
///
/// Returns `(reachable, detail)` where detail is `"HTTP {status}"` or a
/// short failure class.
pub async fn check_url(url: &str, client: &reqwest::Client) -> (bool, String) {
    if url.is_empty() {
        return (false, "empty_url".to_string());
    }
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return (false, "invalid_scheme".to_string());
    }

    let status = match client.head(url).timeout(PROBE_TIMEOUT).send().await {
        Ok(resp) => resp.status(),
        Err(e) => {
            log::debug!("url check HEAD failed for {}: {}", url, e);
            return (false, classify(&e));
        }
    };

    if status.is_success() || status.is_redirection() {
        return (true, format!("HTTP {}", status.as_u16()));
    }

    // Some servers reject HEAD outright; retry those with GET.
    if status.as_u16() == 405 || status.as_u16() == 403 {
        log::debug!("HEAD returned {} for {}; trying GET fallback", status.as_u16(), url);
        match client.get(url).timeout(PROBE_TIMEOUT).send().await {
            Ok(resp) => {
                let status = resp.status();
                let ok = status.is_success() || status.is_redirection();
                return (ok, format!("HTTP {}", status.as_u16()));
            }
            Err(e) => {
                log::debug!("url check GET fallback failed for {}: {}", url, e);
                return (false, classify(&e));
            }
        }
    }

    (false, format!("HTTP {}", status.as_u16()))
}

fn classify(e: &reqwest::Error) -> String {
    if e.is_timeout() {
        "timeout".to_string()
    } else if e.is_connect() {
        // reqwest folds DNS resolution failures into connect errors
        let text = e.to_string();
        if text.contains("dns") || text.contains("resolve") {
            "dns".to_string()
        } else {
            "connection_error".to_string()
        }
    } else if e.is_request() {
        "request_error".to_string()
    } else {
        "unknown_error".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn doi_resolver_hosts_are_recognized() {
        assert!(is_doi_url("https://doi.org/10.1145/3290605"));
        assert!(is_doi_url("http://dx.doi.org/10.1/abc"));
        assert!(is_doi_url("https://www.doi.org/10.1/abc"));
        assert!(is_doi_url("HTTPS://doi.org/10.1/abc"));
        assert!(is_doi_url("Http://DX.DOI.ORG/10.1/abc"));
        assert!(!is_doi_url("https://example.com/doi.org-paper"));
        assert!(!is_doi_url("https://arxiv.org/abs/1706.03762"));
        assert!(!is_doi_url(""));
        assert!(!is_doi_url("not a url"));
    }

    #[tokio::test]
    async fn empty_and_malformed_urls_fail_fast() {
        let client = reqwest::Client::new();
        assert_eq!(check_url("", &client).await, (false, "empty_url".into()));
        assert_eq!(
            check_url("ftp://example.com/file", &client).await,
            (false, "invalid_scheme".into())
        );
    }
}
