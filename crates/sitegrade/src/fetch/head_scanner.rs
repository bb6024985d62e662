//! Parallel HEAD checks: outbound link status and compression support.

use crate::fetch::Fetcher;
use crate::model::page::LinkCheck;
use futures::stream::{self, StreamExt};
use url::Url;

/// Concurrent HEAD requests per page when checking outbound links.
pub const LINK_CHECK_CONCURRENCY: usize = 8;

/// Encodings advertised by the compression probe.
pub const PROBE_ACCEPT_ENCODING: &str = "gzip, deflate, br";

/// HEAD-check `urls` with bounded concurrency.
///
/// Results are sorted by URL so the output does not depend on completion order.
pub async fn check_links(fetcher: &Fetcher, urls: Vec<Url>) -> Vec<LinkCheck> {
    let mut checks: Vec<LinkCheck> = stream::iter(urls)
        .map(|url| async move {
            match fetcher.head_off_site(&url).await {
                Ok(resp) => LinkCheck {
                    url: url.to_string(),
                    status: Some(resp.status),
                    error: None,
                },
                Err(reason) => LinkCheck {
                    url: url.to_string(),
                    status: None,
                    error: Some(reason),
                },
            }
        })
        .buffer_unordered(LINK_CHECK_CONCURRENCY)
        .collect()
        .await;

    checks.sort_by(|a, b| a.url.cmp(&b.url));
    checks
}

/// Ask the server for a compressed representation and report the
/// `Content-Encoding` it offers, if any.
pub async fn probe_compression(fetcher: &Fetcher, url: &Url) -> Option<String> {
    let resp = fetcher
        .head_on_site(url, Some(PROBE_ACCEPT_ENCODING))
        .await
        .ok()?;
    resp.content_encoding
        .filter(|enc| !enc.is_empty() && enc != "identity")
}

/// Pick up to `limit` distinct off-site link targets from a page, in
/// document order.
pub fn sample_off_site(links: &[Url], limit: usize) -> (Vec<Url>, bool) {
    let mut seen = std::collections::HashSet::new();
    let distinct: Vec<&Url> = links.iter().filter(|u| seen.insert(u.as_str())).collect();
    let truncated = distinct.len() > limit;
    (distinct.into_iter().take(limit).cloned().collect(), truncated)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_off_site_dedups_and_truncates() {
        let links: Vec<Url> = [
            "https://a.test/",
            "https://b.test/",
            "https://a.test/",
            "https://c.test/",
        ]
        .iter()
        .map(|s| Url::parse(s).unwrap())
        .collect();

        let (sample, truncated) = sample_off_site(&links, 2);
        assert_eq!(sample.len(), 2);
        assert!(truncated);
        assert_eq!(sample[0].as_str(), "https://a.test/");
        assert_eq!(sample[1].as_str(), "https://b.test/");

        let (all, truncated) = sample_off_site(&links, 10);
        assert_eq!(all.len(), 3);
        assert!(!truncated);
    }
}
