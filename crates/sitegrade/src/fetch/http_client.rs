//! HTTP client with manual redirect handling, bounded bodies and
//! transport-error classification.

use crate::model::page::ErrorReason;
use reqwest::header::{ACCEPT_ENCODING, CONTENT_TYPE, LOCATION, USER_AGENT};
use reqwest::{Method, Response};
use std::error::Error as StdError;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

/// Redirect hops followed before giving up.
pub const MAX_REDIRECTS: u32 = 10;

/// Request settings that vary per audit.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub user_agent: String,
    pub timeout: Duration,
    pub max_body_bytes: usize,
}

/// A fully received (or failed) GET.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub requested: Url,
    pub final_url: Url,
    /// `None` when no usable response arrived.
    pub status: Option<u16>,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
    /// Time until the final response's headers arrived.
    pub elapsed: Duration,
    pub redirects: u32,
    pub error: Option<ErrorReason>,
}

impl RawResponse {
    fn failed(requested: &Url, final_url: Url, reason: ErrorReason, elapsed: Duration, redirects: u32) -> Self {
        Self {
            requested: requested.clone(),
            final_url,
            status: None,
            headers: Vec::new(),
            body: Vec::new(),
            elapsed,
            redirects,
            error: Some(reason),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// HTML by `Content-Type`, or by sniffing when the header is absent.
    pub fn is_html(&self) -> bool {
        match self.header(CONTENT_TYPE.as_str()) {
            Some(ct) => {
                let ct = ct.to_ascii_lowercase();
                ct.contains("text/html") || ct.contains("application/xhtml")
            }
            None => {
                let head = String::from_utf8_lossy(&self.body[..self.body.len().min(512)])
                    .to_ascii_lowercase();
                head.contains("<html") || head.contains("<!doctype html")
            }
        }
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Headers from a HEAD request (after redirects).
#[derive(Debug, Clone)]
pub struct HeadResponse {
    pub url: Url,
    pub status: u16,
    pub content_type: Option<String>,
    pub content_encoding: Option<String>,
}

/// Shared, immutable HTTP client. Cheap to clone.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    /// Build a client that never follows redirects on its own.
    pub fn new() -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .pool_max_idle_per_host(8)
            .build()?;
        Ok(Self { client })
    }

    /// GET `url`, following up to [`MAX_REDIRECTS`] redirects and reading at
    /// most `max_body_bytes` of the body. Never fails: errors are recorded
    /// in the returned response.
    pub async fn get(&self, url: &Url, opts: &FetchOptions) -> RawResponse {
        let start = Instant::now();
        let mut current = url.clone();
        let mut redirects = 0;

        loop {
            let resp = match self.send(Method::GET, &current, opts, None).await {
                Ok(resp) => resp,
                Err(reason) => {
                    return RawResponse::failed(url, current, reason, start.elapsed(), redirects)
                }
            };

            if let Some(next) = redirect_target(&resp, &current) {
                if redirects >= MAX_REDIRECTS {
                    return RawResponse::failed(
                        url,
                        current,
                        ErrorReason::TooManyRedirects,
                        start.elapsed(),
                        redirects,
                    );
                }
                redirects += 1;
                current = next;
                continue;
            }

            let elapsed = start.elapsed();
            let status = resp.status().as_u16();
            let headers = collect_headers(&resp);
            let (body, body_error) = read_body(resp, opts.max_body_bytes).await;
            let error = body_error.or_else(|| (status >= 400).then_some(ErrorReason::HttpError(status)));

            return RawResponse {
                requested: url.clone(),
                final_url: current,
                status: Some(status),
                headers,
                body,
                elapsed,
                redirects,
                error,
            };
        }
    }

    /// HEAD `url`, following redirects. Falls back to a body-less GET when
    /// the server rejects HEAD with 405 or 501.
    pub async fn head(
        &self,
        url: &Url,
        opts: &FetchOptions,
        accept_encoding: Option<&str>,
    ) -> Result<HeadResponse, ErrorReason> {
        let mut current = url.clone();
        let mut method = Method::HEAD;
        let mut redirects = 0;

        loop {
            let resp = self.send(method.clone(), &current, opts, accept_encoding).await?;

            if let Some(next) = redirect_target(&resp, &current) {
                if redirects >= MAX_REDIRECTS {
                    return Err(ErrorReason::TooManyRedirects);
                }
                redirects += 1;
                current = next;
                continue;
            }

            let status = resp.status().as_u16();
            if method == Method::HEAD && (status == 405 || status == 501) {
                method = Method::GET;
                continue;
            }

            let header = |name: &str| {
                resp.headers()
                    .get(name)
                    .and_then(|v| v.to_str().ok())
                    .map(|v| v.trim().to_ascii_lowercase())
            };
            return Ok(HeadResponse {
                content_type: header("content-type"),
                content_encoding: header("content-encoding"),
                url: current,
                status,
            });
        }
    }

    /// One request, retried once on a connection-level failure.
    async fn send(
        &self,
        method: Method,
        url: &Url,
        opts: &FetchOptions,
        accept_encoding: Option<&str>,
    ) -> Result<Response, ErrorReason> {
        let mut retried = false;
        loop {
            let request = self
                .client
                .request(method.clone(), url.clone())
                .timeout(opts.timeout)
                .header(USER_AGENT, opts.user_agent.as_str())
                .header(ACCEPT_ENCODING, accept_encoding.unwrap_or("identity"));

            match request.send().await {
                Ok(resp) => return Ok(resp),
                Err(e) => {
                    let reason = classify_error(&e);
                    if reason == ErrorReason::ConnectionFailed && !retried {
                        debug!("retrying {method} {url} after connection failure: {e}");
                        retried = true;
                        continue;
                    }
                    return Err(reason);
                }
            }
        }
    }
}

fn redirect_target(resp: &Response, current: &Url) -> Option<Url> {
    if !resp.status().is_redirection() {
        return None;
    }
    let location = resp.headers().get(LOCATION)?.to_str().ok()?;
    let mut next = current.join(location.trim()).ok()?;
    if next.scheme() != "http" && next.scheme() != "https" {
        return None;
    }
    next.set_fragment(None);
    Some(next)
}

fn collect_headers(resp: &Response) -> Vec<(String, String)> {
    resp.headers()
        .iter()
        .map(|(name, value)| {
            (
                name.as_str().to_string(),
                String::from_utf8_lossy(value.as_bytes()).into_owned(),
            )
        })
        .collect()
}

async fn read_body(mut resp: Response, limit: usize) -> (Vec<u8>, Option<ErrorReason>) {
    let mut body = Vec::new();
    loop {
        match resp.chunk().await {
            Ok(Some(chunk)) => {
                let room = limit.saturating_sub(body.len());
                if chunk.len() >= room {
                    body.extend_from_slice(&chunk[..room]);
                    break;
                }
                body.extend_from_slice(&chunk);
            }
            Ok(None) => break,
            Err(e) => return (body, Some(classify_error(&e))),
        }
    }
    (body, None)
}

/// Map a reqwest error to a reason code by inspecting its source chain.
pub fn classify_error(err: &reqwest::Error) -> ErrorReason {
    if err.is_timeout() {
        return ErrorReason::Timeout;
    }
    if err.is_redirect() {
        return ErrorReason::TooManyRedirects;
    }
    let mut chain = error_chain(err);
    // The message embeds the request URL; its host must not drive the match.
    if let Some(url) = err.url() {
        chain = chain.replace(&url.as_str().to_ascii_lowercase(), "");
    }
    classify_message(&chain)
}

fn classify_message(chain: &str) -> ErrorReason {
    const DNS: &[&str] = &[
        "dns",
        "resolve",
        "lookup address",
        "name or service not known",
        "no such host",
        "nodename nor servname",
    ];
    const TLS: &[&str] = &["certificate", "tls", "ssl", "handshake"];

    if DNS.iter().any(|m| chain.contains(m)) {
        ErrorReason::DnsFailure
    } else if TLS.iter().any(|m| chain.contains(m)) {
        ErrorReason::TlsFailure
    } else if chain.contains("timed out") {
        ErrorReason::Timeout
    } else {
        ErrorReason::ConnectionFailed
    }
}

fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut text = String::new();
    let mut source: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = source {
        text.push_str(&e.to_string().to_ascii_lowercase());
        text.push(' ');
        source = e.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_message() {
        assert_eq!(
            classify_message("error sending request: dns error: failed to lookup address information"),
            ErrorReason::DnsFailure
        );
        assert_eq!(
            classify_message("invalid peer certificate: unknownissuer"),
            ErrorReason::TlsFailure
        );
        assert_eq!(
            classify_message("tcp connect error: connection refused (os error 111)"),
            ErrorReason::ConnectionFailed
        );
        assert_eq!(classify_message("operation timed out"), ErrorReason::Timeout);
    }

    #[test]
    fn test_is_html_by_header_and_sniff() {
        let url = Url::parse("https://example.com/").unwrap();
        let mut raw = RawResponse::failed(&url, url.clone(), ErrorReason::Timeout, Duration::ZERO, 0);
        raw.headers = vec![("content-type".into(), "text/html; charset=utf-8".into())];
        assert!(raw.is_html());

        raw.headers = vec![("content-type".into(), "application/json".into())];
        assert!(!raw.is_html());

        raw.headers.clear();
        raw.body = b"<!DOCTYPE html><html><body></body></html>".to_vec();
        assert!(raw.is_html());
    }
}
