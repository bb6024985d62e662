//! HTTP retrieval: shared client, engine-wide governor and per-audit fetcher.

pub mod governor;
pub mod head_scanner;
pub mod http_client;

pub use governor::{FetchGovernor, DEFAULT_GLOBAL_CEILING};
pub use http_client::{FetchOptions, HeadResponse, HttpClient, RawResponse, MAX_REDIRECTS};

use crate::crawl::rate_limiter::RateLimiter;
use crate::model::page::ErrorReason;
use std::sync::Arc;
use url::Url;

/// Per-audit handle bundling the shared client with the audit's politeness
/// limiter and the engine-wide governor. Cheap to clone into worker tasks.
#[derive(Clone)]
pub struct Fetcher {
    client: HttpClient,
    governor: Arc<FetchGovernor>,
    limiter: Arc<RateLimiter>,
    options: Arc<FetchOptions>,
}

impl Fetcher {
    pub fn new(
        client: HttpClient,
        governor: Arc<FetchGovernor>,
        limiter: Arc<RateLimiter>,
        options: FetchOptions,
    ) -> Self {
        Self {
            client,
            governor,
            limiter,
            options: Arc::new(options),
        }
    }

    /// Same fetcher with a different politeness limiter.
    pub fn with_limiter(&self, limiter: Arc<RateLimiter>) -> Self {
        Self {
            limiter,
            ..self.clone()
        }
    }

    pub fn options(&self) -> &FetchOptions {
        &self.options
    }

    /// GET a page on the audited site.
    pub async fn get(&self, url: &Url) -> RawResponse {
        let _site = self.limiter.acquire().await;
        let _global = self.governor.acquire().await;
        self.client.get(url, &self.options).await
    }

    /// HEAD a URL on the audited site.
    pub async fn head_on_site(
        &self,
        url: &Url,
        accept_encoding: Option<&str>,
    ) -> Result<HeadResponse, ErrorReason> {
        let _site = self.limiter.acquire().await;
        let _global = self.governor.acquire().await;
        self.client.head(url, &self.options, accept_encoding).await
    }

    /// HEAD a URL on another site; only the global ceiling applies.
    pub async fn head_off_site(&self, url: &Url) -> Result<HeadResponse, ErrorReason> {
        let _global = self.governor.acquire().await;
        self.client.head(url, &self.options, None).await
    }
}
