//! Optional external signal providers.
//!
//! Providers are called by the orchestrator, never by evaluators. A missing
//! credential, an HTTP failure, a timeout or a malformed payload all end up
//! as [`ProviderOutcome::Unavailable`]; none of them fails the audit.

pub mod authority;
pub mod pagespeed;

pub use authority::{AuthorityApiClient, AuthoritySignals};
pub use pagespeed::{LabVitals, PageSpeedClient};

use crate::config::ProviderCredentials;
use async_trait::async_trait;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use url::Url;

/// Why a provider call produced nothing.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("provider not configured")]
    NotConfigured,
    #[error("provider rate limit reached")]
    RateLimited,
    #[error("provider returned HTTP {0}")]
    Http(u16),
    #[error("provider request failed: {0}")]
    Transport(String),
    #[error("provider payload malformed: {0}")]
    Malformed(String),
    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),
    #[error("provider call cancelled")]
    Cancelled,
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

/// Signals from one provider, or the reason there are none.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProviderOutcome<T> {
    Available { signals: T },
    Unavailable { reason: String },
}

impl<T> ProviderOutcome<T> {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        ProviderOutcome::Unavailable {
            reason: reason.into(),
        }
    }

    pub fn signals(&self) -> Option<&T> {
        match self {
            ProviderOutcome::Available { signals } => Some(signals),
            ProviderOutcome::Unavailable { .. } => None,
        }
    }

    /// Reason text for unavailable outcomes.
    pub fn reason(&self) -> Option<&str> {
        match self {
            ProviderOutcome::Available { .. } => None,
            ProviderOutcome::Unavailable { reason } => Some(reason),
        }
    }
}

impl<T> From<Result<T, ProviderError>> for ProviderOutcome<T> {
    fn from(result: Result<T, ProviderError>) -> Self {
        match result {
            Ok(signals) => ProviderOutcome::Available { signals },
            Err(e) => ProviderOutcome::unavailable(e.to_string()),
        }
    }
}

/// Outcome of every provider for one audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderFacts {
    pub vitals: ProviderOutcome<LabVitals>,
    pub authority: ProviderOutcome<AuthoritySignals>,
}

impl Default for ProviderFacts {
    fn default() -> Self {
        Self {
            vitals: ProviderOutcome::unavailable("not requested"),
            authority: ProviderOutcome::unavailable("not requested"),
        }
    }
}

/// Lab performance measurements for a URL.
#[async_trait]
pub trait VitalsProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn lab_vitals(&self, url: &Url) -> Result<LabVitals, ProviderError>;
}

/// Backlink and authority signals for a registrable domain.
#[async_trait]
pub trait AuthorityProvider: Send + Sync {
    fn name(&self) -> &'static str;
    async fn authority(&self, domain: &str) -> Result<AuthoritySignals, ProviderError>;
}

/// The providers configured for one audit.
#[derive(Clone, Default)]
pub struct Providers {
    pub vitals: Option<Arc<dyn VitalsProvider>>,
    pub authority: Option<Arc<dyn AuthorityProvider>>,
}

impl Providers {
    /// Build clients for whichever credentials are present.
    pub fn from_credentials(client: &reqwest::Client, creds: &ProviderCredentials) -> Self {
        let vitals = creds.psi_api_key.as_ref().map(|key| {
            let mut psi = PageSpeedClient::new(client.clone(), key.clone(), creds.psi_strategy);
            if let Some(endpoint) = &creds.psi_endpoint {
                psi = psi.with_endpoint(endpoint.clone());
            }
            Arc::new(psi) as Arc<dyn VitalsProvider>
        });

        let authority = match (&creds.authority_endpoint, &creds.authority_api_key) {
            (Some(endpoint), Some(key)) => Some(Arc::new(AuthorityApiClient::new(
                client.clone(),
                endpoint.clone(),
                key.clone(),
            )) as Arc<dyn AuthorityProvider>),
            _ => None,
        };

        Self { vitals, authority }
    }

    /// Fill unset providers from `other`.
    pub fn or(self, other: Providers) -> Self {
        Self {
            vitals: self.vitals.or(other.vitals),
            authority: self.authority.or(other.authority),
        }
    }

    /// Call every configured provider concurrently, each under the shared
    /// concurrency limit, a per-call timeout and the audit's cancellation.
    pub async fn collect(
        &self,
        target: &Url,
        domain: &str,
        concurrency: usize,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> ProviderFacts {
        let limit = Semaphore::new(concurrency.max(1));

        let vitals = async {
            match &self.vitals {
                Some(p) => guarded(p.name(), &limit, timeout, cancel, p.lab_vitals(target)).await,
                None => ProviderOutcome::unavailable("PageSpeed Insights not configured"),
            }
        };
        let authority = async {
            match &self.authority {
                Some(p) => guarded(p.name(), &limit, timeout, cancel, p.authority(domain)).await,
                None => ProviderOutcome::unavailable("authority API not configured"),
            }
        };

        let (vitals, authority) = tokio::join!(vitals, authority);
        ProviderFacts { vitals, authority }
    }
}

async fn guarded<T, F>(
    name: &str,
    limit: &Semaphore,
    timeout: Duration,
    cancel: &CancellationToken,
    call: F,
) -> ProviderOutcome<T>
where
    F: Future<Output = Result<T, ProviderError>>,
{
    let result = tokio::select! {
        _ = cancel.cancelled() => Err(ProviderError::Cancelled),
        r = async {
            let _permit = limit.acquire().await.ok();
            match tokio::time::timeout(timeout, call).await {
                Ok(r) => r,
                Err(_) => Err(ProviderError::Timeout(timeout)),
            }
        } => r,
    };

    match &result {
        Ok(_) => debug!("{name} returned signals"),
        Err(ProviderError::Cancelled) => debug!("{name} call abandoned"),
        Err(e) => warn!("{name} unavailable: {e}"),
    }
    result.into()
}
