//! Backlink / domain-authority API client.
//!
//! Speaks a small JSON contract: `GET {endpoint}?domain=<domain>` with a
//! bearer token, answering
//! `{"domain_authority": 0-100, "referring_domains": n, "backlinks": n, "toxic_backlinks": n}`.
//! Every field is optional.

use crate::providers::{AuthorityProvider, ProviderError};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthoritySignals {
    pub domain_authority: Option<f64>,
    pub referring_domains: Option<u64>,
    pub backlinks: Option<u64>,
    pub toxic_backlinks: Option<u64>,
}

pub struct AuthorityApiClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl AuthorityApiClient {
    pub fn new(client: reqwest::Client, endpoint: String, api_key: String) -> Self {
        Self {
            client,
            endpoint,
            api_key,
        }
    }
}

#[async_trait]
impl AuthorityProvider for AuthorityApiClient {
    fn name(&self) -> &'static str {
        "authority"
    }

    async fn authority(&self, domain: &str) -> Result<AuthoritySignals, ProviderError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[("domain", domain)])
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .send()
            .await?;

        match resp.status().as_u16() {
            429 => return Err(ProviderError::RateLimited),
            s if !(200..300).contains(&s) => return Err(ProviderError::Http(s)),
            _ => {}
        }

        let signals: AuthoritySignals = resp.json().await?;
        if signals == AuthoritySignals::default() {
            return Err(ProviderError::Malformed("no authority fields in payload".into()));
        }
        if let Some(da) = signals.domain_authority {
            if !(0.0..=100.0).contains(&da) {
                return Err(ProviderError::Malformed(format!(
                    "domain_authority out of range: {da}"
                )));
            }
        }
        Ok(signals)
    }
}
