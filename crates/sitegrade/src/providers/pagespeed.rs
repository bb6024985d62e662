//! Google PageSpeed Insights (Lighthouse lab data) client.

use crate::config::PsiStrategy;
use crate::providers::{ProviderError, VitalsProvider};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use url::Url;

pub const DEFAULT_PSI_ENDPOINT: &str =
    "https://www.googleapis.com/pagespeedonline/v5/runPagespeed";

/// Lab measurements for one URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LabVitals {
    pub lcp_ms: Option<f64>,
    pub fcp_ms: Option<f64>,
    pub cls: Option<f64>,
    pub tbt_ms: Option<f64>,
    /// Lighthouse performance category, 0–100.
    pub performance_score: Option<f64>,
}

pub struct PageSpeedClient {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    strategy: PsiStrategy,
}

impl PageSpeedClient {
    pub fn new(client: reqwest::Client, api_key: String, strategy: PsiStrategy) -> Self {
        Self {
            client,
            endpoint: DEFAULT_PSI_ENDPOINT.to_string(),
            api_key,
            strategy,
        }
    }

    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = endpoint;
        self
    }
}

#[async_trait]
impl VitalsProvider for PageSpeedClient {
    fn name(&self) -> &'static str {
        "pagespeed"
    }

    async fn lab_vitals(&self, url: &Url) -> Result<LabVitals, ProviderError> {
        let resp = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("url", url.as_str()),
                ("key", self.api_key.as_str()),
                ("strategy", self.strategy.as_str()),
                ("category", "performance"),
            ])
            .send()
            .await?;

        let status = resp.status();
        if status.as_u16() == 429 {
            return Err(ProviderError::RateLimited);
        }
        if !status.is_success() {
            return Err(ProviderError::Http(status.as_u16()));
        }

        let payload: PsiResponse = resp.json().await?;
        payload.into_vitals()
    }
}

// ── Wire format ─────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PsiResponse {
    lighthouse_result: Option<LighthouseResult>,
}

#[derive(Debug, Deserialize)]
struct LighthouseResult {
    #[serde(default)]
    audits: HashMap<String, LighthouseAudit>,
    #[serde(default)]
    categories: HashMap<String, LighthouseCategory>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LighthouseAudit {
    numeric_value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct LighthouseCategory {
    score: Option<f64>,
}

impl PsiResponse {
    fn into_vitals(self) -> Result<LabVitals, ProviderError> {
        let lh = self
            .lighthouse_result
            .ok_or_else(|| ProviderError::Malformed("missing lighthouseResult".into()))?;

        let audit = |key: &str| lh.audits.get(key).and_then(|a| a.numeric_value);
        let vitals = LabVitals {
            lcp_ms: audit("largest-contentful-paint"),
            fcp_ms: audit("first-contentful-paint"),
            cls: audit("cumulative-layout-shift"),
            tbt_ms: audit("total-blocking-time"),
            performance_score: lh
                .categories
                .get("performance")
                .and_then(|c| c.score)
                .map(|s| (s * 100.0).round()),
        };

        if vitals == LabVitals::default() {
            return Err(ProviderError::Malformed("no lab metrics in lighthouseResult".into()));
        }
        Ok(vitals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lighthouse_payload() {
        let payload: PsiResponse = serde_json::from_value(serde_json::json!({
            "id": "https://example.com/",
            "lighthouseResult": {
                "audits": {
                    "largest-contentful-paint": {"numericValue": 2100.5},
                    "first-contentful-paint": {"numericValue": 900.0},
                    "cumulative-layout-shift": {"numericValue": 0.04},
                    "total-blocking-time": {"numericValue": 120.0},
                    "speed-index": {"numericValue": 1800.0}
                },
                "categories": {"performance": {"score": 0.87}}
            }
        }))
        .unwrap();

        let vitals = payload.into_vitals().unwrap();
        assert_eq!(vitals.lcp_ms, Some(2100.5));
        assert_eq!(vitals.cls, Some(0.04));
        assert_eq!(vitals.performance_score, Some(87.0));
    }

    #[test]
    fn test_missing_lighthouse_result_is_malformed() {
        let payload: PsiResponse =
            serde_json::from_value(serde_json::json!({"error": {"code": 400}})).unwrap();
        assert!(matches!(payload.into_vitals(), Err(ProviderError::Malformed(_))));

        let empty: PsiResponse =
            serde_json::from_value(serde_json::json!({"lighthouseResult": {}})).unwrap();
        assert!(matches!(empty.into_vitals(), Err(ProviderError::Malformed(_))));
    }
}
