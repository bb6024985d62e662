//! Audit target and per-audit configuration.
//!
//! Durations are configured in milliseconds so the structures round-trip
//! cleanly through JSON config files. Every field has a default, so a config
//! file only needs to name what it overrides.

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use url::Url;

/// Default user agent sent with every request.
pub const DEFAULT_USER_AGENT: &str =
    "SitegradeBot/0.1 (+https://github.com/agentic-revolution/sitegrade)";

/// Upper bound on `max_pages`; larger crawls belong to a different tool.
const MAX_PAGES_CEILING: usize = 10_000;

/// Upper bound on `fetch_concurrency` for a single audit.
const FETCH_CONCURRENCY_CEILING: usize = 64;

/// A website plus the configuration it is audited with.
///
/// Immutable for the duration of one audit.
#[derive(Debug, Clone, Serialize)]
pub struct Target {
    /// Seed URL, normalized (fragment stripped).
    pub url: Url,
    /// Audit configuration.
    pub config: AuditConfig,
}

impl Target {
    /// Parse and validate a seed URL together with its configuration.
    ///
    /// Bare hostnames (`example.com`) are accepted and given an `https://`
    /// scheme.
    pub fn new(url: &str, config: AuditConfig) -> Result<Self, EngineError> {
        let url = parse_seed_url(url)?;
        config.validate()?;
        Ok(Self { url, config })
    }

    /// Host of the seed URL.
    pub fn host(&self) -> &str {
        self.url.host_str().unwrap_or_default()
    }
}

/// Parse a user-supplied site URL, defaulting the scheme to https.
pub fn parse_seed_url(raw: &str) -> Result<Url, EngineError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(EngineError::invalid_target(raw, "empty url"));
    }

    let mut url = match Url::parse(trimmed) {
        Ok(_) if is_host_and_port(trimmed) => bare_host(raw, trimmed)?,
        Ok(url) => url,
        Err(url::ParseError::RelativeUrlWithoutBase) => bare_host(raw, trimmed)?,
        Err(e) => return Err(EngineError::invalid_target(raw, e.to_string())),
    };

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(EngineError::invalid_target(
            raw,
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    if !url.username().is_empty() || url.password().is_some() {
        return Err(EngineError::invalid_target(raw, "credentials in url"));
    }
    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(EngineError::invalid_target(raw, "missing host"));
    }

    url.set_fragment(None);
    Ok(url)
}

fn bare_host(raw: &str, trimmed: &str) -> Result<Url, EngineError> {
    Url::parse(&format!("https://{trimmed}"))
        .map_err(|e| EngineError::invalid_target(raw, e.to_string()))
}

/// `localhost:8080` parses as scheme `localhost`; treat it as a host.
fn is_host_and_port(s: &str) -> bool {
    match s.split_once(':') {
        Some((host, rest)) => {
            let port = rest.split('/').next().unwrap_or_default();
            !host.is_empty() && !port.is_empty() && port.bytes().all(|b| b.is_ascii_digit())
        }
        None => false,
    }
}

/// What the orchestrator returns when an audit is cancelled or runs out of time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelPolicy {
    /// Build a result from the pages completed so far and mark it partial.
    #[default]
    Partial,
    /// Return `EngineError::Cancelled` / `EngineError::DeadlineExceeded`.
    Error,
}

/// PageSpeed Insights strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PsiStrategy {
    #[default]
    Mobile,
    Desktop,
}

impl PsiStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            PsiStrategy::Mobile => "mobile",
            PsiStrategy::Desktop => "desktop",
        }
    }
}

/// Credentials and endpoints for optional external providers.
///
/// Every provider is optional. A missing key means the provider's metrics
/// are reported `unavailable`; it never fails the audit.
#[derive(Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderCredentials {
    /// Google PageSpeed Insights API key.
    #[serde(skip_serializing)]
    pub psi_api_key: Option<String>,
    /// Override for the PageSpeed endpoint.
    pub psi_endpoint: Option<String>,
    pub psi_strategy: PsiStrategy,
    /// Base URL of a backlink/authority API.
    pub authority_endpoint: Option<String>,
    /// Bearer token for the authority API.
    #[serde(skip_serializing)]
    pub authority_api_key: Option<String>,
}

impl ProviderCredentials {
    /// Read credentials from `PSI_API_KEY`, `SITEGRADE_AUTHORITY_ENDPOINT`
    /// and `SITEGRADE_AUTHORITY_KEY`.
    pub fn from_env() -> Self {
        Self {
            psi_api_key: non_empty_env("PSI_API_KEY"),
            psi_endpoint: non_empty_env("SITEGRADE_PSI_ENDPOINT"),
            psi_strategy: PsiStrategy::default(),
            authority_endpoint: non_empty_env("SITEGRADE_AUTHORITY_ENDPOINT"),
            authority_api_key: non_empty_env("SITEGRADE_AUTHORITY_KEY"),
        }
    }

    /// Fill any unset field from `other`.
    pub fn or(self, other: ProviderCredentials) -> Self {
        Self {
            psi_api_key: self.psi_api_key.or(other.psi_api_key),
            psi_endpoint: self.psi_endpoint.or(other.psi_endpoint),
            psi_strategy: self.psi_strategy,
            authority_endpoint: self.authority_endpoint.or(other.authority_endpoint),
            authority_api_key: self.authority_api_key.or(other.authority_api_key),
        }
    }

    pub fn has_pagespeed(&self) -> bool {
        self.psi_api_key.is_some()
    }

    pub fn has_authority(&self) -> bool {
        self.authority_endpoint.is_some() && self.authority_api_key.is_some()
    }
}

impl fmt::Debug for ProviderCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("ProviderCredentials")
            .field("psi_api_key", &redact(&self.psi_api_key))
            .field("psi_endpoint", &self.psi_endpoint)
            .field("psi_strategy", &self.psi_strategy)
            .field("authority_endpoint", &self.authority_endpoint)
            .field("authority_api_key", &redact(&self.authority_api_key))
            .finish()
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Per-audit configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuditConfig {
    /// Maximum number of pages (PageFacts) collected.
    pub max_pages: usize,
    /// Maximum link hops from the seed.
    pub max_depth: u32,
    pub per_request_timeout_ms: u64,
    /// Wall-clock budget for the whole audit.
    pub overall_timeout_ms: u64,
    /// Worker pool size for page fetches.
    pub fetch_concurrency: usize,
    /// Minimum spacing between requests; robots.txt `Crawl-delay` may raise it.
    pub politeness_delay_ms: u64,
    pub respect_robots: bool,
    pub user_agent: String,
    /// Outbound links HEAD-checked per page.
    pub link_check_sample: usize,
    pub max_body_bytes: usize,
    pub competitor_urls: Vec<String>,
    pub credentials: ProviderCredentials,
    /// Concurrent external provider calls.
    pub provider_concurrency: usize,
    pub provider_timeout_ms: u64,
    pub cancel_policy: CancelPolicy,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            max_pages: 50,
            max_depth: 2,
            per_request_timeout_ms: 10_000,
            overall_timeout_ms: 120_000,
            fetch_concurrency: 4,
            politeness_delay_ms: 0,
            respect_robots: true,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            link_check_sample: 25,
            max_body_bytes: 5 * 1024 * 1024,
            competitor_urls: Vec::new(),
            credentials: ProviderCredentials::default(),
            provider_concurrency: 2,
            provider_timeout_ms: 45_000,
            cancel_policy: CancelPolicy::default(),
        }
    }
}

impl AuditConfig {
    /// Check ranges and cross-field consistency.
    pub fn validate(&self) -> Result<(), EngineError> {
        if self.max_pages == 0 || self.max_pages > MAX_PAGES_CEILING {
            return Err(EngineError::InvalidConfig(format!(
                "max_pages must be in 1..={MAX_PAGES_CEILING}, got {}",
                self.max_pages
            )));
        }
        if self.fetch_concurrency == 0 || self.fetch_concurrency > FETCH_CONCURRENCY_CEILING {
            return Err(EngineError::InvalidConfig(format!(
                "fetch_concurrency must be in 1..={FETCH_CONCURRENCY_CEILING}, got {}",
                self.fetch_concurrency
            )));
        }
        if self.provider_concurrency == 0 {
            return Err(EngineError::InvalidConfig(
                "provider_concurrency must be at least 1".into(),
            ));
        }
        if self.per_request_timeout_ms == 0
            || self.overall_timeout_ms == 0
            || self.provider_timeout_ms == 0
        {
            return Err(EngineError::InvalidConfig("timeouts must be non-zero".into()));
        }
        if self.max_body_bytes == 0 {
            return Err(EngineError::InvalidConfig("max_body_bytes must be non-zero".into()));
        }
        if self.user_agent.trim().is_empty() {
            return Err(EngineError::InvalidConfig("user_agent must not be empty".into()));
        }
        for competitor in &self.competitor_urls {
            parse_seed_url(competitor)?;
        }
        Ok(())
    }

    pub fn per_request_timeout(&self) -> Duration {
        Duration::from_millis(self.per_request_timeout_ms)
    }

    pub fn overall_timeout(&self) -> Duration {
        Duration::from_millis(self.overall_timeout_ms)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }
}
