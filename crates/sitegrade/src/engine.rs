//! The audit orchestrator.
//!
//! Sequences crawl, providers, evaluation, aggregation and grading for one
//! target. An [`Engine`] is cheap to clone and may run any number of audits
//! at once; they share only the HTTP clients, the global fetch ceiling and
//! the scoring policy.

use crate::config::{AuditConfig, CancelPolicy, ProviderCredentials, Target, DEFAULT_USER_AGENT};
use crate::crawl::urls::registrable_domain;
use crate::crawl::{crawl, CrawlMode, CrawlOutput, RateLimiter};
use crate::error::EngineError;
use crate::fetch::{FetchGovernor, FetchOptions, Fetcher, HttpClient, DEFAULT_GLOBAL_CEILING};
use crate::metrics::{evaluate_all, EvalContext, CATALOGUE, CATALOGUE_VERSION};
use crate::model::metric::{MetricId, MetricResult};
use crate::model::page::PageFact;
use crate::model::result::{AuditResult, CompetitorSummary, Completion, StopReason};
use crate::model::site::SiteFacts;
use crate::providers::{AuthorityProvider, ProviderFacts, ProviderOutcome, Providers, VitalsProvider};
use crate::scoring::{aggregate, grade, summarize, Aggregate, GradeOutcome, ScoringPolicy, Summary};
use chrono::Utc;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Engine-wide settings shared by every audit.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Outbound requests allowed in flight across all audits.
    pub global_fetch_ceiling: usize,
    pub scoring: ScoringPolicy,
    /// Fallback credentials for audits whose config carries none.
    pub credentials: ProviderCredentials,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            global_fetch_ceiling: DEFAULT_GLOBAL_CEILING,
            scoring: ScoringPolicy::default(),
            credentials: ProviderCredentials::default(),
        }
    }
}

#[derive(Clone)]
pub struct Engine {
    client: HttpClient,
    provider_client: reqwest::Client,
    governor: Arc<FetchGovernor>,
    scoring: Arc<ScoringPolicy>,
    credentials: ProviderCredentials,
    /// Providers injected by the caller; take precedence over credentials.
    overrides: Providers,
}

/// Scores computed on the blocking pool, handed back with the inputs.
struct Scored {
    target: Target,
    pages: Vec<PageFact>,
    site: SiteFacts,
    providers: ProviderFacts,
    metrics: BTreeMap<MetricId, MetricResult>,
    aggregate: Aggregate,
    outcome: GradeOutcome,
    summary: Summary,
    seed_reachable: bool,
}

impl Engine {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        settings.scoring.validate()?;
        if settings.global_fetch_ceiling == 0 {
            return Err(EngineError::InvalidConfig(
                "global_fetch_ceiling must be at least 1".into(),
            ));
        }
        let provider_client = reqwest::Client::builder()
            .user_agent(DEFAULT_USER_AGENT)
            .build()?;
        Ok(Self {
            client: HttpClient::new()?,
            provider_client,
            governor: Arc::new(FetchGovernor::new(settings.global_fetch_ceiling)),
            scoring: Arc::new(settings.scoring),
            credentials: settings.credentials,
            overrides: Providers::default(),
        })
    }

    /// Use `provider` for lab vitals instead of the PageSpeed client.
    pub fn with_vitals_provider(mut self, provider: Arc<dyn VitalsProvider>) -> Self {
        self.overrides.vitals = Some(provider);
        self
    }

    /// Use `provider` for authority signals instead of the configured API.
    pub fn with_authority_provider(mut self, provider: Arc<dyn AuthorityProvider>) -> Self {
        self.overrides.authority = Some(provider);
        self
    }

    pub fn scoring(&self) -> &ScoringPolicy {
        &self.scoring
    }

    pub fn governor(&self) -> &FetchGovernor {
        &self.governor
    }

    /// Audit `target`.
    ///
    /// Cancelling `cancel` (or running past `overall_timeout`) stops new
    /// fetches, aborts in-flight ones and abandons provider calls. What is
    /// returned then depends on the target's [`CancelPolicy`].
    pub async fn run_audit(
        &self,
        target: &Target,
        cancel: CancellationToken,
    ) -> Result<AuditResult, EngineError> {
        let config = &target.config;
        config.validate()?;

        let audit_id = Uuid::new_v4();
        let token = cancel.child_token();
        let deadline_hit = Arc::new(AtomicBool::new(false));
        let timer = spawn_deadline(token.clone(), config.overall_timeout(), deadline_hit.clone());

        info!("audit {audit_id} started for {}", target.url);

        let providers = self.providers_for(config);
        let domain = registrable_domain(target.host());
        let (crawled, provider_facts, competitors) = tokio::join!(
            crawl(self.fetcher(config), &target.url, config, CrawlMode::Full, &token),
            providers.collect(
                &target.url,
                &domain,
                config.provider_concurrency,
                config.provider_timeout(),
                &token,
            ),
            self.audit_competitors(config, &token),
        );
        timer.abort();

        let stopped = if deadline_hit.load(Ordering::SeqCst) {
            Some(StopReason::Deadline)
        } else if crawled.interrupted || token.is_cancelled() {
            Some(StopReason::Cancelled)
        } else {
            None
        };

        if let Some(reason) = stopped {
            warn!(
                "audit {audit_id} stopped early ({reason:?}) after {} pages",
                crawled.pages.len()
            );
            if config.cancel_policy == CancelPolicy::Error {
                return Err(match reason {
                    StopReason::Deadline => EngineError::DeadlineExceeded(config.overall_timeout()),
                    StopReason::Cancelled => EngineError::Cancelled,
                });
            }
        }

        let scored = self.score(target.clone(), crawled, provider_facts).await?;
        if !scored.seed_reachable {
            let reason = scored
                .pages
                .first()
                .and_then(|p| p.error)
                .map(|e| e.to_string())
                .unwrap_or_else(|| "not fetched".into());
            warn!("seed {} unreachable: {reason}", target.url);
        }

        let result = AuditResult {
            audit_id,
            target: scored.target,
            pages: scored.pages,
            site: scored.site,
            providers: scored.providers,
            metrics: scored.metrics,
            categories: scored.aggregate.categories,
            overall_score: scored.aggregate.overall_score,
            overall_coverage: scored.aggregate.overall_coverage,
            outcome: scored.outcome,
            completion: match stopped {
                Some(reason) => Completion::Partial { reason },
                None => Completion::Complete,
            },
            seed_reachable: scored.seed_reachable,
            competitors,
            summary: scored.summary,
            generated_at: Utc::now(),
            catalogue_version: CATALOGUE_VERSION,
        };

        info!(
            "audit {audit_id} finished: grade {} (score {:?}, coverage {:.2})",
            result.outcome.label(),
            result.overall_score,
            result.overall_coverage
        );
        Ok(result)
    }

    /// Blocking wrapper around [`Engine::run_audit`] for callers without a
    /// runtime. Must not be called from inside an async context.
    pub fn run_audit_blocking(
        &self,
        target: &Target,
        cancel: CancellationToken,
    ) -> Result<AuditResult, EngineError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        runtime.block_on(self.run_audit(target, cancel))
    }

    fn fetcher(&self, config: &AuditConfig) -> Fetcher {
        let limiter = RateLimiter::new(
            config.fetch_concurrency,
            Duration::from_millis(config.politeness_delay_ms),
        );
        Fetcher::new(
            self.client.clone(),
            self.governor.clone(),
            Arc::new(limiter),
            FetchOptions {
                user_agent: config.user_agent.clone(),
                timeout: config.per_request_timeout(),
                max_body_bytes: config.max_body_bytes,
            },
        )
    }

    fn providers_for(&self, config: &AuditConfig) -> Providers {
        let credentials = config.credentials.clone().or(self.credentials.clone());
        self.overrides
            .clone()
            .or(Providers::from_credentials(&self.provider_client, &credentials))
    }

    /// Evaluate, aggregate and grade on the blocking pool.
    async fn score(
        &self,
        target: Target,
        crawled: CrawlOutput,
        providers: ProviderFacts,
    ) -> Result<Scored, EngineError> {
        let scoring = self.scoring.clone();
        tokio::task::spawn_blocking(move || {
            let CrawlOutput { pages, site, .. } = crawled;
            let ctx = EvalContext::new(&target, &pages, &site, &providers);
            let seed_reachable = ctx.seed().map(PageFact::has_response).unwrap_or(false);
            let metrics = evaluate_all(CATALOGUE, &ctx);
            let aggregate = aggregate(CATALOGUE, &metrics, &scoring.category_weights);
            let outcome = grade(
                aggregate.overall_score,
                aggregate.overall_coverage,
                &scoring.grade,
            );
            let summary = summarize(CATALOGUE, &aggregate, &metrics);
            Scored {
                target,
                pages,
                site,
                providers,
                metrics,
                aggregate,
                outcome,
                summary,
                seed_reachable,
            }
        })
        .await
        .map_err(|e| EngineError::Evaluation(e.to_string()))
    }

    /// Seed-only audits of every competitor, in configuration order.
    async fn audit_competitors(
        &self,
        config: &AuditConfig,
        cancel: &CancellationToken,
    ) -> Vec<CompetitorSummary> {
        let audits = config
            .competitor_urls
            .iter()
            .map(|url| self.audit_competitor(url, config, cancel));
        join_all(audits).await
    }

    async fn audit_competitor(
        &self,
        url: &str,
        config: &AuditConfig,
        cancel: &CancellationToken,
    ) -> CompetitorSummary {
        let competitor_config = AuditConfig {
            competitor_urls: Vec::new(),
            ..config.clone()
        };
        let failed = |error: String| CompetitorSummary {
            url: url.to_string(),
            overall_score: None,
            grade: GradeOutcome::Ungradeable.label().to_string(),
            overall_coverage: 0.0,
            error: Some(error),
        };

        let target = match Target::new(url, competitor_config) {
            Ok(t) => t,
            Err(e) => return failed(e.to_string()),
        };
        let crawled = crawl(
            self.fetcher(&target.config),
            &target.url,
            &target.config,
            CrawlMode::SeedOnly,
            cancel,
        )
        .await;
        let providers = ProviderFacts {
            vitals: ProviderOutcome::unavailable("not requested for competitors"),
            authority: ProviderOutcome::unavailable("not requested for competitors"),
        };

        match self.score(target, crawled, providers).await {
            Ok(scored) => {
                debug!(
                    "competitor {url}: {} ({:?})",
                    scored.outcome.label(),
                    scored.aggregate.overall_score
                );
                CompetitorSummary {
                    url: scored.target.url.to_string(),
                    overall_score: scored.aggregate.overall_score,
                    grade: scored.outcome.label().to_string(),
                    overall_coverage: scored.aggregate.overall_coverage,
                    error: (!scored.seed_reachable).then(|| "seed unreachable".to_string()),
                }
            }
            Err(e) => {
                warn!("competitor {url} failed: {e}");
                failed(e.to_string())
            }
        }
    }
}

/// Cancel `token` once `budget` elapses, recording that the deadline fired.
fn spawn_deadline(
    token: CancellationToken,
    budget: Duration,
    fired: Arc<AtomicBool>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            _ = tokio::time::sleep(budget) => {
                fired.store(true, Ordering::SeqCst);
                token.cancel();
            }
        }
    })
}
