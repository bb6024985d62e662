//! Breadth-first, budgeted crawl of one site.
//!
//! A single coordinator owns the frontier, the seen set and the collected
//! pages. Workers run on a `JoinSet` sized by `fetch_concurrency` and hand
//! their finished [`PageFact`] back through the join handle.

use crate::config::AuditConfig;
use crate::crawl::rate_limiter::RateLimiter;
use crate::crawl::robots::{parse_robots, RobotsRules};
use crate::crawl::sitemap::parse_sitemap;
use crate::crawl::urls::{is_asset, normalize_url, robots_path, same_site};
use crate::extraction::parse_html_blocking;
use crate::fetch::head_scanner::{check_links, probe_compression, sample_off_site};
use crate::fetch::Fetcher;
use crate::model::page::{ErrorReason, PageFact};
use crate::model::site::{CrawlStats, RobotsProbe, SiteFacts, SitemapProbe};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

/// Sitemap URLs from robots.txt tried before giving up.
const MAX_SITEMAP_CANDIDATES: usize = 3;

/// Everything a crawl produced.
#[derive(Debug)]
pub struct CrawlOutput {
    /// Pages in resolution order.
    pub pages: Vec<PageFact>,
    pub site: SiteFacts,
    /// The cancellation token fired before the crawl finished.
    pub interrupted: bool,
}

/// Which parts of the crawl to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrawlMode {
    /// Robots, sitemap and a budgeted link-following crawl.
    Full,
    /// The seed page only, no site probes.
    SeedOnly,
}

/// Result of one worker task.
struct PageOutcome {
    page: PageFact,
    /// Same-site page links to consider for the frontier.
    internal: Vec<Url>,
}

/// Crawl `seed` under `config`, stopping promptly when `cancel` fires.
pub async fn crawl(
    fetcher: Fetcher,
    seed: &Url,
    config: &AuditConfig,
    mode: CrawlMode,
    cancel: &CancellationToken,
) -> CrawlOutput {
    if mode == CrawlMode::SeedOnly {
        let limits = CrawlLimits {
            max_pages: 1,
            max_depth: 0,
            link_check_sample: 0,
            ..CrawlLimits::from(config)
        };
        let (pages, crawl, interrupted) =
            crawl_pages(fetcher, seed, &limits, None, cancel).await;
        return CrawlOutput {
            pages,
            site: SiteFacts {
                crawl,
                ..SiteFacts::default()
            },
            interrupted,
        };
    }

    let robots = tokio::select! {
        _ = cancel.cancelled() => None,
        probe = probe_robots(&fetcher, seed, &config.user_agent) => Some(probe),
    };
    let Some(robots) = robots else {
        return CrawlOutput {
            pages: Vec::new(),
            site: SiteFacts::default(),
            interrupted: true,
        };
    };

    let crawl_delay = robots.rules().and_then(RobotsRules::crawl_delay);
    let fetcher = fetcher.with_limiter(Arc::new(RateLimiter::with_crawl_delay(
        config.fetch_concurrency,
        Duration::from_millis(config.politeness_delay_ms),
        crawl_delay,
    )));
    let rules = config
        .respect_robots
        .then(|| robots.rules().cloned())
        .flatten();

    let limits = CrawlLimits::from(config);
    let sitemap_sources: Vec<String> = robots
        .rules()
        .map(|r| r.sitemaps.clone())
        .unwrap_or_default();

    let (sitemap, (pages, crawl, interrupted)) = tokio::join!(
        async {
            tokio::select! {
                _ = cancel.cancelled() => SitemapProbe::NotChecked,
                probe = probe_sitemap(&fetcher, seed, &sitemap_sources) => probe,
            }
        },
        crawl_pages(fetcher.clone(), seed, &limits, rules.as_ref(), cancel),
    );

    info!(
        "crawled {} pages from {seed} ({} blocked by robots, {} over budget)",
        pages.len(),
        crawl.blocked_by_robots,
        crawl.skipped_by_budget
    );

    CrawlOutput {
        pages,
        site: SiteFacts {
            robots,
            sitemap,
            crawl,
        },
        interrupted,
    }
}

#[derive(Debug, Clone)]
struct CrawlLimits {
    max_pages: usize,
    max_depth: u32,
    concurrency: usize,
    link_check_sample: usize,
}

impl From<&AuditConfig> for CrawlLimits {
    fn from(config: &AuditConfig) -> Self {
        Self {
            max_pages: config.max_pages,
            max_depth: config.max_depth,
            concurrency: config.fetch_concurrency.max(1),
            link_check_sample: config.link_check_sample,
        }
    }
}

// ── Coordinator ─────────────────────────────────────────────

async fn crawl_pages(
    fetcher: Fetcher,
    seed: &Url,
    limits: &CrawlLimits,
    rules: Option<&RobotsRules>,
    cancel: &CancellationToken,
) -> (Vec<PageFact>, CrawlStats, bool) {
    let mut frontier: VecDeque<(Url, u32)> = VecDeque::from([(seed.clone(), 0)]);
    let mut seen: HashSet<String> = HashSet::from([normalize_url(seed)]);
    let mut pages: Vec<PageFact> = Vec::new();
    let mut stats = CrawlStats {
        urls_discovered: 1,
        ..CrawlStats::default()
    };
    let mut workers: JoinSet<PageOutcome> = JoinSet::new();
    let mut dispatched = 0usize;
    let mut interrupted = false;

    loop {
        while workers.len() < limits.concurrency && dispatched < limits.max_pages {
            let Some((url, depth)) = frontier.pop_front() else {
                break;
            };
            if !robots_allow(rules, &url, depth) {
                debug!("robots.txt disallows {url}");
                stats.blocked_by_robots += 1;
                continue;
            }
            dispatched += 1;
            workers.spawn(fetch_page(
                fetcher.clone(),
                url,
                depth,
                seed.clone(),
                limits.link_check_sample,
            ));
        }

        if workers.is_empty() {
            break;
        }

        tokio::select! {
            _ = cancel.cancelled() => {
                workers.abort_all();
                while workers.join_next().await.is_some() {}
                interrupted = true;
                break;
            }
            Some(joined) = workers.join_next() => {
                let outcome = match joined {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!("crawl worker failed: {e}");
                        continue;
                    }
                };

                seen.insert(outcome.page.final_url.clone());
                let next_depth = outcome.page.depth + 1;
                for link in outcome.internal {
                    if !seen.insert(normalize_url(&link)) {
                        continue;
                    }
                    stats.urls_discovered += 1;
                    if next_depth > limits.max_depth {
                        stats.skipped_by_depth += 1;
                        continue;
                    }
                    frontier.push_back((link, next_depth));
                }
                pages.push(outcome.page);
            }
        }
    }

    stats.pages_fetched = pages.len();
    if !interrupted {
        let (allowed, blocked): (Vec<_>, Vec<_>) = frontier
            .iter()
            .partition(|(url, depth)| robots_allow(rules, url, *depth));
        stats.blocked_by_robots += blocked.len();
        stats.skipped_by_budget = allowed.len();
        stats.budget_exhausted = !allowed.is_empty();
    }
    (pages, stats, interrupted)
}

/// The seed is always fetched so the audit has something to grade.
fn robots_allow(rules: Option<&RobotsRules>, url: &Url, depth: u32) -> bool {
    match rules {
        Some(rules) if depth > 0 => rules.is_allowed(&robots_path(url)),
        _ => true,
    }
}

// ── Worker ──────────────────────────────────────────────────

async fn fetch_page(
    fetcher: Fetcher,
    url: Url,
    depth: u32,
    seed: Url,
    link_check_sample: usize,
) -> PageOutcome {
    let raw = fetcher.get(&url).await;
    let normalized = normalize_url(&url);

    if raw.status.is_none() {
        let reason = raw.error.unwrap_or(ErrorReason::ConnectionFailed);
        warn!("failed to fetch {url}: {reason}");
        let mut page =
            PageFact::transport_error(&normalized, depth, reason, raw.elapsed.as_millis() as u64);
        page.final_url = normalize_url(&raw.final_url);
        page.redirects = raw.redirects;
        return PageOutcome {
            page,
            internal: Vec::new(),
        };
    }

    let html = raw.is_html() && !raw.body.is_empty();
    let dom = if html {
        parse_html_blocking(raw.text(), raw.final_url.clone()).await
    } else {
        None
    };

    let mut internal = Vec::new();
    let mut external = Vec::new();
    if raw.error.is_none() && same_site(&raw.final_url, &seed) {
        for link in dom.iter().flat_map(|d| d.links.iter()) {
            let Ok(target) = Url::parse(&link.href) else {
                continue;
            };
            if same_site(&target, &seed) {
                if !is_asset(&target) {
                    internal.push(target);
                }
            } else {
                external.push(target);
            }
        }
    }

    let compression = match raw.header("content-encoding") {
        Some(enc) if !enc.eq_ignore_ascii_case("identity") => Some(enc.to_ascii_lowercase()),
        _ if html && raw.error.is_none() => probe_compression(&fetcher, &raw.final_url).await,
        _ => None,
    };

    let (sample, link_checks_truncated) = sample_off_site(&external, link_check_sample);
    let link_checks = if sample.is_empty() {
        Vec::new()
    } else {
        check_links(&fetcher, sample).await
    };

    let page = PageFact {
        url: normalized,
        final_url: normalize_url(&raw.final_url),
        depth,
        status: raw.status,
        byte_size: raw.body.len(),
        elapsed_ms: raw.elapsed.as_millis() as u64,
        redirects: raw.redirects,
        compression,
        dom,
        error: raw.error,
        link_checks,
        link_checks_truncated,
        headers: raw.headers,
    };

    PageOutcome { page, internal }
}

// ── Site probes ─────────────────────────────────────────────

async fn probe_robots(fetcher: &Fetcher, seed: &Url, user_agent: &str) -> RobotsProbe {
    let Ok(url) = seed.join("/robots.txt") else {
        return RobotsProbe::NotChecked;
    };
    let raw = fetcher.get(&url).await;
    match (raw.status, raw.error) {
        (Some(status), None) if status < 300 => RobotsProbe::Found {
            rules: parse_robots(&raw.text(), user_agent),
        },
        (Some(status), _) => RobotsProbe::Missing { status },
        (None, reason) => {
            let reason = reason.unwrap_or(ErrorReason::ConnectionFailed);
            debug!("robots.txt unreachable for {seed}: {reason}");
            RobotsProbe::Unreachable { reason }
        }
    }
}

async fn probe_sitemap(fetcher: &Fetcher, seed: &Url, declared: &[String]) -> SitemapProbe {
    let mut candidates: Vec<Url> = declared
        .iter()
        .filter_map(|s| Url::parse(s).ok())
        .take(MAX_SITEMAP_CANDIDATES)
        .collect();
    if candidates.is_empty() {
        if let Ok(url) = seed.join("/sitemap.xml") {
            candidates.push(url);
        }
    }

    let mut invalid = None;
    let mut responded = false;
    let mut last_error = ErrorReason::ConnectionFailed;
    for url in candidates {
        let raw = fetcher.get(&url).await;
        if raw.status.is_some() {
            responded = true;
        }
        if let Some(reason) = raw.error {
            last_error = reason;
            continue;
        }
        match parse_sitemap(&raw.text()) {
            Some(summary) => {
                return SitemapProbe::Found {
                    url: url.to_string(),
                    url_count: summary.url_count,
                    index: summary.index,
                }
            }
            None => invalid = Some(url.to_string()),
        }
    }

    match invalid {
        Some(url) => SitemapProbe::Invalid { url },
        None if responded => SitemapProbe::Missing,
        None => SitemapProbe::Unreachable { reason: last_error },
    }
}
