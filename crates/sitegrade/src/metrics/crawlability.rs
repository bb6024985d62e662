//! Crawlability metrics (101–110).

use crate::crawl::urls::normalize_url;
use crate::metrics::context::EvalContext;
use crate::metrics::{page_share, percent, NO_HTML_PAGES, NO_RESPONSES};
use crate::model::metric::{MetricId, MetricResult, MetricValue};
use crate::model::page::{ErrorReason, LinkCheck};
use crate::model::site::{RobotsProbe, SitemapProbe};
use std::collections::{BTreeMap, HashMap, HashSet};
use url::Url;

const HTTP_STATUS_HEALTH: MetricId = MetricId(101);
const SERVER_ERRORS: MetricId = MetricId(102);
const BROKEN_INTERNAL_LINKS: MetricId = MetricId(103);
const BROKEN_EXTERNAL_LINKS: MetricId = MetricId(104);
const REDIRECT_CHAINS: MetricId = MetricId(105);
const ROBOTS_TXT: MetricId = MetricId(106);
const XML_SITEMAP: MetricId = MetricId(107);
const CANONICAL_TAGS: MetricId = MetricId(108);
const INDEXABLE_PAGES: MetricId = MetricId(109);
const PARAMETERIZED_URLS: MetricId = MetricId(110);

pub fn http_status_health(ctx: &EvalContext<'_>) -> MetricResult {
    let responded: Vec<_> = ctx.responded().collect();
    if responded.is_empty() {
        return MetricResult::unavailable(HTTP_STATUS_HEALTH, NO_RESPONSES);
    }
    let ok = responded.iter().filter(|p| p.is_ok()).count();
    let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
    for page in &responded {
        if let Some(status) = page.status {
            *by_status.entry(status.to_string()).or_default() += 1;
        }
    }
    MetricResult::measured(
        HTTP_STATUS_HEALTH,
        MetricValue::Structured(serde_json::json!(by_status)),
        percent(ok, responded.len()),
        format!("{ok}/{} pages returned a success status", responded.len()),
    )
}

pub fn server_errors(ctx: &EvalContext<'_>) -> MetricResult {
    let responded: Vec<_> = ctx.responded().collect();
    if responded.is_empty() {
        return MetricResult::unavailable(SERVER_ERRORS, NO_RESPONSES);
    }
    let errors = responded
        .iter()
        .filter(|p| p.status.map(|s| s >= 500).unwrap_or(false))
        .count();
    MetricResult::measured(
        SERVER_ERRORS,
        MetricValue::count(errors),
        100.0 - percent(errors, responded.len()),
        format!("{errors} pages returned a 5xx status"),
    )
}

pub fn broken_internal_links(ctx: &EvalContext<'_>) -> MetricResult {
    if ctx.html_pages().next().is_none() {
        return MetricResult::unavailable(BROKEN_INTERNAL_LINKS, NO_HTML_PAGES);
    }

    // Outcome of every crawled URL, keyed by requested and final URL.
    let mut crawled: HashMap<&str, bool> = HashMap::new();
    for page in ctx.pages {
        crawled.insert(page.url.as_str(), page.is_ok());
        crawled.entry(page.final_url.as_str()).or_insert(page.is_ok());
    }

    let targets: HashSet<&str> = ctx
        .html_pages()
        .flat_map(|(_, dom)| dom.links.iter())
        .filter(|l| {
            Url::parse(&l.href)
                .map(|u| ctx.is_internal(&u))
                .unwrap_or(false)
        })
        .map(|l| l.href.as_str())
        .collect();

    if targets.is_empty() {
        return MetricResult::measured(
            BROKEN_INTERNAL_LINKS,
            MetricValue::Count(0),
            100.0,
            "no internal links found",
        );
    }

    let mut checked = 0;
    let mut broken = 0;
    for target in &targets {
        let key = Url::parse(target)
            .map(|u| normalize_url(&u))
            .unwrap_or_else(|_| target.to_string());
        if let Some(ok) = crawled.get(key.as_str()) {
            checked += 1;
            if !ok {
                broken += 1;
            }
        }
    }

    if checked == 0 {
        return MetricResult::unavailable(
            BROKEN_INTERNAL_LINKS,
            "no internal link target was within the crawled pages",
        );
    }

    let subscore = 100.0 - percent(broken, checked);
    let detail = format!("{broken} of {checked} checked internal link targets are broken");
    if checked < targets.len() {
        MetricResult::estimated(
            BROKEN_INTERNAL_LINKS,
            MetricValue::count(broken),
            subscore,
            format!("{detail} ({} targets outside the crawl)", targets.len() - checked),
        )
    } else {
        MetricResult::measured(BROKEN_INTERNAL_LINKS, MetricValue::count(broken), subscore, detail)
    }
}

pub fn broken_external_links(ctx: &EvalContext<'_>) -> MetricResult {
    if ctx.html_pages().next().is_none() {
        return MetricResult::unavailable(BROKEN_EXTERNAL_LINKS, NO_HTML_PAGES);
    }

    let mut checks: BTreeMap<&str, &LinkCheck> = BTreeMap::new();
    for check in ctx.pages.iter().flat_map(|p| p.link_checks.iter()) {
        checks.entry(check.url.as_str()).or_insert(check);
    }
    let truncated = ctx.pages.iter().any(|p| p.link_checks_truncated);

    if checks.is_empty() && truncated {
        return MetricResult::unavailable(BROKEN_EXTERNAL_LINKS, "outbound links not checked");
    }
    if checks.is_empty() {
        return MetricResult::measured(
            BROKEN_EXTERNAL_LINKS,
            MetricValue::Count(0),
            100.0,
            "no outbound links found",
        );
    }

    let broken: Vec<&str> = checks
        .values()
        .filter(|c| c.is_broken())
        .map(|c| c.url.as_str())
        .collect();
    let subscore = 100.0 - percent(broken.len(), checks.len());
    let detail = format!("{} of {} outbound links are broken", broken.len(), checks.len());
    let value = MetricValue::Structured(serde_json::json!({
        "checked": checks.len(),
        "broken": broken,
    }));

    if truncated {
        MetricResult::estimated(BROKEN_EXTERNAL_LINKS, value, subscore, format!("{detail} (sampled)"))
    } else {
        MetricResult::measured(BROKEN_EXTERNAL_LINKS, value, subscore, detail)
    }
}

pub fn redirect_chains(ctx: &EvalContext<'_>) -> MetricResult {
    let considered: Vec<_> = ctx
        .pages
        .iter()
        .filter(|p| p.has_response() || p.error == Some(ErrorReason::TooManyRedirects))
        .collect();
    if considered.is_empty() {
        return MetricResult::unavailable(REDIRECT_CHAINS, NO_RESPONSES);
    }
    let chains = considered
        .iter()
        .filter(|p| p.redirects > 1 || p.error == Some(ErrorReason::TooManyRedirects))
        .count();
    MetricResult::measured(
        REDIRECT_CHAINS,
        MetricValue::count(chains),
        100.0 - percent(chains, considered.len()),
        format!("{chains} pages reached through more than one redirect"),
    )
}

pub fn robots_txt(ctx: &EvalContext<'_>) -> MetricResult {
    match &ctx.site.robots {
        RobotsProbe::Found { rules } if rules.blocks_all() => MetricResult::measured(
            ROBOTS_TXT,
            MetricValue::Text("blocks_all".into()),
            0.0,
            "robots.txt disallows the whole site",
        ),
        RobotsProbe::Found { rules } => MetricResult::measured(
            ROBOTS_TXT,
            MetricValue::Text("present".into()),
            100.0,
            format!(
                "robots.txt present with {} disallow rules",
                rules.disallowed.len()
            ),
        ),
        RobotsProbe::Missing { status } if *status < 500 => MetricResult::measured(
            ROBOTS_TXT,
            MetricValue::Text("missing".into()),
            50.0,
            format!("no robots.txt (HTTP {status})"),
        ),
        RobotsProbe::Missing { status } => MetricResult::measured(
            ROBOTS_TXT,
            MetricValue::Text("error".into()),
            20.0,
            format!("robots.txt request failed with HTTP {status}"),
        ),
        RobotsProbe::Unreachable { reason } => {
            MetricResult::unavailable(ROBOTS_TXT, format!("robots.txt unreachable: {reason}"))
        }
        RobotsProbe::NotChecked => MetricResult::unavailable(ROBOTS_TXT, "robots.txt not checked"),
    }
}

pub fn xml_sitemap(ctx: &EvalContext<'_>) -> MetricResult {
    match &ctx.site.sitemap {
        SitemapProbe::Found { url, url_count, index } => {
            let kind = if *index { "sitemap index" } else { "sitemap" };
            MetricResult::measured(
                XML_SITEMAP,
                MetricValue::count(*url_count),
                if *url_count > 0 { 100.0 } else { 60.0 },
                format!("{kind} at {url} lists {url_count} entries"),
            )
        }
        SitemapProbe::Invalid { url } => MetricResult::measured(
            XML_SITEMAP,
            MetricValue::Text("invalid".into()),
            30.0,
            format!("{url} is not a valid sitemap"),
        ),
        SitemapProbe::Missing => MetricResult::measured(
            XML_SITEMAP,
            MetricValue::Text("missing".into()),
            0.0,
            "no XML sitemap found",
        ),
        SitemapProbe::Unreachable { reason } => {
            MetricResult::unavailable(XML_SITEMAP, format!("sitemap unreachable: {reason}"))
        }
        SitemapProbe::NotChecked => MetricResult::unavailable(XML_SITEMAP, "sitemap not checked"),
    }
}

pub fn canonical_tags(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, CANONICAL_TAGS, "declare a canonical URL", |_, dom| {
        dom.canonical.is_some()
    })
}

pub fn indexable_pages(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, INDEXABLE_PAGES, "are indexable", |page, dom| {
        let header_noindex = page
            .header_all("x-robots-tag")
            .any(|v| v.to_ascii_lowercase().contains("noindex"));
        !dom.is_noindex() && !header_noindex
    })
}

pub fn parameterized_urls(ctx: &EvalContext<'_>) -> MetricResult {
    let pages: Vec<_> = ctx.ok_pages().collect();
    if pages.is_empty() {
        return MetricResult::unavailable(PARAMETERIZED_URLS, NO_RESPONSES);
    }
    let with_query = pages
        .iter()
        .filter(|p| {
            Url::parse(&p.final_url)
                .map(|u| u.query().is_some())
                .unwrap_or(false)
        })
        .count();
    MetricResult::measured(
        PARAMETERIZED_URLS,
        MetricValue::count(with_query),
        100.0 - percent(with_query, pages.len()),
        format!("{with_query}/{} pages use query parameters", pages.len()),
    )
}
