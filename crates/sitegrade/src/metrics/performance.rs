//! Performance metrics (301–313).
//!
//! 301–308 are derived from the crawl. 309–313 come from PageSpeed lab data
//! and are unavailable without it.

use crate::metrics::context::EvalContext;
use crate::metrics::{header_share, linear, mean, median, percent, NO_HTML_PAGES, NO_RESPONSES};
use crate::model::metric::{MetricId, MetricResult, MetricValue};
use crate::providers::pagespeed::LabVitals;

const SERVER_RESPONSE_TIME: MetricId = MetricId(301);
const PAGE_WEIGHT: MetricId = MetricId(302);
const TEXT_COMPRESSION: MetricId = MetricId(303);
const RENDER_BLOCKING: MetricId = MetricId(304);
const REQUESTS_PER_PAGE: MetricId = MetricId(305);
const BROWSER_CACHING: MetricId = MetricId(306);
const IMAGE_LAZY_LOADING: MetricId = MetricId(307);
const DOM_SIZE: MetricId = MetricId(308);
const LARGEST_CONTENTFUL_PAINT: MetricId = MetricId(309);
const CUMULATIVE_LAYOUT_SHIFT: MetricId = MetricId(310);
const TOTAL_BLOCKING_TIME: MetricId = MetricId(311);
const FIRST_CONTENTFUL_PAINT: MetricId = MetricId(312);
const LIGHTHOUSE_PERFORMANCE: MetricId = MetricId(313);

const COMPRESSED_ENCODINGS: &[&str] = &["gzip", "br", "deflate", "zstd"];
/// Images above the fold that are expected to load eagerly.
const EAGER_IMAGES_PER_PAGE: usize = 2;

pub fn server_response_time(ctx: &EvalContext<'_>) -> MetricResult {
    let mut times: Vec<f64> = ctx.ok_pages().map(|p| p.elapsed_ms as f64).collect();
    let Some(ms) = median(&mut times) else {
        return MetricResult::unavailable(SERVER_RESPONSE_TIME, NO_RESPONSES);
    };
    MetricResult::measured(
        SERVER_RESPONSE_TIME,
        MetricValue::Number(ms),
        linear(ms, 200.0, 2000.0),
        format!("median response time {ms:.0} ms"),
    )
}

pub fn page_weight(ctx: &EvalContext<'_>) -> MetricResult {
    let sizes: Vec<f64> = ctx.html_pages().map(|(p, _)| p.byte_size as f64).collect();
    let Some(avg) = mean(&sizes) else {
        return MetricResult::unavailable(PAGE_WEIGHT, NO_HTML_PAGES);
    };
    MetricResult::measured(
        PAGE_WEIGHT,
        MetricValue::Number(avg.round()),
        linear(avg, 100_000.0, 1_000_000.0),
        format!("average HTML size {:.1} KB", avg / 1000.0),
    )
}

pub fn text_compression(ctx: &EvalContext<'_>) -> MetricResult {
    let pages: Vec<_> = ctx.html_pages().map(|(p, _)| p).collect();
    if pages.is_empty() {
        return MetricResult::unavailable(TEXT_COMPRESSION, NO_HTML_PAGES);
    }
    let compressed = pages
        .iter()
        .filter(|p| {
            p.compression
                .as_deref()
                .map(|enc| {
                    enc.split(',')
                        .any(|e| COMPRESSED_ENCODINGS.contains(&e.trim().to_ascii_lowercase().as_str()))
                })
                .unwrap_or(false)
        })
        .count();
    MetricResult::measured(
        TEXT_COMPRESSION,
        MetricValue::ratio(compressed as f64 / pages.len() as f64),
        percent(compressed, pages.len()),
        format!("{compressed}/{} HTML pages served compressed", pages.len()),
    )
}

pub fn render_blocking(ctx: &EvalContext<'_>) -> MetricResult {
    average_per_page(ctx, RENDER_BLOCKING, "render-blocking resources", (2.0, 12.0), |dom| {
        dom.render_blocking_count
    })
}

pub fn requests_per_page(ctx: &EvalContext<'_>) -> MetricResult {
    average_per_page(ctx, REQUESTS_PER_PAGE, "requests", (25.0, 100.0), |dom| {
        1 + dom.external_script_count + dom.stylesheet_count + dom.images.len()
    })
}

pub fn browser_caching(ctx: &EvalContext<'_>) -> MetricResult {
    header_share(ctx, BROWSER_CACHING, "send caching headers", |page| {
        page.header("cache-control")
            .map(|v| !v.to_ascii_lowercase().contains("no-store"))
            .unwrap_or(false)
            || page.header("etag").is_some()
            || page.header("last-modified").is_some()
    })
}

pub fn image_lazy_loading(ctx: &EvalContext<'_>) -> MetricResult {
    let mut html_pages = 0;
    let mut candidates = 0;
    let mut lazy = 0;
    for (_, dom) in ctx.html_pages() {
        html_pages += 1;
        for image in dom.images.iter().skip(EAGER_IMAGES_PER_PAGE) {
            candidates += 1;
            if image.lazy {
                lazy += 1;
            }
        }
    }
    if html_pages == 0 {
        return MetricResult::unavailable(IMAGE_LAZY_LOADING, NO_HTML_PAGES);
    }
    if candidates == 0 {
        return MetricResult::measured(
            IMAGE_LAZY_LOADING,
            MetricValue::Count(0),
            100.0,
            "no below-the-fold images",
        );
    }
    MetricResult::measured(
        IMAGE_LAZY_LOADING,
        MetricValue::ratio(lazy as f64 / candidates as f64),
        percent(lazy, candidates),
        format!("{lazy}/{candidates} below-the-fold images load lazily"),
    )
}

pub fn dom_size(ctx: &EvalContext<'_>) -> MetricResult {
    average_per_page(ctx, DOM_SIZE, "elements", (800.0, 3000.0), |dom| dom.element_count)
}

fn average_per_page(
    ctx: &EvalContext<'_>,
    id: MetricId,
    what: &str,
    (good, bad): (f64, f64),
    count: impl Fn(&crate::model::page::DomFacts) -> usize,
) -> MetricResult {
    let counts: Vec<f64> = ctx.html_pages().map(|(_, dom)| count(dom) as f64).collect();
    let Some(avg) = mean(&counts) else {
        return MetricResult::unavailable(id, NO_HTML_PAGES);
    };
    let avg = (avg * 100.0).round() / 100.0;
    MetricResult::measured(
        id,
        MetricValue::Number(avg),
        linear(avg, good, bad),
        format!("{avg} {what} per page on average"),
    )
}

// ── Lab data ────────────────────────────────────────────────

pub fn largest_contentful_paint(ctx: &EvalContext<'_>) -> MetricResult {
    lab_metric(ctx, LARGEST_CONTENTFUL_PAINT, |v| v.lcp_ms, |ms| {
        (linear(ms, 2500.0, 6000.0), format!("LCP {ms:.0} ms"))
    })
}

pub fn cumulative_layout_shift(ctx: &EvalContext<'_>) -> MetricResult {
    lab_metric(ctx, CUMULATIVE_LAYOUT_SHIFT, |v| v.cls, |cls| {
        (linear(cls, 0.1, 0.5), format!("CLS {cls:.3}"))
    })
}

pub fn total_blocking_time(ctx: &EvalContext<'_>) -> MetricResult {
    lab_metric(ctx, TOTAL_BLOCKING_TIME, |v| v.tbt_ms, |ms| {
        (linear(ms, 200.0, 1200.0), format!("TBT {ms:.0} ms"))
    })
}

pub fn first_contentful_paint(ctx: &EvalContext<'_>) -> MetricResult {
    lab_metric(ctx, FIRST_CONTENTFUL_PAINT, |v| v.fcp_ms, |ms| {
        (linear(ms, 1800.0, 4500.0), format!("FCP {ms:.0} ms"))
    })
}

pub fn lighthouse_performance(ctx: &EvalContext<'_>) -> MetricResult {
    lab_metric(ctx, LIGHTHOUSE_PERFORMANCE, |v| v.performance_score, |score| {
        (score, format!("Lighthouse performance score {score:.0}"))
    })
}

fn lab_metric(
    ctx: &EvalContext<'_>,
    id: MetricId,
    field: impl Fn(&LabVitals) -> Option<f64>,
    score: impl Fn(f64) -> (f64, String),
) -> MetricResult {
    let outcome = &ctx.providers.vitals;
    let Some(vitals) = outcome.signals() else {
        let reason = outcome.reason().unwrap_or("lab data unavailable");
        return MetricResult::unavailable(id, reason);
    };
    match field(vitals) {
        Some(value) if value.is_finite() => {
            let (subscore, detail) = score(value);
            MetricResult::measured(id, MetricValue::Number(value), subscore, detail)
        }
        _ => MetricResult::unavailable(id, "not reported by PageSpeed"),
    }
}
