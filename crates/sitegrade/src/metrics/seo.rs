//! On-page SEO metrics (201–213).

use crate::crawl::urls::is_seo_friendly;
use crate::metrics::context::EvalContext;
use crate::metrics::{page_share, percent, NO_HTML_PAGES};
use crate::model::metric::{MetricId, MetricResult, MetricValue};
use crate::model::page::DomFacts;
use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;
use url::Url;

const TITLE_TAGS: MetricId = MetricId(201);
const TITLE_LENGTH: MetricId = MetricId(202);
const DUPLICATE_TITLES: MetricId = MetricId(203);
const META_DESCRIPTIONS: MetricId = MetricId(204);
const META_DESCRIPTION_LENGTH: MetricId = MetricId(205);
const DUPLICATE_META_DESCRIPTIONS: MetricId = MetricId(206);
const SINGLE_H1: MetricId = MetricId(207);
const HEADING_HIERARCHY: MetricId = MetricId(208);
const STRUCTURED_DATA: MetricId = MetricId(209);
const OPEN_GRAPH: MetricId = MetricId(210);
const TWITTER_CARDS: MetricId = MetricId(211);
const SEO_FRIENDLY_URLS: MetricId = MetricId(212);
const HREFLANG_CONSISTENCY: MetricId = MetricId(213);

const TITLE_CHARS: std::ops::RangeInclusive<usize> = 10..=60;
const DESCRIPTION_CHARS: std::ops::RangeInclusive<usize> = 50..=160;
const OPEN_GRAPH_CORE: [&str; 3] = ["og:title", "og:description", "og:image"];

pub fn title_tags(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, TITLE_TAGS, "have a title", |_, dom| dom.title.is_some())
}

pub fn title_length(ctx: &EvalContext<'_>) -> MetricResult {
    length_share(
        ctx,
        TITLE_LENGTH,
        "titles",
        |dom| dom.title.as_deref(),
        TITLE_CHARS,
    )
}

pub fn duplicate_titles(ctx: &EvalContext<'_>) -> MetricResult {
    duplicates(ctx, DUPLICATE_TITLES, "titles", |dom| dom.title.as_deref())
}

pub fn meta_descriptions(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, META_DESCRIPTIONS, "have a meta description", |_, dom| {
        dom.meta_description.is_some()
    })
}

pub fn meta_description_length(ctx: &EvalContext<'_>) -> MetricResult {
    length_share(
        ctx,
        META_DESCRIPTION_LENGTH,
        "meta descriptions",
        |dom| dom.meta_description.as_deref(),
        DESCRIPTION_CHARS,
    )
}

pub fn duplicate_meta_descriptions(ctx: &EvalContext<'_>) -> MetricResult {
    duplicates(ctx, DUPLICATE_META_DESCRIPTIONS, "meta descriptions", |dom| {
        dom.meta_description.as_deref()
    })
}

pub fn single_h1(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, SINGLE_H1, "have exactly one h1", |_, dom| dom.h1_count() == 1)
}

pub fn heading_hierarchy(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, HEADING_HIERARCHY, "have an ordered heading outline", |_, dom| {
        ordered_outline(dom)
    })
}

/// Headings exist and never skip a level on the way down (h2 → h4).
fn ordered_outline(dom: &DomFacts) -> bool {
    if dom.headings.is_empty() {
        return false;
    }
    let mut previous = 0u8;
    for heading in &dom.headings {
        if previous > 0 && heading.level > previous + 1 {
            return false;
        }
        previous = heading.level;
    }
    true
}

pub fn structured_data(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, STRUCTURED_DATA, "carry valid JSON-LD", |_, dom| {
        dom.json_ld_valid > 0
    })
}

pub fn open_graph(ctx: &EvalContext<'_>) -> MetricResult {
    let mut present = 0;
    let mut pages = 0;
    for (_, dom) in ctx.html_pages() {
        pages += 1;
        present += OPEN_GRAPH_CORE
            .iter()
            .filter(|key| dom.open_graph.contains_key(**key))
            .count();
    }
    if pages == 0 {
        return MetricResult::unavailable(OPEN_GRAPH, NO_HTML_PAGES);
    }
    let possible = pages * OPEN_GRAPH_CORE.len();
    MetricResult::measured(
        OPEN_GRAPH,
        MetricValue::ratio(present as f64 / possible as f64),
        percent(present, possible),
        format!("{present}/{possible} core Open Graph tags present"),
    )
}

pub fn twitter_cards(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, TWITTER_CARDS, "declare a Twitter card", |_, dom| {
        dom.twitter_card.is_some()
    })
}

pub fn seo_friendly_urls(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, SEO_FRIENDLY_URLS, "have readable URLs", |page, _| {
        Url::parse(&page.final_url)
            .map(|u| is_seo_friendly(&u))
            .unwrap_or(false)
    })
}

pub fn hreflang_consistency(ctx: &EvalContext<'_>) -> MetricResult {
    let mut html_pages = 0;
    let mut annotated = 0;
    let mut consistent = 0;
    for (page, dom) in ctx.html_pages() {
        html_pages += 1;
        if dom.hreflang.is_empty() {
            continue;
        }
        annotated += 1;
        let self_referenced = dom
            .hreflang
            .iter()
            .any(|h| h.href == page.final_url || h.href == page.url);
        if self_referenced && dom.hreflang.iter().all(|h| valid_hreflang(&h.lang)) {
            consistent += 1;
        }
    }

    if html_pages == 0 {
        return MetricResult::unavailable(HREFLANG_CONSISTENCY, NO_HTML_PAGES);
    }
    if annotated == 0 {
        return MetricResult::measured(
            HREFLANG_CONSISTENCY,
            MetricValue::Text("not_used".into()),
            100.0,
            "hreflang not used",
        );
    }
    MetricResult::measured(
        HREFLANG_CONSISTENCY,
        MetricValue::ratio(consistent as f64 / annotated as f64),
        percent(consistent, annotated),
        format!("{consistent}/{annotated} annotated pages self-reference with valid codes"),
    )
}

fn valid_hreflang(code: &str) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let code = code.trim().to_ascii_lowercase();
    if code == "x-default" {
        return true;
    }
    RE.get_or_init(|| {
        Regex::new(r"^[a-z]{2,3}(-[a-z0-9]{2,4})?$").expect("hreflang regex is valid")
    })
    .is_match(&code)
}

// ── Shared shapes ───────────────────────────────────────────

fn length_share(
    ctx: &EvalContext<'_>,
    id: MetricId,
    what: &str,
    field: impl Fn(&DomFacts) -> Option<&str>,
    range: std::ops::RangeInclusive<usize>,
) -> MetricResult {
    let mut html_pages = 0;
    let lengths: Vec<usize> = ctx
        .html_pages()
        .inspect(|_| html_pages += 1)
        .filter_map(|(_, dom)| field(dom))
        .map(|text| text.chars().count())
        .collect();

    if html_pages == 0 {
        return MetricResult::unavailable(id, NO_HTML_PAGES);
    }
    if lengths.is_empty() {
        return MetricResult::unavailable(id, format!("no pages have {what}"));
    }
    let within = lengths.iter().filter(|n| range.contains(n)).count();
    MetricResult::measured(
        id,
        MetricValue::ratio(within as f64 / lengths.len() as f64),
        percent(within, lengths.len()),
        format!(
            "{within}/{} {what} are {}-{} characters",
            lengths.len(),
            range.start(),
            range.end()
        ),
    )
}

fn duplicates(
    ctx: &EvalContext<'_>,
    id: MetricId,
    what: &str,
    field: impl Fn(&DomFacts) -> Option<&str>,
) -> MetricResult {
    let mut html_pages = 0;
    let mut seen: HashMap<String, usize> = HashMap::new();
    for (_, dom) in ctx.html_pages() {
        html_pages += 1;
        if let Some(text) = field(dom) {
            *seen.entry(text.trim().to_lowercase()).or_default() += 1;
        }
    }

    if html_pages == 0 {
        return MetricResult::unavailable(id, NO_HTML_PAGES);
    }
    let total: usize = seen.values().sum();
    if total == 0 {
        return MetricResult::unavailable(id, format!("no pages have {what}"));
    }
    let duplicated: usize = seen.values().filter(|n| **n > 1).sum();
    let subscore = 100.0 - percent(duplicated, total);
    let detail = format!("{duplicated}/{total} pages share {what} with another page");

    if ctx.sampled() {
        MetricResult::estimated(id, MetricValue::count(duplicated), subscore, format!("{detail} (sampled)"))
    } else {
        MetricResult::measured(id, MetricValue::count(duplicated), subscore, detail)
    }
}
