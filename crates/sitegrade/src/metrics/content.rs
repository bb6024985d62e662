//! Content quality metrics (601–604).

use crate::metrics::context::EvalContext;
use crate::metrics::{linear, mean, page_share, percent, NO_HTML_PAGES};
use crate::model::metric::{MetricId, MetricResult, MetricValue};
use std::collections::HashMap;

const THIN_CONTENT: MetricId = MetricId(601);
const TEXT_TO_HTML_RATIO: MetricId = MetricId(602);
const DUPLICATE_CONTENT: MetricId = MetricId(603);
const FAVICON: MetricId = MetricId(604);

const MIN_WORDS: usize = 150;
/// Pages shorter than this are too small to fingerprint meaningfully.
const MIN_FINGERPRINT_WORDS: usize = 20;

pub fn thin_content(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, THIN_CONTENT, "have at least 150 words", |_, dom| {
        dom.word_count >= MIN_WORDS
    })
}

pub fn text_to_html_ratio(ctx: &EvalContext<'_>) -> MetricResult {
    let ratios: Vec<f64> = ctx
        .html_pages()
        .filter(|(_, dom)| dom.html_length > 0)
        .map(|(_, dom)| dom.text_length as f64 / dom.html_length as f64)
        .collect();
    let Some(avg) = mean(&ratios) else {
        return MetricResult::unavailable(TEXT_TO_HTML_RATIO, NO_HTML_PAGES);
    };
    MetricResult::measured(
        TEXT_TO_HTML_RATIO,
        MetricValue::ratio(avg),
        linear(avg, 0.15, 0.03),
        format!("average text-to-HTML ratio {:.1}%", avg * 100.0),
    )
}

pub fn duplicate_content(ctx: &EvalContext<'_>) -> MetricResult {
    let mut html_pages = 0;
    let mut by_fingerprint: HashMap<u64, usize> = HashMap::new();
    for (_, dom) in ctx.html_pages() {
        html_pages += 1;
        if dom.word_count >= MIN_FINGERPRINT_WORDS {
            *by_fingerprint.entry(dom.fingerprint).or_default() += 1;
        }
    }
    if html_pages == 0 {
        return MetricResult::unavailable(DUPLICATE_CONTENT, NO_HTML_PAGES);
    }
    let compared: usize = by_fingerprint.values().sum();
    if compared == 0 {
        return MetricResult::unavailable(DUPLICATE_CONTENT, "no page has enough text to compare");
    }
    let duplicated: usize = by_fingerprint.values().filter(|n| **n > 1).sum();
    let subscore = 100.0 - percent(duplicated, compared);
    let detail = format!("{duplicated}/{compared} pages duplicate another page's text");
    if ctx.sampled() {
        MetricResult::estimated(DUPLICATE_CONTENT, MetricValue::count(duplicated), subscore, format!("{detail} (sampled)"))
    } else {
        MetricResult::measured(DUPLICATE_CONTENT, MetricValue::count(duplicated), subscore, detail)
    }
}

pub fn favicon(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, FAVICON, "link a favicon", |_, dom| dom.has_favicon)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::context::testing::{html_page, target};
    use crate::model::metric::Confidence;
    use crate::model::site::SiteFacts;
    use crate::providers::ProviderFacts;

    fn words(n: usize, word: &str) -> String {
        format!("<p>{}</p>", vec![word; n].join(" "))
    }

    #[test]
    fn test_thin_and_duplicate() {
        let pages = vec![
            html_page("https://example.com/", &words(200, "alpha"), &[]),
            html_page("https://example.com/copy", &words(200, "alpha"), &[]),
            html_page("https://example.com/other", &words(40, "beta"), &[]),
            html_page("https://example.com/tiny", "<p>hello</p>", &[]),
        ];
        let target = target("https://example.com/");
        let providers = ProviderFacts::default();
        let mut site = SiteFacts::default();

        let ctx = EvalContext::new(&target, &pages, &site, &providers);
        assert_eq!(thin_content(&ctx).subscore(), Some(50.0));
        let dup = duplicate_content(&ctx);
        assert_eq!(dup.value(), &MetricValue::Count(2));
        assert_eq!(dup.subscore(), Some(33.33));
        assert_eq!(dup.confidence(), Confidence::Measured);

        site.crawl.budget_exhausted = true;
        let ctx = EvalContext::new(&target, &pages, &site, &providers);
        assert_eq!(duplicate_content(&ctx).confidence(), Confidence::Estimated);
    }

    #[test]
    fn test_text_ratio_and_favicon() {
        let pages = vec![html_page(
            "https://example.com/",
            r#"<html><head><link rel="icon" href="/favicon.ico"></head><body><p>short</p></body></html>"#,
            &[],
        )];
        let target = target("https://example.com/");
        let site = SiteFacts::default();
        let providers = ProviderFacts::default();
        let ctx = EvalContext::new(&target, &pages, &site, &providers);
        assert_eq!(favicon(&ctx).subscore(), Some(100.0));
        let ratio = text_to_html_ratio(&ctx);
        // 5 text chars in 88 bytes of markup
        let subscore = ratio.subscore().unwrap();
        assert!(subscore > 15.0 && subscore < 30.0, "{subscore}");
    }
}
