//! Static accessibility checks (501–506).

use crate::metrics::context::EvalContext;
use crate::metrics::{page_share, percent, NO_HTML_PAGES};
use crate::model::metric::{MetricId, MetricResult, MetricValue};
use crate::model::page::DomFacts;

const IMAGE_ALT_TEXT: MetricId = MetricId(501);
const DOCUMENT_LANGUAGE: MetricId = MetricId(502);
const LANDMARK_REGIONS: MetricId = MetricId(503);
const FORM_LABELS: MetricId = MetricId(504);
const DESCRIPTIVE_LINK_TEXT: MetricId = MetricId(505);
const MOBILE_VIEWPORT: MetricId = MetricId(506);

const GENERIC_LINK_TEXT: &[&str] = &[
    "",
    "click here",
    "here",
    "read more",
    "more",
    "link",
    "learn more",
];

pub fn image_alt_text(ctx: &EvalContext<'_>) -> MetricResult {
    counted_share(ctx, IMAGE_ALT_TEXT, "images have alt text", "no images", |dom| {
        let with_alt = dom.images.iter().filter(|i| i.alt.is_some()).count();
        (with_alt, dom.images.len())
    })
}

pub fn document_language(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, DOCUMENT_LANGUAGE, "declare a document language", |_, dom| {
        dom.lang.is_some()
    })
}

pub fn landmark_regions(ctx: &EvalContext<'_>) -> MetricResult {
    let mut pages = 0;
    let mut credit = 0.0;
    for (_, dom) in ctx.html_pages() {
        pages += 1;
        if dom.landmarks.contains("main") {
            credit += 1.0;
        } else if !dom.landmarks.is_empty() {
            credit += 0.5;
        }
    }
    if pages == 0 {
        return MetricResult::unavailable(LANDMARK_REGIONS, NO_HTML_PAGES);
    }
    MetricResult::measured(
        LANDMARK_REGIONS,
        MetricValue::ratio(credit / pages as f64),
        credit * 100.0 / pages as f64,
        format!("landmark credit {credit}/{pages} pages"),
    )
}

pub fn form_labels(ctx: &EvalContext<'_>) -> MetricResult {
    counted_share(ctx, FORM_LABELS, "form controls are labelled", "no form controls", |dom| {
        (dom.labelled_controls, dom.form_controls)
    })
}

pub fn descriptive_link_text(ctx: &EvalContext<'_>) -> MetricResult {
    counted_share(ctx, DESCRIPTIVE_LINK_TEXT, "links have descriptive text", "no links", |dom| {
        let descriptive = dom
            .links
            .iter()
            .filter(|l| !GENERIC_LINK_TEXT.contains(&l.text.trim().to_lowercase().as_str()))
            .count();
        (descriptive, dom.links.len())
    })
}

pub fn mobile_viewport(ctx: &EvalContext<'_>) -> MetricResult {
    page_share(ctx, MOBILE_VIEWPORT, "declare a responsive viewport", |_, dom| {
        dom.viewport
            .as_deref()
            .map(|v| {
                v.to_ascii_lowercase()
                    .replace(' ', "")
                    .contains("width=device-width")
            })
            .unwrap_or(false)
    })
}

/// Pools `(passing, total)` element counts across pages. Full marks when no
/// page has any element to check.
fn counted_share(
    ctx: &EvalContext<'_>,
    id: MetricId,
    what: &str,
    nothing: &str,
    count: impl Fn(&DomFacts) -> (usize, usize),
) -> MetricResult {
    let mut pages = 0;
    let mut passing = 0;
    let mut total = 0;
    for (_, dom) in ctx.html_pages() {
        pages += 1;
        let (p, t) = count(dom);
        passing += p;
        total += t;
    }
    if pages == 0 {
        return MetricResult::unavailable(id, NO_HTML_PAGES);
    }
    if total == 0 {
        return MetricResult::measured(id, MetricValue::Count(0), 100.0, nothing);
    }
    MetricResult::measured(
        id,
        MetricValue::ratio(passing as f64 / total as f64),
        percent(passing, total),
        format!("{passing}/{total} {what}"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::context::testing::{html_page, with_ctx};

    #[test]
    fn test_alt_text_counts_decorative_as_present() {
        let html = r#"<img src="/a.png" alt="Logo"><img src="/b.png" alt=""><img src="/c.png">
            <img src="/d.png">"#;
        let pages = vec![html_page("https://example.com/", html, &[])];
        with_ctx("https://example.com/", &pages, |ctx| {
            assert_eq!(image_alt_text(ctx).subscore(), Some(50.0));
        });
    }

    #[test]
    fn test_nothing_to_check_is_full_marks() {
        let pages = vec![html_page("https://example.com/", "<p>plain</p>", &[])];
        with_ctx("https://example.com/", &pages, |ctx| {
            assert_eq!(image_alt_text(ctx).subscore(), Some(100.0));
            assert_eq!(form_labels(ctx).subscore(), Some(100.0));
            assert_eq!(descriptive_link_text(ctx).detail(), "no links");
        });
    }

    #[test]
    fn test_landmarks_and_language() {
        let pages = vec![
            html_page("https://example.com/", r#"<html lang="en"><body><main>x</main></body></html>"#, &[]),
            html_page("https://example.com/b", "<nav>menu</nav>", &[]),
        ];
        with_ctx("https://example.com/", &pages, |ctx| {
            assert_eq!(landmark_regions(ctx).subscore(), Some(75.0));
            assert_eq!(document_language(ctx).subscore(), Some(50.0));
        });
    }

    #[test]
    fn test_links_and_viewport() {
        let html = r#"<html><head>
            <meta name="viewport" content="width = device-width, initial-scale=1">
            </head><body>
            <a href="/pricing">Pricing plans</a>
            <a href="/blog">Read more</a>
            <a href="/x">click here</a>
            <a href="/docs">Documentation</a>
            </body></html>"#;
        let pages = vec![
            html_page("https://example.com/", html, &[]),
            html_page("https://example.com/b", "<p>no viewport</p>", &[]),
        ];
        with_ctx("https://example.com/", &pages, |ctx| {
            assert_eq!(descriptive_link_text(ctx).subscore(), Some(50.0));
            assert_eq!(mobile_viewport(ctx).subscore(), Some(50.0));
        });
    }

    #[test]
    fn test_form_labels() {
        let html = r#"<form>
            <label for="email">Email</label><input id="email" type="email">
            <label>Name <input type="text"></label>
            <input type="text" placeholder="unlabelled">
            <input type="hidden" name="csrf">
            <textarea aria-label="Message"></textarea>
            </form>"#;
        let pages = vec![html_page("https://example.com/", html, &[])];
        with_ctx("https://example.com/", &pages, |ctx| {
            assert_eq!(form_labels(ctx).subscore(), Some(75.0));
        });
    }
}
