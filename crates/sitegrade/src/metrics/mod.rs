//! Metric catalogue and evaluators.
//!
//! Each evaluator is a pure function of an [`EvalContext`] returning exactly
//! one [`MetricResult`]. Evaluators never look at each other's output and
//! degrade to `unavailable` when their inputs are missing.

pub mod accessibility;
pub mod authority;
pub mod catalogue;
pub mod content;
pub mod context;
pub mod crawlability;
pub mod performance;
pub mod registry;
pub mod security;
pub mod seo;

pub use catalogue::{catalogue_export, descriptor, CatalogueExport, MetricDescriptor, CATALOGUE, CATALOGUE_VERSION};
pub use context::EvalContext;
pub use registry::evaluate_all;

use crate::model::metric::{MetricId, MetricResult, MetricValue};
use crate::model::page::{DomFacts, PageFact};

pub(crate) const NO_HTML_PAGES: &str = "no HTML pages were fetched successfully";
pub(crate) const NO_RESPONSES: &str = "no page returned an HTTP response";

/// `part / whole` as a percentage; 0 for an empty whole.
pub(crate) fn percent(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 * 100.0 / whole as f64
    }
}

/// 100 when `value` is at `good` or better, 0 at `bad` or worse, linear in
/// between. Works whether lower or higher is better.
pub(crate) fn linear(value: f64, good: f64, bad: f64) -> f64 {
    if good == bad {
        return if value == good { 100.0 } else { 0.0 };
    }
    let t = (value - good) / (bad - good);
    (100.0 * (1.0 - t)).clamp(0.0, 100.0)
}

pub(crate) fn mean(values: &[f64]) -> Option<f64> {
    (!values.is_empty()).then(|| values.iter().sum::<f64>() / values.len() as f64)
}

pub(crate) fn median(values: &mut [f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    Some(if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    })
}

/// Share of successful HTML pages satisfying `pred`, as a measured ratio.
pub(crate) fn page_share(
    ctx: &EvalContext<'_>,
    id: MetricId,
    what: &str,
    pred: impl Fn(&PageFact, &DomFacts) -> bool,
) -> MetricResult {
    let mut total = 0;
    let mut passing = 0;
    for (page, dom) in ctx.html_pages() {
        total += 1;
        if pred(page, dom) {
            passing += 1;
        }
    }
    if total == 0 {
        return MetricResult::unavailable(id, NO_HTML_PAGES);
    }
    MetricResult::measured(
        id,
        MetricValue::ratio(passing as f64 / total as f64),
        percent(passing, total),
        format!("{passing}/{total} pages {what}"),
    )
}

/// Share of responding pages satisfying `pred` over their headers.
pub(crate) fn header_share(
    ctx: &EvalContext<'_>,
    id: MetricId,
    what: &str,
    pred: impl Fn(&PageFact) -> bool,
) -> MetricResult {
    let pages: Vec<&PageFact> = ctx.ok_pages().collect();
    if pages.is_empty() {
        return MetricResult::unavailable(id, NO_RESPONSES);
    }
    let passing = pages.iter().filter(|p| pred(p)).count();
    MetricResult::measured(
        id,
        MetricValue::ratio(passing as f64 / pages.len() as f64),
        percent(passing, pages.len()),
        format!("{passing}/{} pages {what}", pages.len()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_both_directions() {
        assert_eq!(linear(100.0, 200.0, 2000.0), 100.0);
        assert_eq!(linear(1100.0, 200.0, 2000.0), 50.0);
        assert_eq!(linear(5000.0, 200.0, 2000.0), 0.0);
        // higher is better
        assert_eq!(linear(0.25, 0.15, 0.03), 100.0);
        assert!((linear(0.09, 0.15, 0.03) - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_median_and_mean() {
        assert_eq!(median(&mut [3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(median(&mut [4.0, 1.0, 2.0, 3.0]), Some(2.5));
        assert_eq!(median(&mut []), None);
        assert_eq!(mean(&[1.0, 2.0, 3.0]), Some(2.0));
        assert_eq!(percent(1, 0), 0.0);
    }
}
