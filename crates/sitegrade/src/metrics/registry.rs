//! Runs the catalogue's evaluators in parallel.

use crate::metrics::catalogue::MetricDescriptor;
use crate::metrics::context::EvalContext;
use crate::model::metric::{MetricId, MetricResult};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use tracing::error;

/// Evaluate every descriptor on the rayon pool.
///
/// CPU-bound; call from a blocking context. The result holds exactly one
/// entry per descriptor, keyed by id, independent of completion order. A
/// panicking evaluator yields an `unavailable` result instead of tearing
/// down the audit.
pub fn evaluate_all(
    catalogue: &[MetricDescriptor],
    ctx: &EvalContext<'_>,
) -> BTreeMap<MetricId, MetricResult> {
    catalogue
        .par_iter()
        .map(|d| (d.id, evaluate_one(d, ctx)))
        .collect()
}

fn evaluate_one(descriptor: &MetricDescriptor, ctx: &EvalContext<'_>) -> MetricResult {
    match catch_unwind(AssertUnwindSafe(|| (descriptor.evaluator)(ctx))) {
        Ok(result) => result.with_id(descriptor.id),
        Err(_) => {
            error!("evaluator for metric {} ({}) panicked", descriptor.id, descriptor.name);
            MetricResult::unavailable(descriptor.id, "evaluator failed")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::catalogue::CATALOGUE;
    use crate::metrics::context::testing::{html_page, with_ctx};
    use crate::model::metric::{Category, Confidence, MetricValue};

    fn exploding(_ctx: &EvalContext<'_>) -> MetricResult {
        panic!("boom")
    }

    fn wrong_id(_ctx: &EvalContext<'_>) -> MetricResult {
        MetricResult::measured(MetricId(1), MetricValue::Flag(true), 100.0, "ok")
    }

    #[test]
    fn test_every_descriptor_gets_one_result() {
        let pages = vec![html_page(
            "https://example.com/",
            "<html lang=en><title>Home page title</title><h1>Hi</h1></html>",
            &[],
        )];
        let results = with_ctx("https://example.com/", &pages, |ctx| evaluate_all(CATALOGUE, ctx));
        assert_eq!(results.len(), CATALOGUE.len());
        for (id, r) in &results {
            assert_eq!(*id, r.id());
            assert_eq!(r.subscore().is_some(), r.confidence() != Confidence::Unavailable);
        }
    }

    #[test]
    fn test_no_pages_means_nothing_measured_from_pages() {
        let results = with_ctx("https://example.com/", &[], |ctx| evaluate_all(CATALOGUE, ctx));
        assert!(results.values().all(|r| !r.is_available()));
    }

    #[test]
    fn test_panic_and_wrong_id_are_contained() {
        let catalogue = [
            MetricDescriptor {
                id: MetricId(900),
                name: "Exploding",
                category: Category::Content,
                weight: 1.0,
                provider: None,
                evaluator: exploding,
            },
            MetricDescriptor {
                id: MetricId(901),
                name: "Wrong id",
                category: Category::Content,
                weight: 1.0,
                provider: None,
                evaluator: wrong_id,
            },
        ];
        let results = with_ctx("https://example.com/", &[], |ctx| evaluate_all(&catalogue, ctx));
        assert!(!results[&MetricId(900)].is_available());
        assert_eq!(results[&MetricId(901)].id(), MetricId(901));
    }

    #[test]
    fn test_deterministic() {
        let pages = vec![html_page(
            "https://example.com/",
            "<title>Same input</title><p>words words words</p>",
            &[("x-frame-options", "DENY")],
        )];
        let a = with_ctx("https://example.com/", &pages, |ctx| {
            serde_json::to_string(&evaluate_all(CATALOGUE, ctx)).unwrap()
        });
        let b = with_ctx("https://example.com/", &pages, |ctx| {
            serde_json::to_string(&evaluate_all(CATALOGUE, ctx)).unwrap()
        });
        assert_eq!(a, b);
    }
}
