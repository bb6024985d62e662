//! Weighted aggregation of metric sub-scores into category and overall scores.

use crate::metrics::catalogue::MetricDescriptor;
use crate::model::metric::{Category, MetricId, MetricResult};
use crate::scoring::policy::CategoryWeights;
use serde::Serialize;
use std::collections::BTreeMap;

/// Score of one category.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryScore {
    pub category: Category,
    /// Weighted mean of available sub-scores; `None` when nothing was available.
    pub score: Option<f64>,
    /// Available metrics / metrics in the category.
    pub coverage: f64,
    /// Configured category weight.
    pub weight: f64,
    pub available: usize,
    pub total: usize,
}

/// Category scores plus the overall score and coverage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub categories: BTreeMap<Category, CategoryScore>,
    pub overall_score: Option<f64>,
    pub overall_coverage: f64,
}

#[derive(Default)]
struct Accumulator {
    weighted_sum: f64,
    weight_sum: f64,
    available: usize,
    total: usize,
}

/// Aggregate `results` over the metrics listed in `catalogue`.
///
/// A catalogue metric with no entry in `results` counts as unavailable.
/// Unavailable metrics are excluded from both numerator and denominator;
/// a category with no available metric gets `score: None` and is left out
/// of the overall mean instead of counting as zero.
pub fn aggregate(
    catalogue: &[MetricDescriptor],
    results: &BTreeMap<MetricId, MetricResult>,
    weights: &CategoryWeights,
) -> Aggregate {
    let mut acc: BTreeMap<Category, Accumulator> = Category::ALL
        .iter()
        .map(|c| (*c, Accumulator::default()))
        .collect();

    for descriptor in catalogue {
        let entry = acc.entry(descriptor.category).or_default();
        entry.total += 1;

        let Some(subscore) = results.get(&descriptor.id).and_then(MetricResult::subscore) else {
            continue;
        };
        entry.available += 1;
        entry.weighted_sum += descriptor.weight * subscore;
        entry.weight_sum += descriptor.weight;
    }

    let mut categories = BTreeMap::new();
    let mut overall_num = 0.0;
    let mut overall_den = 0.0;
    let mut available_total = 0;
    let mut metric_total = 0;

    for (category, a) in acc {
        available_total += a.available;
        metric_total += a.total;

        let score = (a.available > 0 && a.weight_sum > 0.0)
            .then(|| round2(a.weighted_sum / a.weight_sum));
        let weight = weights.get(category);

        if let Some(s) = score {
            if weight > 0.0 {
                overall_num += weight * s;
                overall_den += weight;
            }
        }

        categories.insert(
            category,
            CategoryScore {
                category,
                score,
                coverage: ratio(a.available, a.total),
                weight,
                available: a.available,
                total: a.total,
            },
        );
    }

    let overall_score = (overall_den > 0.0).then(|| round2(overall_num / overall_den));

    Aggregate {
        categories,
        overall_score,
        overall_coverage: ratio(available_total, metric_total),
    }
}

fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        return 0.0;
    }
    let r = part as f64 / whole as f64;
    (r * 10_000.0).round() / 10_000.0
}

pub(crate) fn round2(value: f64) -> f64 {
    (value.clamp(0.0, 100.0) * 100.0).round() / 100.0
}
