//! Strengths, weak areas and a ranked list of fixes.

use crate::metrics::catalogue::MetricDescriptor;
use crate::model::metric::{Category, MetricId, MetricResult};
use crate::scoring::aggregate::Aggregate;
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Categories scoring at or above this are strengths.
pub const STRENGTH_THRESHOLD: f64 = 85.0;
/// Categories scoring below this are weak areas.
pub const WEAK_THRESHOLD: f64 = 60.0;
/// Length of the priority fix list.
pub const MAX_PRIORITY_FIXES: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryNote {
    pub category: Category,
    pub score: f64,
}

/// A metric worth fixing, ranked by how much score it costs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityFix {
    pub id: MetricId,
    pub name: &'static str,
    pub category: Category,
    pub subscore: f64,
    /// `weight × (100 − subscore)`.
    pub impact: f64,
    pub detail: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Summary {
    pub strengths: Vec<CategoryNote>,
    pub weak_areas: Vec<CategoryNote>,
    pub priority_fixes: Vec<PriorityFix>,
}

pub fn summarize(
    catalogue: &[MetricDescriptor],
    aggregate: &Aggregate,
    results: &BTreeMap<MetricId, MetricResult>,
) -> Summary {
    let scored: Vec<CategoryNote> = aggregate
        .categories
        .values()
        .filter_map(|c| {
            c.score.map(|score| CategoryNote {
                category: c.category,
                score,
            })
        })
        .collect();

    let mut strengths: Vec<CategoryNote> = scored
        .iter()
        .filter(|n| n.score >= STRENGTH_THRESHOLD)
        .cloned()
        .collect();
    strengths.sort_by(|a, b| by_score(b, a));

    let mut weak_areas: Vec<CategoryNote> = scored
        .into_iter()
        .filter(|n| n.score < WEAK_THRESHOLD)
        .collect();
    weak_areas.sort_by(by_score);

    let mut fixes: Vec<PriorityFix> = catalogue
        .iter()
        .filter_map(|d| {
            let result = results.get(&d.id)?;
            let subscore = result.subscore()?;
            let impact = d.weight * (100.0 - subscore);
            (impact > 0.0).then(|| PriorityFix {
                id: d.id,
                name: d.name,
                category: d.category,
                subscore,
                impact: (impact * 100.0).round() / 100.0,
                detail: result.detail().to_string(),
            })
        })
        .collect();
    fixes.sort_by(|a, b| {
        b.impact
            .partial_cmp(&a.impact)
            .unwrap_or(Ordering::Equal)
            .then(a.id.cmp(&b.id))
    });
    fixes.truncate(MAX_PRIORITY_FIXES);

    Summary {
        strengths,
        weak_areas,
        priority_fixes: fixes,
    }
}

fn by_score(a: &CategoryNote, b: &CategoryNote) -> Ordering {
    a.score
        .partial_cmp(&b.score)
        .unwrap_or(Ordering::Equal)
        .then(a.category.cmp(&b.category))
}
