//! The immutable outcome of one audit and its serialized report.

use crate::config::Target;
use crate::model::metric::{Category, Confidence, MetricId, MetricResult, MetricValue};
use crate::model::page::PageFact;
use crate::model::site::SiteFacts;
use crate::providers::ProviderFacts;
use crate::scoring::{CategoryScore, GradeOutcome, Summary};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

/// Why an audit stopped early.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Cancelled,
    Deadline,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Completion {
    Complete,
    Partial { reason: StopReason },
}

impl Completion {
    pub fn is_partial(&self) -> bool {
        matches!(self, Completion::Partial { .. })
    }
}

/// Headline numbers of a seed-only competitor audit.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompetitorSummary {
    pub url: String,
    pub overall_score: Option<f64>,
    pub grade: String,
    pub overall_coverage: f64,
    /// Set when the competitor could not be audited at all.
    pub error: Option<String>,
}

/// Everything one audit produced. Built once, never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct AuditResult {
    pub audit_id: Uuid,
    pub target: Target,
    pub pages: Vec<PageFact>,
    pub site: SiteFacts,
    pub providers: ProviderFacts,
    pub metrics: BTreeMap<MetricId, MetricResult>,
    pub categories: BTreeMap<Category, CategoryScore>,
    pub overall_score: Option<f64>,
    pub overall_coverage: f64,
    pub outcome: GradeOutcome,
    pub completion: Completion,
    /// The seed page produced an HTTP response.
    pub seed_reachable: bool,
    pub competitors: Vec<CompetitorSummary>,
    pub summary: Summary,
    pub generated_at: DateTime<Utc>,
    pub catalogue_version: &'static str,
}

impl AuditResult {
    pub fn is_ungradeable(&self) -> bool {
        matches!(self.outcome, GradeOutcome::Ungradeable)
    }

    pub fn ok_pages(&self) -> usize {
        self.pages.iter().filter(|p| p.is_ok()).count()
    }

    /// The external, serialization-ready view.
    pub fn report(&self) -> AuditReport {
        let metrics = self
            .metrics
            .iter()
            .map(|(id, r)| {
                (
                    *id,
                    MetricReport {
                        value: r.value().clone(),
                        subscore: r.subscore(),
                        confidence: r.confidence(),
                        detail: r.detail().to_string(),
                    },
                )
            })
            .collect();

        let categories = self
            .categories
            .iter()
            .map(|(cat, c)| {
                (
                    *cat,
                    CategoryReport {
                        score: c.score,
                        coverage: c.coverage,
                    },
                )
            })
            .collect();

        let ok = self.ok_pages();
        AuditReport {
            audit_id: self.audit_id,
            target: self.target.url.to_string(),
            metrics,
            categories,
            overall_score: self.overall_score,
            grade: self.outcome.label(),
            classification: self.outcome.grade().map(|g| g.classification()),
            overall_coverage: self.overall_coverage,
            provisional: self.outcome.is_provisional(),
            completion: self.completion,
            pages: PageCounts {
                total: self.pages.len(),
                ok,
                errors: self.pages.len() - ok,
            },
            competitors: self.competitors.clone(),
            summary: self.summary.clone(),
            generated_at: self.generated_at,
            catalogue_version: self.catalogue_version,
        }
    }

    pub fn competitor_summary(&self) -> CompetitorSummary {
        CompetitorSummary {
            url: self.target.url.to_string(),
            overall_score: self.overall_score,
            grade: self.outcome.label().to_string(),
            overall_coverage: self.overall_coverage,
            error: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricReport {
    pub value: MetricValue,
    pub subscore: Option<f64>,
    pub confidence: Confidence,
    pub detail: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryReport {
    pub score: Option<f64>,
    pub coverage: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageCounts {
    pub total: usize,
    pub ok: usize,
    pub errors: usize,
}

/// Stable JSON shape handed to collaborators.
#[derive(Debug, Clone, Serialize)]
pub struct AuditReport {
    pub audit_id: Uuid,
    pub target: String,
    pub metrics: BTreeMap<MetricId, MetricReport>,
    pub categories: BTreeMap<Category, CategoryReport>,
    pub overall_score: Option<f64>,
    /// Letter grade, or `"ungradeable"`.
    pub grade: &'static str,
    pub classification: Option<&'static str>,
    pub overall_coverage: f64,
    pub provisional: bool,
    pub completion: Completion,
    pub pages: PageCounts,
    pub competitors: Vec<CompetitorSummary>,
    pub summary: Summary,
    pub generated_at: DateTime<Utc>,
    pub catalogue_version: &'static str,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AuditConfig;
    use crate::scoring::{Grade, GradeOutcome};
    use assert_json_diff::assert_json_include;
    use serde_json::json;

    fn result(outcome: GradeOutcome, metrics: Vec<MetricResult>) -> AuditResult {
        AuditResult {
            audit_id: Uuid::nil(),
            target: Target::new("https://example.com", AuditConfig::default()).unwrap(),
            pages: Vec::new(),
            site: SiteFacts::default(),
            providers: ProviderFacts::default(),
            metrics: metrics.into_iter().map(|m| (m.id(), m)).collect(),
            categories: BTreeMap::new(),
            overall_score: None,
            overall_coverage: 0.0,
            outcome,
            completion: Completion::Complete,
            seed_reachable: false,
            competitors: Vec::new(),
            summary: Summary::default(),
            generated_at: DateTime::<Utc>::UNIX_EPOCH,
            catalogue_version: "test",
        }
    }

    #[test]
    fn test_ungradeable_report_shape() {
        let r = result(
            GradeOutcome::Ungradeable,
            vec![MetricResult::unavailable(MetricId(309), "PageSpeed Insights not configured")],
        );
        let report = serde_json::to_value(r.report()).unwrap();
        assert_json_include!(
            actual: report,
            expected: json!({
                "target": "https://example.com/",
                "grade": "ungradeable",
                "classification": null,
                "overall_score": null,
                "provisional": false,
                "completion": { "state": "complete" },
                "pages": { "total": 0, "ok": 0, "errors": 0 },
                "metrics": {
                    "309": {
                        "value": null,
                        "subscore": null,
                        "confidence": "unavailable",
                        "detail": "PageSpeed Insights not configured"
                    }
                }
            })
        );
    }

    #[test]
    fn test_graded_report_and_competitor_summary() {
        let mut r = result(
            GradeOutcome::Graded {
                grade: Grade::B,
                provisional: true,
            },
            vec![MetricResult::measured(MetricId(401), MetricValue::ratio(1.0), 100.0, "1/1 pages")],
        );
        r.overall_score = Some(74.5);
        r.overall_coverage = 0.2;
        r.completion = Completion::Partial {
            reason: StopReason::Deadline,
        };

        let report = serde_json::to_value(r.report()).unwrap();
        assert_json_include!(
            actual: report,
            expected: json!({
                "grade": "B",
                "classification": "Good",
                "provisional": true,
                "overall_score": 74.5,
                "completion": { "state": "partial", "reason": "deadline" },
                "metrics": { "401": { "subscore": 100.0, "confidence": "measured" } }
            })
        );

        let summary = r.competitor_summary();
        assert_eq!(summary.grade, "B");
        assert_eq!(summary.overall_score, Some(74.5));
        assert!(r.completion.is_partial());
    }
}
