//! Metric identity and evaluator output types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable integer identifier of a catalogue entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricId(pub u16);

impl fmt::Display for MetricId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scoring category a metric belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Crawlability,
    OnPageSeo,
    Performance,
    Security,
    Accessibility,
    Content,
    Authority,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::Crawlability,
        Category::OnPageSeo,
        Category::Performance,
        Category::Security,
        Category::Accessibility,
        Category::Content,
        Category::Authority,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Crawlability => "crawlability",
            Category::OnPageSeo => "on_page_seo",
            Category::Performance => "performance",
            Category::Security => "security",
            Category::Accessibility => "accessibility",
            Category::Content => "content",
            Category::Authority => "authority",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Crawlability => "Crawlability",
            Category::OnPageSeo => "On-Page SEO",
            Category::Performance => "Performance",
            Category::Security => "Security",
            Category::Accessibility => "Accessibility",
            Category::Content => "Content",
            Category::Authority => "Authority",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How much an evaluator trusts its own output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    Measured,
    Estimated,
    Unavailable,
}

/// External signal source a metric depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    PageSpeed,
    Authority,
}

/// Raw observed value of a metric.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Count(u64),
    Text(String),
    Flag(bool),
    Structured(serde_json::Value),
    None,
}

impl MetricValue {
    /// A ratio rounded to four decimals.
    pub fn ratio(value: f64) -> Self {
        MetricValue::Number((value * 10_000.0).round() / 10_000.0)
    }

    pub fn count(value: usize) -> Self {
        MetricValue::Count(value as u64)
    }
}

/// Output of one evaluator.
///
/// Fields are private so a sub-score exists exactly when the confidence is
/// not [`Confidence::Unavailable`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricResult {
    id: MetricId,
    value: MetricValue,
    subscore: Option<f64>,
    confidence: Confidence,
    detail: String,
}

impl MetricResult {
    pub fn measured(
        id: MetricId,
        value: MetricValue,
        subscore: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self::scored(id, value, subscore, Confidence::Measured, detail.into())
    }

    pub fn estimated(
        id: MetricId,
        value: MetricValue,
        subscore: f64,
        detail: impl Into<String>,
    ) -> Self {
        Self::scored(id, value, subscore, Confidence::Estimated, detail.into())
    }

    pub fn unavailable(id: MetricId, detail: impl Into<String>) -> Self {
        Self {
            id,
            value: MetricValue::None,
            subscore: None,
            confidence: Confidence::Unavailable,
            detail: detail.into(),
        }
    }

    fn scored(
        id: MetricId,
        value: MetricValue,
        subscore: f64,
        confidence: Confidence,
        detail: String,
    ) -> Self {
        Self {
            id,
            value,
            subscore: Some(clamp_subscore(subscore)),
            confidence,
            detail,
        }
    }

    /// Same result attributed to a different id.
    pub(crate) fn with_id(mut self, id: MetricId) -> Self {
        self.id = id;
        self
    }

    pub fn id(&self) -> MetricId {
        self.id
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    pub fn subscore(&self) -> Option<f64> {
        self.subscore
    }

    pub fn confidence(&self) -> Confidence {
        self.confidence
    }

    pub fn detail(&self) -> &str {
        &self.detail
    }

    pub fn is_available(&self) -> bool {
        self.confidence != Confidence::Unavailable
    }
}

fn clamp_subscore(value: f64) -> f64 {
    if value.is_finite() {
        let clamped = value.clamp(0.0, 100.0);
        (clamped * 100.0).round() / 100.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_has_no_subscore() {
        let r = MetricResult::unavailable(MetricId(309), "no PageSpeed key");
        assert_eq!(r.subscore(), None);
        assert_eq!(r.confidence(), Confidence::Unavailable);
        assert!(!r.is_available());
    }

    #[test]
    fn test_subscore_is_clamped() {
        let high = MetricResult::measured(MetricId(101), MetricValue::None, 140.0, "");
        let low = MetricResult::estimated(MetricId(101), MetricValue::None, -3.0, "");
        let nan = MetricResult::measured(MetricId(101), MetricValue::None, f64::NAN, "");
        assert_eq!(high.subscore(), Some(100.0));
        assert_eq!(low.subscore(), Some(0.0));
        assert_eq!(nan.subscore(), Some(0.0));
    }

    #[test]
    fn test_value_serialization() {
        assert_eq!(
            serde_json::to_value(MetricValue::ratio(2.0 / 3.0)).unwrap(),
            serde_json::json!(0.6667)
        );
        assert_eq!(
            serde_json::to_value(MetricValue::None).unwrap(),
            serde_json::Value::Null
        );
        assert_eq!(
            serde_json::to_value(Category::OnPageSeo).unwrap(),
            serde_json::json!("on_page_seo")
        );
        assert_eq!(serde_json::to_value(MetricId(203)).unwrap(), serde_json::json!(203));
    }
}
