//! Scoring policy: category weights and grade thresholds.

use crate::error::EngineError;
use crate::model::metric::Category;
use serde::{Deserialize, Serialize};

/// Relative weight of each category in the overall score.
///
/// Weights need not sum to 1; the aggregator renormalizes over the
/// categories that have a score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryWeights {
    pub crawlability: f64,
    pub on_page_seo: f64,
    pub performance: f64,
    pub security: f64,
    pub accessibility: f64,
    pub content: f64,
    pub authority: f64,
}

impl Default for CategoryWeights {
    fn default() -> Self {
        Self {
            crawlability: 0.15,
            on_page_seo: 0.20,
            performance: 0.20,
            security: 0.20,
            accessibility: 0.10,
            content: 0.10,
            authority: 0.05,
        }
    }
}

impl CategoryWeights {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Crawlability => self.crawlability,
            Category::OnPageSeo => self.on_page_seo,
            Category::Performance => self.performance,
            Category::Security => self.security,
            Category::Accessibility => self.accessibility,
            Category::Content => self.content,
            Category::Authority => self.authority,
        }
    }

    pub fn set(&mut self, category: Category, weight: f64) {
        let slot = match category {
            Category::Crawlability => &mut self.crawlability,
            Category::OnPageSeo => &mut self.on_page_seo,
            Category::Performance => &mut self.performance,
            Category::Security => &mut self.security,
            Category::Accessibility => &mut self.accessibility,
            Category::Content => &mut self.content,
            Category::Authority => &mut self.authority,
        };
        *slot = weight;
    }

    fn validate(&self) -> Result<(), EngineError> {
        for category in Category::ALL {
            let w = self.get(category);
            if !w.is_finite() || w < 0.0 {
                return Err(EngineError::InvalidConfig(format!(
                    "category weight for {category} must be a non-negative number, got {w}"
                )));
            }
        }
        Ok(())
    }
}

/// Score thresholds for each letter grade plus the provisional cut-off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradePolicy {
    pub a_plus: f64,
    pub a: f64,
    pub b: f64,
    pub c: f64,
    /// Overall coverage below this marks the grade provisional.
    pub provisional_below: f64,
}

impl Default for GradePolicy {
    fn default() -> Self {
        Self {
            a_plus: 90.0,
            a: 80.0,
            b: 70.0,
            c: 60.0,
            provisional_below: 0.30,
        }
    }
}

impl GradePolicy {
    /// Thresholds must be strictly descending within [0, 100].
    pub fn validate(&self) -> Result<(), EngineError> {
        let steps = [self.a_plus, self.a, self.b, self.c];
        if steps.iter().any(|t| !t.is_finite() || *t < 0.0 || *t > 100.0) {
            return Err(EngineError::InvalidConfig(
                "grade thresholds must lie within [0, 100]".into(),
            ));
        }
        if !steps.windows(2).all(|pair| pair[0] > pair[1]) {
            return Err(EngineError::InvalidConfig(format!(
                "grade thresholds must be strictly descending, got {steps:?}"
            )));
        }
        if !(0.0..=1.0).contains(&self.provisional_below) {
            return Err(EngineError::InvalidConfig(format!(
                "provisional_below must lie within [0, 1], got {}",
                self.provisional_below
            )));
        }
        Ok(())
    }
}

/// Everything the aggregator and grader are configured with.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub category_weights: CategoryWeights,
    pub grade: GradePolicy,
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), EngineError> {
        self.category_weights.validate()?;
        self.grade.validate()
    }
}
