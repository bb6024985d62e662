//! Letter grades from an overall score and its coverage.

use crate::scoring::policy::GradePolicy;
use serde::{Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Grade {
    APlus,
    A,
    B,
    C,
    D,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::APlus => "A+",
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
        }
    }

    /// Narrative classification shown next to the letter.
    pub fn classification(&self) -> &'static str {
        match self {
            Grade::APlus => "Enterprise-Ready",
            Grade::A => "Excellent",
            Grade::B => "Good",
            Grade::C => "Needs Improvement",
            Grade::D => "Critical",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Result of grading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum GradeOutcome {
    Graded {
        grade: Grade,
        /// Coverage was below the policy's provisional cut-off.
        provisional: bool,
    },
    /// No signal to grade: coverage 0 or no overall score.
    Ungradeable,
}

impl GradeOutcome {
    pub fn grade(&self) -> Option<Grade> {
        match self {
            GradeOutcome::Graded { grade, .. } => Some(*grade),
            GradeOutcome::Ungradeable => None,
        }
    }

    pub fn is_provisional(&self) -> bool {
        matches!(self, GradeOutcome::Graded { provisional: true, .. })
    }

    /// `"A+"`..`"D"` or `"ungradeable"`.
    pub fn label(&self) -> &'static str {
        match self {
            GradeOutcome::Graded { grade, .. } => grade.as_str(),
            GradeOutcome::Ungradeable => "ungradeable",
        }
    }
}

/// Map an overall score and coverage to a grade.
pub fn grade(score: Option<f64>, coverage: f64, policy: &GradePolicy) -> GradeOutcome {
    let Some(score) = score else {
        return GradeOutcome::Ungradeable;
    };
    if coverage <= 0.0 {
        return GradeOutcome::Ungradeable;
    }

    let grade = if score >= policy.a_plus {
        Grade::APlus
    } else if score >= policy.a {
        Grade::A
    } else if score >= policy.b {
        Grade::B
    } else if score >= policy.c {
        Grade::C
    } else {
        Grade::D
    };

    GradeOutcome::Graded {
        grade,
        provisional: coverage < policy.provisional_below,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_threshold_boundaries() {
        let policy = GradePolicy::default();
        let g = |s: f64| grade(Some(s), 1.0, &policy).grade();
        assert_eq!(g(100.0), Some(Grade::APlus));
        assert_eq!(g(90.0), Some(Grade::APlus));
        assert_eq!(g(89.99), Some(Grade::A));
        assert_eq!(g(80.0), Some(Grade::A));
        assert_eq!(g(70.0), Some(Grade::B));
        assert_eq!(g(60.0), Some(Grade::C));
        assert_eq!(g(59.99), Some(Grade::D));
        assert_eq!(g(0.0), Some(Grade::D));
    }

    #[test]
    fn test_provisional_below_cutoff() {
        let policy = GradePolicy::default();
        let outcome = grade(Some(85.0), 0.2, &policy);
        assert_eq!(
            outcome,
            GradeOutcome::Graded {
                grade: Grade::A,
                provisional: true
            }
        );
        assert!(!grade(Some(85.0), 0.3, &policy).is_provisional());
    }

    #[test]
    fn test_ungradeable() {
        let policy = GradePolicy::default();
        assert_eq!(grade(None, 0.5, &policy), GradeOutcome::Ungradeable);
        assert_eq!(grade(Some(70.0), 0.0, &policy), GradeOutcome::Ungradeable);
        assert_eq!(GradeOutcome::Ungradeable.label(), "ungradeable");
    }

    #[test]
    fn test_classifications() {
        assert_eq!(Grade::APlus.classification(), "Enterprise-Ready");
        assert_eq!(Grade::C.classification(), "Needs Improvement");
        assert_eq!(
            serde_json::to_value(grade(Some(91.0), 1.0, &GradePolicy::default())).unwrap(),
            serde_json::json!({"state": "graded", "grade": "A+", "provisional": false})
        );
    }

    #[test]
    fn test_custom_thresholds() {
        let policy = GradePolicy {
            a_plus: 95.0,
            a: 85.0,
            b: 75.0,
            c: 50.0,
            provisional_below: 0.5,
        };
        assert_eq!(grade(Some(92.0), 1.0, &policy).grade(), Some(Grade::A));
        assert_eq!(grade(Some(55.0), 1.0, &policy).grade(), Some(Grade::C));
    }
}
