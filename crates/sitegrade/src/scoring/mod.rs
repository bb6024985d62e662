//! Aggregation, grading and summary of metric results.
//!
//! Everything here is a pure function of its inputs. Running it twice over
//! the same results serializes byte-identically.

pub mod aggregate;
pub mod grade;
pub mod policy;
pub mod summary;

pub use aggregate::{aggregate, Aggregate, CategoryScore};
pub use grade::{grade, Grade, GradeOutcome};
pub use policy::{CategoryWeights, GradePolicy, ScoringPolicy};
pub use summary::{summarize, PriorityFix, Summary};
