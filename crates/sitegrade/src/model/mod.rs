//! Data model shared by the pipeline stages.

pub mod metric;
pub mod page;
pub mod result;
pub mod site;

pub use metric::{Category, Confidence, MetricId, MetricResult, MetricValue, Provider};
pub use page::{DomFacts, ErrorReason, Heading, Hreflang, Image, Link, LinkCheck, PageFact};
pub use result::{AuditReport, AuditResult, CompetitorSummary, Completion, StopReason};
pub use site::{CrawlStats, RobotsProbe, SiteFacts, SitemapProbe};
