//! Site-level probe results gathered once per audit.

use crate::crawl::robots::RobotsRules;
use crate::model::page::ErrorReason;
use serde::Serialize;

/// What happened when `/robots.txt` was requested.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RobotsProbe {
    /// The audit stopped before the probe ran.
    #[default]
    NotChecked,
    Found { rules: RobotsRules },
    /// Answered with a non-success status.
    Missing { status: u16 },
    Unreachable { reason: ErrorReason },
}

impl RobotsProbe {
    pub fn rules(&self) -> Option<&RobotsRules> {
        match self {
            RobotsProbe::Found { rules } => Some(rules),
            _ => None,
        }
    }
}

/// What happened when the sitemap was requested.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SitemapProbe {
    #[default]
    NotChecked,
    Found {
        url: String,
        /// Number of `<loc>` entries.
        url_count: usize,
        /// True for a `<sitemapindex>` document.
        index: bool,
    },
    /// A document was served but is not a sitemap.
    Invalid { url: String },
    /// Every candidate answered with an error status.
    Missing,
    /// No candidate produced an HTTP response.
    Unreachable { reason: ErrorReason },
}

/// Counters kept by the crawl coordinator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    pub pages_fetched: usize,
    /// Distinct same-site URLs seen, fetched or not.
    pub urls_discovered: usize,
    pub blocked_by_robots: usize,
    pub skipped_by_budget: usize,
    pub skipped_by_depth: usize,
    /// The page budget stopped the crawl with work still queued.
    pub budget_exhausted: bool,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SiteFacts {
    pub robots: RobotsProbe,
    pub sitemap: SitemapProbe,
    pub crawl: CrawlStats,
}
