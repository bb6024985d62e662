//! The static metric catalogue.
//!
//! Ids are stable across releases; bump [`CATALOGUE_VERSION`] whenever a
//! metric is added, removed or re-weighted.

use crate::metrics::context::EvalContext;
use crate::metrics::{accessibility, authority, content, crawlability, performance, security, seo};
use crate::model::metric::{Category, MetricId, MetricResult, Provider};
use serde::Serialize;

pub const CATALOGUE_VERSION: &str = "2026.1";

/// An evaluator: pure, total, deterministic.
pub type Evaluator = fn(&EvalContext<'_>) -> MetricResult;

/// One catalogue entry.
#[derive(Debug, Clone, Copy)]
pub struct MetricDescriptor {
    pub id: MetricId,
    pub name: &'static str,
    pub category: Category,
    /// Weight within the category.
    pub weight: f64,
    /// External provider the metric depends on, if any.
    pub provider: Option<Provider>,
    pub evaluator: Evaluator,
}

const fn metric(
    id: u16,
    name: &'static str,
    category: Category,
    weight: f64,
    evaluator: Evaluator,
) -> MetricDescriptor {
    MetricDescriptor {
        id: MetricId(id),
        name,
        category,
        weight,
        provider: None,
        evaluator,
    }
}

const fn provided(
    id: u16,
    name: &'static str,
    category: Category,
    weight: f64,
    provider: Provider,
    evaluator: Evaluator,
) -> MetricDescriptor {
    MetricDescriptor {
        id: MetricId(id),
        name,
        category,
        weight,
        provider: Some(provider),
        evaluator,
    }
}

use Category::{Accessibility, Authority, Content, Crawlability, OnPageSeo, Performance, Security};

/// Every metric, ordered by id.
pub static CATALOGUE: &[MetricDescriptor] = &[
    metric(101, "HTTP Status Health", Crawlability, 3.0, crawlability::http_status_health),
    metric(102, "Server Errors", Crawlability, 2.0, crawlability::server_errors),
    metric(103, "Broken Internal Links", Crawlability, 3.0, crawlability::broken_internal_links),
    metric(104, "Broken External Links", Crawlability, 1.0, crawlability::broken_external_links),
    metric(105, "Redirect Chains", Crawlability, 1.0, crawlability::redirect_chains),
    metric(106, "Robots.txt", Crawlability, 1.0, crawlability::robots_txt),
    metric(107, "XML Sitemap", Crawlability, 1.0, crawlability::xml_sitemap),
    metric(108, "Canonical Tags", Crawlability, 2.0, crawlability::canonical_tags),
    metric(109, "Indexable Pages", Crawlability, 2.0, crawlability::indexable_pages),
    metric(110, "Parameterized URLs", Crawlability, 1.0, crawlability::parameterized_urls),
    metric(201, "Title Tags", OnPageSeo, 3.0, seo::title_tags),
    metric(202, "Title Length", OnPageSeo, 1.0, seo::title_length),
    metric(203, "Duplicate Titles", OnPageSeo, 2.0, seo::duplicate_titles),
    metric(204, "Meta Descriptions", OnPageSeo, 2.0, seo::meta_descriptions),
    metric(205, "Meta Description Length", OnPageSeo, 1.0, seo::meta_description_length),
    metric(206, "Duplicate Meta Descriptions", OnPageSeo, 1.0, seo::duplicate_meta_descriptions),
    metric(207, "Single H1", OnPageSeo, 2.0, seo::single_h1),
    metric(208, "Heading Hierarchy", OnPageSeo, 1.0, seo::heading_hierarchy),
    metric(209, "Structured Data", OnPageSeo, 1.0, seo::structured_data),
    metric(210, "Open Graph Tags", OnPageSeo, 1.0, seo::open_graph),
    metric(211, "Twitter Cards", OnPageSeo, 0.5, seo::twitter_cards),
    metric(212, "SEO-Friendly URLs", OnPageSeo, 1.0, seo::seo_friendly_urls),
    metric(213, "Hreflang Consistency", OnPageSeo, 0.5, seo::hreflang_consistency),
    metric(301, "Server Response Time", Performance, 3.0, performance::server_response_time),
    metric(302, "Page Weight", Performance, 2.0, performance::page_weight),
    metric(303, "Text Compression", Performance, 2.0, performance::text_compression),
    metric(304, "Render-Blocking Resources", Performance, 2.0, performance::render_blocking),
    metric(305, "Requests Per Page", Performance, 1.0, performance::requests_per_page),
    metric(306, "Browser Caching", Performance, 1.0, performance::browser_caching),
    metric(307, "Image Lazy Loading", Performance, 0.5, performance::image_lazy_loading),
    metric(308, "DOM Size", Performance, 1.0, performance::dom_size),
    provided(309, "Largest Contentful Paint", Performance, 3.0, Provider::PageSpeed, performance::largest_contentful_paint),
    provided(310, "Cumulative Layout Shift", Performance, 2.0, Provider::PageSpeed, performance::cumulative_layout_shift),
    provided(311, "Total Blocking Time", Performance, 2.0, Provider::PageSpeed, performance::total_blocking_time),
    provided(312, "First Contentful Paint", Performance, 1.0, Provider::PageSpeed, performance::first_contentful_paint),
    provided(313, "Lighthouse Performance", Performance, 2.0, Provider::PageSpeed, performance::lighthouse_performance),
    metric(401, "HTTPS", Security, 4.0, security::https),
    metric(402, "HSTS", Security, 2.0, security::hsts),
    metric(403, "Content Security Policy", Security, 2.0, security::content_security_policy),
    metric(404, "Clickjacking Protection", Security, 1.0, security::clickjacking),
    metric(405, "MIME Sniffing Protection", Security, 1.0, security::mime_sniffing),
    metric(406, "Referrer Policy", Security, 1.0, security::referrer_policy),
    metric(407, "Permissions Policy", Security, 0.5, security::permissions_policy),
    metric(408, "Mixed Content", Security, 2.0, security::mixed_content),
    metric(409, "Server Banner Disclosure", Security, 0.5, security::server_banner),
    metric(410, "Cookie Flags", Security, 1.0, security::cookie_flags),
    metric(501, "Image Alt Text", Accessibility, 3.0, accessibility::image_alt_text),
    metric(502, "Document Language", Accessibility, 2.0, accessibility::document_language),
    metric(503, "Landmark Regions", Accessibility, 1.0, accessibility::landmark_regions),
    metric(504, "Form Labels", Accessibility, 1.0, accessibility::form_labels),
    metric(505, "Descriptive Link Text", Accessibility, 1.0, accessibility::descriptive_link_text),
    metric(506, "Mobile Viewport", Accessibility, 2.0, accessibility::mobile_viewport),
    metric(601, "Thin Content", Content, 2.0, content::thin_content),
    metric(602, "Text-to-HTML Ratio", Content, 1.0, content::text_to_html_ratio),
    metric(603, "Duplicate Content", Content, 2.0, content::duplicate_content),
    metric(604, "Favicon", Content, 0.5, content::favicon),
    provided(701, "Domain Authority", Authority, 3.0, Provider::Authority, authority::domain_authority),
    provided(702, "Referring Domains", Authority, 2.0, Provider::Authority, authority::referring_domains),
    provided(703, "Toxic Backlinks", Authority, 1.0, Provider::Authority, authority::toxic_backlinks),
];

/// Look up a descriptor by id.
pub fn descriptor(id: MetricId) -> Option<&'static MetricDescriptor> {
    CATALOGUE
        .binary_search_by_key(&id, |d| d.id)
        .ok()
        .map(|i| &CATALOGUE[i])
}

/// Serializable view of the catalogue.
#[derive(Debug, Clone, Serialize)]
pub struct CatalogueExport {
    pub version: &'static str,
    pub metrics: Vec<DescriptorExport>,
}

#[derive(Debug, Clone, Serialize)]
pub struct DescriptorExport {
    pub id: MetricId,
    pub name: &'static str,
    pub category: Category,
    pub weight: f64,
    pub provider: Option<Provider>,
}

pub fn catalogue_export() -> CatalogueExport {
    CatalogueExport {
        version: CATALOGUE_VERSION,
        metrics: CATALOGUE
            .iter()
            .map(|d| DescriptorExport {
                id: d.id,
                name: d.name,
                category: d.category,
                weight: d.weight,
                provider: d.provider,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_ids_unique_and_sorted() {
        let ids: Vec<MetricId> = CATALOGUE.iter().map(|d| d.id).collect();
        let unique: HashSet<MetricId> = ids.iter().copied().collect();
        assert_eq!(unique.len(), ids.len());
        assert!(ids.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(CATALOGUE.len(), 59);
    }

    #[test]
    fn test_every_category_has_metrics_with_positive_weight() {
        for category in Category::ALL {
            let in_cat: Vec<_> = CATALOGUE.iter().filter(|d| d.category == category).collect();
            assert!(!in_cat.is_empty(), "{category} has no metrics");
            assert!(in_cat.iter().all(|d| d.weight > 0.0));
        }
    }

    #[test]
    fn test_provider_gating() {
        let psi: Vec<u16> = CATALOGUE
            .iter()
            .filter(|d| d.provider == Some(Provider::PageSpeed))
            .map(|d| d.id.0)
            .collect();
        assert_eq!(psi, vec![309, 310, 311, 312, 313]);
        assert!(CATALOGUE
            .iter()
            .filter(|d| d.category == Category::Authority)
            .all(|d| d.provider == Some(Provider::Authority)));
    }

    #[test]
    fn test_lookup_and_export() {
        assert_eq!(descriptor(MetricId(401)).map(|d| d.name), Some("HTTPS"));
        assert!(descriptor(MetricId(999)).is_none());

        let export = serde_json::to_value(catalogue_export()).unwrap();
        assert_eq!(export["version"], CATALOGUE_VERSION);
        assert_eq!(export["metrics"][0]["id"], 101);
        assert_eq!(export["metrics"][0]["category"], "crawlability");
        assert_eq!(export["metrics"][0]["provider"], serde_json::Value::Null);
    }
}
