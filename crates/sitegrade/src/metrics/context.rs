//! Read-only inputs shared by every evaluator.

use crate::config::Target;
use crate::crawl::urls::{normalize_url, same_site};
use crate::model::page::{DomFacts, PageFact};
use crate::model::site::SiteFacts;
use crate::providers::ProviderFacts;
use url::Url;

/// Everything an evaluator may look at.
///
/// Shared across rayon workers, so it only holds shared references.
#[derive(Debug, Clone, Copy)]
pub struct EvalContext<'a> {
    pub target: &'a Target,
    pub pages: &'a [PageFact],
    pub site: &'a SiteFacts,
    pub providers: &'a ProviderFacts,
}

impl<'a> EvalContext<'a> {
    pub fn new(
        target: &'a Target,
        pages: &'a [PageFact],
        site: &'a SiteFacts,
        providers: &'a ProviderFacts,
    ) -> Self {
        Self {
            target,
            pages,
            site,
            providers,
        }
    }

    /// The page fetched for the target URL, found by URL match rather than
    /// position.
    pub fn seed(&self) -> Option<&'a PageFact> {
        let seed = normalize_url(&self.target.url);
        self.pages
            .iter()
            .find(|p| p.url == seed)
            .or_else(|| self.pages.iter().find(|p| p.depth == 0))
    }

    /// Pages that got any HTTP response.
    pub fn responded(&self) -> impl Iterator<Item = &'a PageFact> + 'a {
        self.pages.iter().filter(|p| p.has_response())
    }

    /// Pages with a non-error response.
    pub fn ok_pages(&self) -> impl Iterator<Item = &'a PageFact> + 'a {
        self.pages.iter().filter(|p| p.is_ok())
    }

    /// Successful HTML pages with their DOM facts.
    pub fn html_pages(&self) -> impl Iterator<Item = (&'a PageFact, &'a DomFacts)> + 'a {
        self.pages
            .iter()
            .filter(|p| p.is_ok())
            .filter_map(|p| p.dom.as_ref().map(|d| (p, d)))
    }

    /// The crawl stopped on the page budget, so site-wide checks only saw a
    /// sample.
    pub fn sampled(&self) -> bool {
        self.site.crawl.budget_exhausted
    }

    pub fn is_internal(&self, url: &Url) -> bool {
        same_site(url, &self.target.url)
    }
}

/// Builders for evaluator unit tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::config::AuditConfig;
    use crate::extraction::parse_html;

    pub fn target(url: &str) -> Target {
        Target::new(url, AuditConfig::default()).unwrap()
    }

    /// A 200 HTML page parsed from `html`.
    pub fn html_page(url: &str, html: &str, headers: &[(&str, &str)]) -> PageFact {
        let base = Url::parse(url).unwrap();
        let mut all: Vec<(String, String)> =
            vec![("content-type".into(), "text/html; charset=utf-8".into())];
        all.extend(headers.iter().map(|(k, v)| (k.to_string(), v.to_string())));
        PageFact {
            url: normalize_url(&base),
            final_url: normalize_url(&base),
            depth: if base.path() == "/" { 0 } else { 1 },
            status: Some(200),
            headers: all,
            byte_size: html.len(),
            elapsed_ms: 120,
            redirects: 0,
            compression: Some("gzip".into()),
            dom: Some(parse_html(html, &base)),
            error: None,
            link_checks: Vec::new(),
            link_checks_truncated: false,
        }
    }

    /// Run `f` over a context built from `pages`.
    pub fn with_ctx<R>(url: &str, pages: &[PageFact], f: impl FnOnce(&EvalContext<'_>) -> R) -> R {
        let target = target(url);
        let site = SiteFacts::default();
        let providers = ProviderFacts::default();
        let ctx = EvalContext::new(&target, pages, &site, &providers);
        f(&ctx)
    }
}
