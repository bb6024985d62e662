//! Transport and response-header security metrics (401–410).

use crate::metrics::context::EvalContext;
use crate::metrics::{header_share, percent, NO_HTML_PAGES, NO_RESPONSES};
use crate::model::metric::{MetricId, MetricResult, MetricValue};
use crate::model::page::PageFact;

const HTTPS: MetricId = MetricId(401);
const HSTS: MetricId = MetricId(402);
const CONTENT_SECURITY_POLICY: MetricId = MetricId(403);
const CLICKJACKING: MetricId = MetricId(404);
const MIME_SNIFFING: MetricId = MetricId(405);
const REFERRER_POLICY: MetricId = MetricId(406);
const PERMISSIONS_POLICY: MetricId = MetricId(407);
const MIXED_CONTENT: MetricId = MetricId(408);
const SERVER_BANNER: MetricId = MetricId(409);
const COOKIE_FLAGS: MetricId = MetricId(410);

/// Six months, the usual floor for HSTS preload.
const HSTS_MIN_MAX_AGE: u64 = 15_552_000;

pub fn https(ctx: &EvalContext<'_>) -> MetricResult {
    header_share(ctx, HTTPS, "are served over HTTPS", PageFact::is_https)
}

pub fn hsts(ctx: &EvalContext<'_>) -> MetricResult {
    let secure: Vec<_> = ctx.ok_pages().filter(|p| p.is_https()).collect();
    if secure.is_empty() {
        return MetricResult::unavailable(HSTS, "no HTTPS pages to check");
    }
    let credit: f64 = secure
        .iter()
        .map(|p| match p.header("strict-transport-security").and_then(hsts_max_age) {
            Some(age) if age >= HSTS_MIN_MAX_AGE => 1.0,
            Some(age) if age > 0 => 0.5,
            _ => 0.0,
        })
        .sum();
    MetricResult::measured(
        HSTS,
        MetricValue::ratio(credit / secure.len() as f64),
        credit * 100.0 / secure.len() as f64,
        format!("HSTS credit {credit}/{} HTTPS pages", secure.len()),
    )
}

fn hsts_max_age(value: &str) -> Option<u64> {
    value.split(';').find_map(|directive| {
        let (key, val) = directive.trim().split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("max-age")
            .then(|| val.trim().trim_matches('"').parse().ok())
            .flatten()
    })
}

pub fn content_security_policy(ctx: &EvalContext<'_>) -> MetricResult {
    let pages: Vec<_> = ctx.ok_pages().collect();
    if pages.is_empty() {
        return MetricResult::unavailable(CONTENT_SECURITY_POLICY, NO_RESPONSES);
    }
    let mut enforced = 0;
    let mut report_only = 0;
    for page in &pages {
        if page.header("content-security-policy").is_some() {
            enforced += 1;
        } else if page.header("content-security-policy-report-only").is_some() {
            report_only += 1;
        }
    }
    let credit = enforced as f64 + report_only as f64 * 0.5;
    MetricResult::measured(
        CONTENT_SECURITY_POLICY,
        MetricValue::ratio(credit / pages.len() as f64),
        credit * 100.0 / pages.len() as f64,
        format!(
            "{enforced} enforced, {report_only} report-only of {} pages",
            pages.len()
        ),
    )
}

pub fn clickjacking(ctx: &EvalContext<'_>) -> MetricResult {
    header_share(ctx, CLICKJACKING, "forbid cross-origin framing", |page| {
        let xfo = page
            .header("x-frame-options")
            .map(|v| {
                let v = v.trim().to_ascii_uppercase();
                v == "DENY" || v == "SAMEORIGIN"
            })
            .unwrap_or(false);
        let frame_ancestors = page
            .header("content-security-policy")
            .map(|v| v.to_ascii_lowercase().contains("frame-ancestors"))
            .unwrap_or(false);
        xfo || frame_ancestors
    })
}

pub fn mime_sniffing(ctx: &EvalContext<'_>) -> MetricResult {
    header_share(ctx, MIME_SNIFFING, "send nosniff", |page| {
        page.header("x-content-type-options")
            .map(|v| v.trim().eq_ignore_ascii_case("nosniff"))
            .unwrap_or(false)
    })
}

pub fn referrer_policy(ctx: &EvalContext<'_>) -> MetricResult {
    header_share(ctx, REFERRER_POLICY, "set a referrer policy", |page| {
        page.header("referrer-policy")
            .map(|v| {
                let v = v.trim().to_ascii_lowercase();
                !v.is_empty() && !v.contains("unsafe-url")
            })
            .unwrap_or(false)
    })
}

pub fn permissions_policy(ctx: &EvalContext<'_>) -> MetricResult {
    header_share(ctx, PERMISSIONS_POLICY, "set a permissions policy", |page| {
        page.header("permissions-policy").is_some() || page.header("feature-policy").is_some()
    })
}

pub fn mixed_content(ctx: &EvalContext<'_>) -> MetricResult {
    let mut html_pages = 0;
    let mut secure = 0;
    let mut clean = 0;
    let mut offenders = 0;
    for (page, dom) in ctx.html_pages() {
        html_pages += 1;
        if !page.is_https() {
            continue;
        }
        secure += 1;
        if dom.insecure_resources.is_empty() {
            clean += 1;
        } else {
            offenders += dom.insecure_resources.len();
        }
    }
    if html_pages == 0 {
        return MetricResult::unavailable(MIXED_CONTENT, NO_HTML_PAGES);
    }
    if secure == 0 {
        return MetricResult::unavailable(MIXED_CONTENT, "no HTTPS pages to check");
    }
    MetricResult::measured(
        MIXED_CONTENT,
        MetricValue::count(offenders),
        percent(clean, secure),
        format!("{clean}/{secure} HTTPS pages load only secure resources"),
    )
}

pub fn server_banner(ctx: &EvalContext<'_>) -> MetricResult {
    header_share(ctx, SERVER_BANNER, "hide server version details", |page| {
        let versioned_server = page
            .header("server")
            .map(|v| v.chars().any(|c| c.is_ascii_digit()))
            .unwrap_or(false);
        !versioned_server && page.header("x-powered-by").is_none()
    })
}

pub fn cookie_flags(ctx: &EvalContext<'_>) -> MetricResult {
    let pages: Vec<_> = ctx.ok_pages().collect();
    if pages.is_empty() {
        return MetricResult::unavailable(COOKIE_FLAGS, NO_RESPONSES);
    }
    let mut total = 0;
    let mut hardened = 0;
    for page in &pages {
        for cookie in page.header_all("set-cookie") {
            total += 1;
            if cookie_is_hardened(cookie, page.is_https()) {
                hardened += 1;
            }
        }
    }
    if total == 0 {
        return MetricResult::measured(COOKIE_FLAGS, MetricValue::Count(0), 100.0, "no cookies set");
    }
    MetricResult::measured(
        COOKIE_FLAGS,
        MetricValue::ratio(hardened as f64 / total as f64),
        percent(hardened, total),
        format!("{hardened}/{total} cookies set HttpOnly, SameSite and Secure"),
    )
}

fn cookie_is_hardened(cookie: &str, https: bool) -> bool {
    let attrs: Vec<String> = cookie
        .split(';')
        .skip(1)
        .map(|a| a.trim().to_ascii_lowercase())
        .collect();
    let has = |name: &str| attrs.iter().any(|a| a == name || a.starts_with(&format!("{name}=")));
    (!https || has("secure")) && has("httponly") && has("samesite")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::context::testing::{html_page, with_ctx};

    #[test]
    fn test_https_and_hsts() {
        let pages = vec![
            html_page(
                "https://example.com/",
                "<p>a</p>",
                &[("strict-transport-security", "max-age=31536000; includeSubDomains")],
            ),
            html_page("https://example.com/b", "<p>b</p>", &[("strict-transport-security", "max-age=300")]),
            html_page("http://example.com/c", "<p>c</p>", &[]),
        ];
        with_ctx("https://example.com/", &pages, |ctx| {
            assert_eq!(https(ctx).subscore(), Some(66.67));
            assert_eq!(hsts(ctx).subscore(), Some(75.0));
        });
    }

    #[test]
    fn test_hsts_unavailable_over_plain_http() {
        let pages = vec![html_page("http://example.com/", "<p>a</p>", &[])];
        with_ctx("http://example.com/", &pages, |ctx| {
            assert!(!hsts(ctx).is_available());
            assert!(!mixed_content(ctx).is_available());
            assert_eq!(https(ctx).subscore(), Some(0.0));
        });
    }

    #[test]
    fn test_framing_and_csp() {
        let pages = vec![
            html_page("https://example.com/", "", &[("x-frame-options", "sameorigin")]),
            html_page(
                "https://example.com/b",
                "",
                &[("content-security-policy", "default-src 'self'; frame-ancestors 'none'")],
            ),
            html_page(
                "https://example.com/c",
                "",
                &[("content-security-policy-report-only", "default-src 'self'")],
            ),
            html_page("https://example.com/d", "", &[("x-frame-options", "ALLOW-FROM https://x.test")]),
        ];
        with_ctx("https://example.com/", &pages, |ctx| {
            assert_eq!(clickjacking(ctx).subscore(), Some(50.0));
            // 1 enforced + 0.5 report-only over 4
            assert_eq!(content_security_policy(ctx).subscore(), Some(37.5));
        });
    }

    #[test]
    fn test_simple_headers() {
        let pages = vec![
            html_page(
                "https://example.com/",
                "",
                &[
                    ("x-content-type-options", "nosniff"),
                    ("referrer-policy", "strict-origin-when-cross-origin"),
                    ("permissions-policy", "camera=()"),
                    ("server", "nginx"),
                ],
            ),
            html_page(
                "https://example.com/b",
                "",
                &[("referrer-policy", "unsafe-url"), ("server", "Apache/2.4.1"), ("x-powered-by", "PHP")],
            ),
        ];
        with_ctx("https://example.com/", &pages, |ctx| {
            assert_eq!(mime_sniffing(ctx).subscore(), Some(50.0));
            assert_eq!(referrer_policy(ctx).subscore(), Some(50.0));
            assert_eq!(permissions_policy(ctx).subscore(), Some(50.0));
            assert_eq!(server_banner(ctx).subscore(), Some(50.0));
        });
    }

    #[test]
    fn test_mixed_content() {
        let pages = vec![
            html_page("https://example.com/", r#"<img src="http://cdn.test/a.png">"#, &[]),
            html_page("https://example.com/b", r#"<img src="/b.png">"#, &[]),
        ];
        with_ctx("https://example.com/", &pages, |ctx| {
            let r = mixed_content(ctx);
            assert_eq!(r.value(), &MetricValue::Count(1));
            assert_eq!(r.subscore(), Some(50.0));
        });
    }

    #[test]
    fn test_cookie_flags() {
        let pages = vec![html_page(
            "https://example.com/",
            "",
            &[
                ("set-cookie", "sid=1; Path=/; Secure; HttpOnly; SameSite=Lax"),
                ("set-cookie", "pref=dark; Path=/; HttpOnly"),
            ],
        )];
        with_ctx("https://example.com/", &pages, |ctx| {
            assert_eq!(cookie_flags(ctx).subscore(), Some(50.0));
        });

        let none = vec![html_page("https://example.com/", "", &[])];
        with_ctx("https://example.com/", &none, |ctx| {
            assert_eq!(cookie_flags(ctx).subscore(), Some(100.0));
        });
    }

    #[test]
    fn test_max_age_parsing() {
        assert_eq!(hsts_max_age("max-age=63072000; preload"), Some(63_072_000));
        assert_eq!(hsts_max_age("includeSubDomains; Max-Age=\"10\""), Some(10));
        assert_eq!(hsts_max_age("preload"), None);
    }
}
