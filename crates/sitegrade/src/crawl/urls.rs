//! URL normalization, link resolution and same-site checks.

use regex::Regex;
use std::net::IpAddr;
use std::sync::OnceLock;
use url::Url;

/// Public suffixes with two labels that we recognize when computing the
/// registrable domain.
const SECOND_LEVEL_SUFFIXES: &[&str] = &[
    "co.uk", "org.uk", "ac.uk", "gov.uk", "me.uk", "net.uk", "com.au", "net.au", "org.au",
    "edu.au", "gov.au", "co.nz", "org.nz", "co.jp", "ne.jp", "or.jp", "com.br", "net.br",
    "org.br", "co.in", "net.in", "org.in", "com.cn", "net.cn", "org.cn", "com.mx", "co.za",
    "com.sg", "com.tr", "com.ar", "co.kr", "com.hk", "com.tw",
];

/// Normalize a URL for dedup: fragment removed, empty path becomes `/`.
///
/// Scheme and host lowercasing and default-port removal are done by the
/// `url` parser itself.
pub fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);
    if url.path().is_empty() {
        url.set_path("/");
    }
    url.to_string()
}

/// Resolve an `href` against `base`, keeping only http(s) targets.
pub fn resolve_link(base: &Url, href: &str) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_ascii_lowercase();
    if ["mailto:", "tel:", "javascript:", "data:", "sms:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let mut url = base.join(href).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    url.set_fragment(None);
    Some(url)
}

/// Registrable domain of a host (`blog.example.co.uk` → `example.co.uk`).
///
/// IP addresses and single-label hosts are returned unchanged.
pub fn registrable_domain(host: &str) -> String {
    let host = host.trim_end_matches('.').to_ascii_lowercase();
    let bare = host.trim_start_matches('[').trim_end_matches(']');
    if bare.parse::<IpAddr>().is_ok() {
        return host;
    }

    let labels: Vec<&str> = host.split('.').filter(|l| !l.is_empty()).collect();
    if labels.len() <= 2 {
        return labels.join(".");
    }

    let last_two = labels[labels.len() - 2..].join(".");
    let keep = if SECOND_LEVEL_SUFFIXES.contains(&last_two.as_str()) {
        3
    } else {
        2
    };
    labels[labels.len() - keep..].join(".")
}

/// True when both URLs share a registrable domain. Ports and schemes are ignored.
pub fn same_site(a: &Url, b: &Url) -> bool {
    match (a.host_str(), b.host_str()) {
        (Some(ha), Some(hb)) => registrable_domain(ha) == registrable_domain(hb),
        _ => false,
    }
}

/// Path plus query, as used for robots.txt matching.
pub fn robots_path(url: &Url) -> String {
    match url.query() {
        Some(q) => format!("{}?{}", url.path(), q),
        None => url.path().to_string(),
    }
}

/// True for URLs that point at obvious non-page assets by extension.
pub fn is_asset(url: &Url) -> bool {
    const ASSET_EXTENSIONS: &[&str] = &[
        "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "avif", "bmp", "pdf", "zip", "gz",
        "tar", "rar", "7z", "dmg", "exe", "css", "js", "mjs", "json", "xml", "txt", "mp3",
        "mp4", "webm", "mov", "avi", "woff", "woff2", "ttf", "otf", "eot", "csv", "doc",
        "docx", "xls", "xlsx", "ppt", "pptx",
    ];
    let last = url.path().rsplit('/').next().unwrap_or("");
    match last.rsplit_once('.') {
        Some((_, ext)) => ASSET_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()),
        None => false,
    }
}

/// True when a URL path reads as clean words: lowercase, hyphen-separated,
/// short, without session ids or file extensions other than `.html`.
pub fn is_seo_friendly(url: &Url) -> bool {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^(/[a-z0-9]+(-[a-z0-9]+)*)*(/|\.html?)?$").expect("slug regex is valid")
    });

    let path = url.path();
    if path.len() > 100 || url.query().is_some() {
        return false;
    }
    if path.split('/').filter(|s| !s.is_empty()).count() > 5 {
        return false;
    }
    re.is_match(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(
            normalize_url(&url("HTTPS://Example.COM:443#top")),
            "https://example.com/"
        );
        assert_eq!(
            normalize_url(&url("http://example.com:80/a/b?x=1#frag")),
            "http://example.com/a/b?x=1"
        );
        assert_eq!(
            normalize_url(&url("http://example.com:8080/")),
            "http://example.com:8080/"
        );
    }

    #[test]
    fn test_resolve_link() {
        let base = url("https://example.com/blog/post");
        assert_eq!(
            resolve_link(&base, "../about#team").map(|u| u.to_string()),
            Some("https://example.com/about".to_string())
        );
        assert_eq!(
            resolve_link(&base, "//cdn.example.com/x.js").map(|u| u.to_string()),
            Some("https://cdn.example.com/x.js".to_string())
        );
        assert!(resolve_link(&base, "mailto:hi@example.com").is_none());
        assert!(resolve_link(&base, "tel:+123").is_none());
        assert!(resolve_link(&base, "JavaScript:void(0)").is_none());
        assert!(resolve_link(&base, "#section").is_none());
        assert!(resolve_link(&base, "ftp://example.com/file").is_none());
    }

    #[test]
    fn test_registrable_domain() {
        assert_eq!(registrable_domain("www.example.com"), "example.com");
        assert_eq!(registrable_domain("a.b.example.com"), "example.com");
        assert_eq!(registrable_domain("shop.example.co.uk"), "example.co.uk");
        assert_eq!(registrable_domain("localhost"), "localhost");
        assert_eq!(registrable_domain("127.0.0.1"), "127.0.0.1");
        assert_eq!(registrable_domain("Example.COM."), "example.com");
    }

    #[test]
    fn test_same_site() {
        assert!(same_site(
            &url("https://www.example.com/"),
            &url("http://blog.example.com:8443/x")
        ));
        assert!(!same_site(&url("https://example.com/"), &url("https://other.com/")));
        assert!(same_site(
            &url("http://127.0.0.1:4000/"),
            &url("http://127.0.0.1:4000/page")
        ));
        assert!(!same_site(&url("http://127.0.0.1/"), &url("http://127.0.0.2/")));
    }

    #[test]
    fn test_is_asset() {
        assert!(is_asset(&url("https://example.com/files/Report.PDF")));
        assert!(is_asset(&url("https://example.com/logo.svg?v=2")));
        assert!(!is_asset(&url("https://example.com/about")));
        assert!(!is_asset(&url("https://example.com/about.html")));
        assert!(!is_asset(&url("https://example.com/v1.2/")));
    }

    #[test]
    fn test_seo_friendly() {
        assert!(is_seo_friendly(&url("https://example.com/")));
        assert!(is_seo_friendly(&url("https://example.com/blog/my-first-post")));
        assert!(is_seo_friendly(&url("https://example.com/about.html")));
        assert!(!is_seo_friendly(&url("https://example.com/Blog/My_Post")));
        assert!(!is_seo_friendly(&url("https://example.com/page?id=42")));
        assert!(!is_seo_friendly(&url("https://example.com/a/b/c/d/e/f")));
    }
}
