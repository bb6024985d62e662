//! Page-level facts produced by the fetcher and parser.

use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Why a page has no usable response, or why its response is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorReason {
    Timeout,
    DnsFailure,
    TlsFailure,
    ConnectionFailed,
    /// The server answered with a 4xx/5xx status.
    HttpError(u16),
    TooManyRedirects,
}

impl ErrorReason {
    /// True when no HTTP response was received at all.
    pub fn is_transport(&self) -> bool {
        !matches!(self, ErrorReason::HttpError(_))
    }
}

impl fmt::Display for ErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorReason::Timeout => f.write_str("timeout"),
            ErrorReason::DnsFailure => f.write_str("dns_failure"),
            ErrorReason::TlsFailure => f.write_str("tls_failure"),
            ErrorReason::ConnectionFailed => f.write_str("connection_failed"),
            ErrorReason::HttpError(code) => write!(f, "http_error:{code}"),
            ErrorReason::TooManyRedirects => f.write_str("too_many_redirects"),
        }
    }
}

impl Serialize for ErrorReason {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A heading element (`h1`..`h6`).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Heading {
    pub level: u8,
    pub text: String,
}

/// An anchor with a resolvable http(s) target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Link {
    /// Absolute, normalized URL.
    pub href: String,
    pub text: String,
    pub nofollow: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Image {
    pub src: String,
    /// `None` when the attribute is absent; `Some("")` marks a decorative image.
    pub alt: Option<String>,
    pub lazy: bool,
}

/// A `<link rel="alternate" hreflang>` entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hreflang {
    pub lang: String,
    pub href: String,
}

/// Structural facts extracted from an HTML document.
///
/// Missing elements are `None` / empty rather than errors.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DomFacts {
    pub title: Option<String>,
    pub meta_description: Option<String>,
    pub meta_robots: Option<String>,
    pub canonical: Option<String>,
    pub viewport: Option<String>,
    pub lang: Option<String>,
    pub headings: Vec<Heading>,
    pub links: Vec<Link>,
    pub images: Vec<Image>,
    pub script_count: usize,
    pub external_script_count: usize,
    pub stylesheet_count: usize,
    /// Stylesheets and synchronous scripts inside `<head>`.
    pub render_blocking_count: usize,
    pub open_graph: BTreeMap<String, String>,
    pub twitter_card: Option<String>,
    pub json_ld_blocks: usize,
    pub json_ld_valid: usize,
    pub hreflang: Vec<Hreflang>,
    /// `http://` sub-resources (scripts, styles, images, frames, media).
    pub insecure_resources: Vec<String>,
    /// Landmark names: `main`, `nav`, `header`, `footer`, plus ARIA roles.
    pub landmarks: BTreeSet<String>,
    pub form_controls: usize,
    pub labelled_controls: usize,
    pub text_length: usize,
    pub word_count: usize,
    pub html_length: usize,
    pub has_favicon: bool,
    pub element_count: usize,
    /// FNV-1a hash over normalized visible text.
    pub fingerprint: u64,
}

impl DomFacts {
    pub fn h1_count(&self) -> usize {
        self.headings.iter().filter(|h| h.level == 1).count()
    }

    /// True when `meta robots` contains `noindex`.
    pub fn is_noindex(&self) -> bool {
        self.meta_robots
            .as_deref()
            .map(|r| r.to_ascii_lowercase().contains("noindex"))
            .unwrap_or(false)
    }
}

/// Outcome of a HEAD check on an outbound link.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LinkCheck {
    pub url: String,
    pub status: Option<u16>,
    pub error: Option<ErrorReason>,
}

impl LinkCheck {
    pub fn is_broken(&self) -> bool {
        self.error.is_some() || self.status.map(|s| s >= 400).unwrap_or(true)
    }
}

/// One fetched page. Never mutated after creation.
#[derive(Debug, Clone, Serialize)]
pub struct PageFact {
    /// Requested URL, normalized.
    pub url: String,
    /// URL after following redirects.
    pub final_url: String,
    /// Hops from the seed.
    pub depth: u32,
    /// Status of the final response; `None` on transport failure.
    pub status: Option<u16>,
    /// Response headers with lowercase names, in received order.
    pub headers: Vec<(String, String)>,
    /// Bytes of body read.
    pub byte_size: usize,
    /// Time until the final response's headers arrived.
    pub elapsed_ms: u64,
    pub redirects: u32,
    /// `Content-Encoding` offered when compression was requested.
    pub compression: Option<String>,
    pub dom: Option<DomFacts>,
    pub error: Option<ErrorReason>,
    /// Sampled outbound link checks.
    pub link_checks: Vec<LinkCheck>,
    /// True when more off-site links existed than were checked.
    pub link_checks_truncated: bool,
}

impl PageFact {
    /// A page for which no response was received.
    pub fn transport_error(url: &str, depth: u32, reason: ErrorReason, elapsed_ms: u64) -> Self {
        Self {
            url: url.to_string(),
            final_url: url.to_string(),
            depth,
            status: None,
            headers: Vec::new(),
            byte_size: 0,
            elapsed_ms,
            redirects: 0,
            compression: None,
            dom: None,
            error: Some(reason),
            link_checks: Vec::new(),
            link_checks_truncated: false,
        }
    }

    /// First value of a header (name is matched case-insensitively).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn header_all<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a str> + 'n
    where
        'a: 'n,
    {
        self.headers
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Got a response with a non-error status.
    pub fn is_ok(&self) -> bool {
        self.error.is_none() && self.status.map(|s| s < 400).unwrap_or(false)
    }

    /// Got any HTTP response (including 4xx/5xx).
    pub fn has_response(&self) -> bool {
        self.status.is_some()
    }

    pub fn is_html(&self) -> bool {
        self.dom.is_some()
    }

    pub fn is_https(&self) -> bool {
        self.final_url.starts_with("https://")
    }
}
