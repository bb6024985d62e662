//! XML sitemap counting.

/// What a sitemap document contained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SitemapSummary {
    pub url_count: usize,
    /// `<sitemapindex>` rather than `<urlset>`.
    pub index: bool,
}

/// Count `<loc>` entries in a `urlset` or `sitemapindex` document.
///
/// Returns `None` when the document is not a sitemap (wrong root element or
/// malformed XML before the root was seen).
pub fn parse_sitemap(xml: &str) -> Option<SitemapSummary> {
    let mut reader = quick_xml::Reader::from_str(xml);
    reader.config_mut().trim_text(true);
    let mut buf = Vec::new();

    let mut root: Option<bool> = None;
    let mut in_loc = false;
    let mut url_count = 0;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(quick_xml::events::Event::Start(ref e)) => {
                let name = e.local_name();
                let name = name.as_ref();
                if root.is_none() {
                    root = match name {
                        b"urlset" => Some(false),
                        b"sitemapindex" => Some(true),
                        _ => return None,
                    };
                } else if name == b"loc" {
                    in_loc = true;
                }
            }
            Ok(quick_xml::events::Event::Empty(ref e)) if root.is_none() => {
                let name = e.local_name();
                root = match name.as_ref() {
                    b"urlset" => Some(false),
                    b"sitemapindex" => Some(true),
                    _ => return None,
                };
            }
            Ok(quick_xml::events::Event::Text(ref e)) => {
                if in_loc && !e.is_empty() {
                    url_count += 1;
                }
            }
            Ok(quick_xml::events::Event::CData(ref e)) => {
                if in_loc && !e.is_empty() {
                    url_count += 1;
                }
            }
            Ok(quick_xml::events::Event::End(ref e)) => {
                if e.local_name().as_ref() == b"loc" {
                    in_loc = false;
                }
            }
            Ok(quick_xml::events::Event::Eof) => break,
            Err(_) => break,
            _ => {}
        }
        buf.clear();
    }

    root.map(|index| SitemapSummary { url_count, index })
}
