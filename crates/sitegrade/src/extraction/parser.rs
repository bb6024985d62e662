//! HTML → [`DomFacts`].
//!
//! Pure and synchronous. Malformed markup never fails: html5ever repairs
//! what it can and anything missing stays `None` or empty.
//!
//! `scraper::Html` is not `Send`, so async callers should go through
//! [`crate::extraction::parse_html_blocking`].

use crate::crawl::urls::{normalize_url, resolve_link};
use crate::model::page::{DomFacts, Heading, Hreflang, Image, Link};
use fnv::FnvHasher;
use scraper::{ElementRef, Html, Node, Selector};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::hash::Hasher;
use url::Url;

/// Elements whose text is never rendered.
const HIDDEN_CONTAINERS: &[&str] = &["script", "style", "noscript", "template", "head"];

/// Input types that need no label.
const UNLABELLED_INPUT_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

// ── Public API ──────────────────────────────────────────────

/// Extract structural facts from `html`, resolving relative URLs against `base`.
pub fn parse_html(html: &str, base: &Url) -> DomFacts {
    let doc = Html::parse_document(html);
    let text = visible_text(&doc);

    let mut facts = DomFacts {
        title: first_text(&doc, "title"),
        lang: select(&doc, "html")
            .first()
            .and_then(|e| e.value().attr("lang"))
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(String::from),
        headings: headings(&doc),
        links: links(&doc, base),
        images: images(&doc, base),
        html_length: html.len(),
        element_count: doc
            .root_element()
            .descendants()
            .filter(|n| n.value().is_element())
            .count(),
        text_length: text.chars().count(),
        word_count: text
            .split_whitespace()
            .filter(|w| w.chars().any(char::is_alphanumeric))
            .count(),
        fingerprint: fingerprint(&text),
        ..DomFacts::default()
    };

    read_meta(&doc, &mut facts);
    read_link_tags(&doc, base, &mut facts);
    read_scripts(&doc, &mut facts);
    facts.insecure_resources = insecure_resources(&doc, base);
    facts.landmarks = landmarks(&doc);
    let (controls, labelled) = form_controls(&doc);
    facts.form_controls = controls;
    facts.labelled_controls = labelled;

    facts
}

// ── Helpers ─────────────────────────────────────────────────

fn select<'a>(doc: &'a Html, css: &str) -> Vec<ElementRef<'a>> {
    match Selector::parse(css) {
        Ok(sel) => doc.select(&sel).collect(),
        Err(_) => Vec::new(),
    }
}

fn collapse(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn element_text(el: &ElementRef<'_>) -> String {
    collapse(&el.text().collect::<String>())
}

fn first_text(doc: &Html, css: &str) -> Option<String> {
    select(doc, css)
        .first()
        .map(element_text)
        .filter(|t| !t.is_empty())
}

fn attr_tokens(el: &ElementRef<'_>, name: &str) -> Vec<String> {
    el.value()
        .attr(name)
        .map(|v| v.split_whitespace().map(|t| t.to_ascii_lowercase()).collect())
        .unwrap_or_default()
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(String::from)
}

fn resolve(base: &Url, href: &str) -> Option<String> {
    resolve_link(base, href).map(|u| normalize_url(&u))
}

fn visible_text(doc: &Html) -> String {
    let mut out = String::new();
    for node in doc.root_element().descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|a| {
            a.value()
                .as_element()
                .map(|e| HIDDEN_CONTAINERS.contains(&e.name()))
                .unwrap_or(false)
        });
        if !hidden {
            out.push_str(text);
            out.push(' ');
        }
    }
    collapse(&out)
}

fn fingerprint(text: &str) -> u64 {
    let mut hasher = FnvHasher::default();
    hasher.write(text.to_lowercase().as_bytes());
    hasher.finish()
}

// ── Extractors ──────────────────────────────────────────────

fn read_meta(doc: &Html, facts: &mut DomFacts) {
    let mut open_graph = BTreeMap::new();

    for meta in select(doc, "meta") {
        let content = non_empty(meta.value().attr("content"));
        let key = meta
            .value()
            .attr("name")
            .or_else(|| meta.value().attr("property"))
            .map(|k| k.trim().to_ascii_lowercase());
        let (Some(key), Some(content)) = (key, content) else {
            continue;
        };

        match key.as_str() {
            "description" if facts.meta_description.is_none() => {
                facts.meta_description = Some(collapse(&content))
            }
            "robots" if facts.meta_robots.is_none() => facts.meta_robots = Some(content),
            "viewport" if facts.viewport.is_none() => facts.viewport = Some(content),
            "twitter:card" if facts.twitter_card.is_none() => facts.twitter_card = Some(content),
            k if k.starts_with("og:") => {
                open_graph.entry(k.to_string()).or_insert(content);
            }
            _ => {}
        }
    }

    facts.open_graph = open_graph;
}

fn read_link_tags(doc: &Html, base: &Url, facts: &mut DomFacts) {
    for link in select(doc, "link[rel]") {
        let rel = attr_tokens(&link, "rel");
        let href = link.value().attr("href").unwrap_or("");

        if rel.iter().any(|r| r == "canonical") && facts.canonical.is_none() {
            facts.canonical = resolve(base, href);
        }
        if rel.iter().any(|r| r == "icon" || r == "apple-touch-icon") && !href.trim().is_empty() {
            facts.has_favicon = true;
        }
        if rel.iter().any(|r| r == "stylesheet") {
            facts.stylesheet_count += 1;
        }
        if rel.iter().any(|r| r == "alternate") {
            if let (Some(lang), Some(href)) =
                (non_empty(link.value().attr("hreflang")), resolve(base, href))
            {
                facts.hreflang.push(Hreflang {
                    lang: lang.to_ascii_lowercase(),
                    href,
                });
            }
        }
    }

    // Render-blocking: head stylesheets for all media and synchronous head scripts.
    for el in select(doc, "head link[rel], head script[src]") {
        let blocking = if el.value().name() == "link" {
            attr_tokens(&el, "rel").iter().any(|r| r == "stylesheet")
                && el
                    .value()
                    .attr("media")
                    .map(|m| {
                        let m = m.trim().to_ascii_lowercase();
                        m.is_empty() || m == "all" || m == "screen"
                    })
                    .unwrap_or(true)
        } else {
            let v = el.value();
            v.attr("async").is_none()
                && v.attr("defer").is_none()
                && v.attr("type").map(|t| t != "module").unwrap_or(true)
        };
        if blocking {
            facts.render_blocking_count += 1;
        }
    }
}

fn read_scripts(doc: &Html, facts: &mut DomFacts) {
    for script in select(doc, "script") {
        let kind = script
            .value()
            .attr("type")
            .map(|t| t.trim().to_ascii_lowercase())
            .unwrap_or_default();

        if kind == "application/ld+json" {
            facts.json_ld_blocks += 1;
            let body: String = script.text().collect();
            if serde_json::from_str::<serde_json::Value>(body.trim()).is_ok() {
                facts.json_ld_valid += 1;
            }
            continue;
        }

        facts.script_count += 1;
        if non_empty(script.value().attr("src")).is_some() {
            facts.external_script_count += 1;
        }
    }
}

fn headings(doc: &Html) -> Vec<Heading> {
    select(doc, "h1, h2, h3, h4, h5, h6")
        .into_iter()
        .filter_map(|h| {
            let level = h.value().name().strip_prefix('h')?.parse::<u8>().ok()?;
            Some(Heading {
                level,
                text: element_text(&h),
            })
        })
        .collect()
}

fn links(doc: &Html, base: &Url) -> Vec<Link> {
    let img_sel = Selector::parse("img[alt]").ok();

    select(doc, "a[href]")
        .into_iter()
        .filter_map(|a| {
            let href = resolve(base, a.value().attr("href")?)?;
            let mut text = element_text(&a);
            if text.is_empty() {
                text = non_empty(a.value().attr("aria-label"))
                    .or_else(|| {
                        let sel = img_sel.as_ref()?;
                        a.select(sel)
                            .filter_map(|img| non_empty(img.value().attr("alt")))
                            .next()
                    })
                    .unwrap_or_default();
            }
            Some(Link {
                href,
                text,
                nofollow: attr_tokens(&a, "rel").iter().any(|r| r == "nofollow"),
            })
        })
        .collect()
}

fn images(doc: &Html, base: &Url) -> Vec<Image> {
    select(doc, "img")
        .into_iter()
        .filter_map(|img| {
            let v = img.value();
            let raw = non_empty(v.attr("src")).or_else(|| non_empty(v.attr("data-src")))?;
            let src = resolve(base, &raw).unwrap_or(raw);
            let lazy = v
                .attr("loading")
                .map(|l| l.trim().eq_ignore_ascii_case("lazy"))
                .unwrap_or(false)
                || v.attr("data-src").is_some();
            Some(Image {
                src,
                alt: v.attr("alt").map(|a| a.trim().to_string()),
                lazy,
            })
        })
        .collect()
}

fn insecure_resources(doc: &Html, base: &Url) -> Vec<String> {
    let candidates = select(
        doc,
        "script[src], img[src], iframe[src], video[src], audio[src], source[src], embed[src], link[href]",
    );
    let mut seen = HashSet::new();
    candidates
        .into_iter()
        .filter_map(|el| {
            let v = el.value();
            let raw = if v.name() == "link" {
                let rel = attr_tokens(&el, "rel");
                if !rel.iter().any(|r| r == "stylesheet" || r == "icon" || r == "preload") {
                    return None;
                }
                v.attr("href")?
            } else {
                v.attr("src")?
            };
            let url = resolve_link(base, raw)?;
            (url.scheme() == "http").then(|| url.to_string())
        })
        .filter(|u| seen.insert(u.clone()))
        .collect()
}

fn landmarks(doc: &Html) -> BTreeSet<String> {
    let mut found = BTreeSet::new();
    for el in select(doc, "main, nav, header, footer, aside, [role]") {
        let name = match el.value().attr("role").map(|r| r.trim().to_ascii_lowercase()) {
            Some(role) => match role.as_str() {
                "main" => "main",
                "navigation" => "nav",
                "banner" => "header",
                "contentinfo" => "footer",
                "complementary" => "aside",
                "search" => "search",
                "region" => "region",
                _ => continue,
            },
            None => el.value().name(),
        };
        found.insert(name.to_string());
    }
    found
}

fn form_controls(doc: &Html) -> (usize, usize) {
    let label_targets: HashSet<String> = select(doc, "label[for]")
        .into_iter()
        .filter_map(|l| non_empty(l.value().attr("for")))
        .collect();

    let mut total = 0;
    let mut labelled = 0;
    for control in select(doc, "input, select, textarea") {
        let v = control.value();
        if v.name() == "input" {
            let kind = v.attr("type").unwrap_or("text").trim().to_ascii_lowercase();
            if UNLABELLED_INPUT_TYPES.contains(&kind.as_str()) {
                continue;
            }
        }
        total += 1;

        let has_aria = ["aria-label", "aria-labelledby", "title"]
            .iter()
            .any(|a| non_empty(v.attr(a)).is_some());
        let has_for = v
            .attr("id")
            .map(|id| label_targets.contains(id.trim()))
            .unwrap_or(false);
        let wrapped = control.ancestors().any(|a| match a.value() {
            Node::Element(e) => e.name() == "label",
            _ => false,
        });
        if has_aria || has_for || wrapped {
            labelled += 1;
        }
    }
    (total, labelled)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://example.com/blog/").unwrap()
    }

    const PAGE: &str = r#"<!DOCTYPE html>
<html lang="en">
<head>
  <title>  Example   Blog </title>
  <meta name="description" content="A blog about examples.">
  <meta name="robots" content="index, follow">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <meta property="og:title" content="Example Blog">
  <meta property="og:image" content="https://example.com/og.png">
  <meta name="twitter:card" content="summary">
  <link rel="canonical" href="/blog/">
  <link rel="icon" href="/favicon.ico">
  <link rel="stylesheet" href="/site.css">
  <link rel="stylesheet" href="/print.css" media="print">
  <link rel="alternate" hreflang="de" href="https://example.com/de/blog/">
  <script src="/app.js"></script>
  <script src="/late.js" defer></script>
  <script type="application/ld+json">{"@type": "Blog"}</script>
  <script type="application/ld+json">{broken</script>
</head>
<body>
  <header><nav><a href="/">Home</a> <a href="post-1#comments">Read more</a></nav></header>
  <main>
    <h1>Welcome</h1>
    <h2>Latest</h2>
    <p>Some words here to count.</p>
    <img src="/a.png" alt="A chart">
    <img src="http://cdn.example.com/b.png" loading="lazy">
    <a href="https://other.org/x" rel="nofollow noopener"><img src="/c.png" alt="Other"></a>
    <a href="mailto:me@example.com">Mail</a>
    <form>
      <label for="email">Email</label><input id="email" type="email">
      <label>Name <input type="text"></label>
      <input type="text" placeholder="unlabelled">
      <input type="hidden" name="csrf">
      <button type="submit">Go</button>
    </form>
  </main>
  <div role="contentinfo">Footer</div>
  <script>var hidden = "not visible";</script>
</body>
</html>"#;

    #[test]
    fn test_head_facts() {
        let facts = parse_html(PAGE, &base());
        assert_eq!(facts.title.as_deref(), Some("Example Blog"));
        assert_eq!(facts.meta_description.as_deref(), Some("A blog about examples."));
        assert_eq!(facts.meta_robots.as_deref(), Some("index, follow"));
        assert!(facts.viewport.is_some());
        assert_eq!(facts.lang.as_deref(), Some("en"));
        assert_eq!(facts.canonical.as_deref(), Some("https://example.com/blog/"));
        assert!(facts.has_favicon);
        assert_eq!(facts.open_graph.len(), 2);
        assert_eq!(facts.twitter_card.as_deref(), Some("summary"));
        assert_eq!(facts.hreflang.len(), 1);
        assert_eq!(facts.hreflang[0].lang, "de");
    }

    #[test]
    fn test_resources() {
        let facts = parse_html(PAGE, &base());
        assert_eq!(facts.stylesheet_count, 2);
        // site.css and app.js; print.css and the deferred script don't block.
        assert_eq!(facts.render_blocking_count, 2);
        assert_eq!(facts.script_count, 3);
        assert_eq!(facts.external_script_count, 2);
        assert_eq!(facts.json_ld_blocks, 2);
        assert_eq!(facts.json_ld_valid, 1);
        assert_eq!(facts.insecure_resources, vec!["http://cdn.example.com/b.png"]);
    }

    #[test]
    fn test_body_facts() {
        let facts = parse_html(PAGE, &base());
        assert_eq!(facts.h1_count(), 1);
        assert_eq!(facts.headings[1].level, 2);

        let hrefs: Vec<&str> = facts.links.iter().map(|l| l.href.as_str()).collect();
        assert_eq!(
            hrefs,
            vec![
                "https://example.com/",
                "https://example.com/blog/post-1",
                "https://other.org/x"
            ]
        );
        assert!(facts.links[2].nofollow);
        assert_eq!(facts.links[2].text, "Other");

        assert_eq!(facts.images.len(), 3);
        assert_eq!(facts.images[1].alt, None);
        assert!(facts.images[1].lazy);

        assert_eq!(facts.form_controls, 3);
        assert_eq!(facts.labelled_controls, 2);

        assert!(facts.landmarks.contains("main"));
        assert!(facts.landmarks.contains("nav"));
        assert!(facts.landmarks.contains("footer"));
    }

    #[test]
    fn test_visible_text_excludes_scripts_and_head() {
        let facts = parse_html(PAGE, &base());
        assert!(facts.word_count > 5);
        let again = parse_html(PAGE, &base());
        assert_eq!(facts.fingerprint, again.fingerprint);

        let other = parse_html("<html><body><p>Different words</p></body></html>", &base());
        assert_ne!(facts.fingerprint, other.fingerprint);
    }

    #[test]
    fn test_malformed_markup_does_not_fail() {
        let facts = parse_html("<html><head><title>Broken<body><h1>Still <b>works", &base());
        assert!(facts.headings.len() <= 1);
        assert!(facts.meta_description.is_none());
        assert!(facts.canonical.is_none());

        let empty = parse_html("", &base());
        assert!(empty.title.is_none());
        assert_eq!(empty.word_count, 0);
    }
}
