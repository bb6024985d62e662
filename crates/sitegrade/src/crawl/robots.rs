//! robots.txt parsing and path matching.

use serde::Serialize;
use std::time::Duration;

/// Longest `Crawl-delay` honoured.
pub const MAX_CRAWL_DELAY: Duration = Duration::from_secs(2);

/// Rules from the robots.txt group that applies to our user agent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RobotsRules {
    pub allowed: Vec<String>,
    pub disallowed: Vec<String>,
    pub crawl_delay: Option<f32>,
    /// `Sitemap:` directives (global, collected from every group).
    pub sitemaps: Vec<String>,
}

impl RobotsRules {
    /// Longest matching rule wins; ties go to `Allow`.
    pub fn is_allowed(&self, path: &str) -> bool {
        let longest = |patterns: &[String]| {
            patterns
                .iter()
                .filter(|p| path_matches(path, p))
                .map(|p| p.len())
                .max()
        };

        match (longest(&self.allowed), longest(&self.disallowed)) {
            (_, None) => true,
            (None, Some(_)) => false,
            (Some(allow), Some(disallow)) => allow >= disallow,
        }
    }

    /// `Disallow: /` with nothing allowed back.
    pub fn blocks_all(&self) -> bool {
        !self.is_allowed("/")
    }

    /// Crawl delay as a duration, capped at [`MAX_CRAWL_DELAY`].
    pub fn crawl_delay(&self) -> Option<Duration> {
        self.crawl_delay
            .filter(|d| d.is_finite() && *d > 0.0)
            .map(|d| Duration::from_secs_f32(d).min(MAX_CRAWL_DELAY))
    }
}

/// Parse robots.txt for `user_agent`.
///
/// A group naming our agent (by product token, case-insensitive) takes
/// precedence over the `*` group.
pub fn parse_robots(txt: &str, user_agent: &str) -> RobotsRules {
    let token = product_token(user_agent);

    let mut specific = RobotsRules::default();
    let mut wildcard = RobotsRules::default();
    let mut sitemaps = Vec::new();
    let mut found_specific = false;

    // Which groups the current block of user-agent lines selected.
    let mut applies_specific = false;
    let mut applies_wildcard = false;
    let mut in_agent_lines = false;

    for line in txt.lines() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_ascii_lowercase();
        let value = value.trim();

        if key == "user-agent" {
            if !in_agent_lines {
                applies_specific = false;
                applies_wildcard = false;
            }
            in_agent_lines = true;
            let ua = value.to_ascii_lowercase();
            if ua == "*" {
                applies_wildcard = true;
            } else if !token.is_empty() && !ua.is_empty() && token.starts_with(&ua) {
                applies_specific = true;
                found_specific = true;
            }
            continue;
        }
        in_agent_lines = false;

        if key == "sitemap" {
            if !value.is_empty() {
                sitemaps.push(value.to_string());
            }
            continue;
        }

        for (applies, rules) in [
            (applies_specific, &mut specific),
            (applies_wildcard, &mut wildcard),
        ] {
            if !applies {
                continue;
            }
            match key.as_str() {
                "allow" if !value.is_empty() => rules.allowed.push(value.to_string()),
                "disallow" if !value.is_empty() => rules.disallowed.push(value.to_string()),
                "crawl-delay" => {
                    if let Ok(delay) = value.parse::<f32>() {
                        rules.crawl_delay = Some(delay);
                    }
                }
                _ => {}
            }
        }
    }

    let mut rules = if found_specific { specific } else { wildcard };
    rules.sitemaps = sitemaps;
    rules
}

fn product_token(user_agent: &str) -> String {
    user_agent
        .split(['/', ' '])
        .next()
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Match a robots pattern supporting `*` wildcards and a trailing `$`.
fn path_matches(path: &str, pattern: &str) -> bool {
    if pattern.is_empty() {
        return false;
    }
    let (pattern, anchored) = match pattern.strip_suffix('$') {
        Some(p) => (p, true),
        None => (pattern, false),
    };

    let mut parts = pattern.split('*');
    let Some(first) = parts.next() else {
        return false;
    };
    let Some(mut rest) = path.strip_prefix(first) else {
        return false;
    };

    let remaining: Vec<&str> = parts.collect();
    for (i, part) in remaining.iter().enumerate() {
        let is_last = i + 1 == remaining.len();
        if part.is_empty() {
            if is_last && !anchored {
                return true;
            }
            continue;
        }
        if is_last && anchored {
            return rest.ends_with(part);
        }
        match rest.find(part) {
            Some(pos) => rest = &rest[pos + part.len()..],
            None => return false,
        }
    }

    !anchored || rest.is_empty() || (pattern.ends_with('*'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_robots() {
        let txt = r#"
User-agent: *
Allow: /
Disallow: /admin
Disallow: /private/
Crawl-delay: 1.5

Sitemap: https://example.com/sitemap.xml
Sitemap: https://example.com/sitemap-blog.xml
"#;

        let rules = parse_robots(txt, "SitegradeBot/0.1");
        assert_eq!(rules.allowed.len(), 1);
        assert_eq!(rules.disallowed.len(), 2);
        assert_eq!(rules.crawl_delay, Some(1.5));
        assert_eq!(rules.sitemaps.len(), 2);

        assert!(rules.is_allowed("/"));
        assert!(rules.is_allowed("/about"));
        assert!(!rules.is_allowed("/admin"));
        assert!(!rules.is_allowed("/admin/settings"));
        assert!(!rules.is_allowed("/private/data"));
        assert!(!rules.blocks_all());
    }

    #[test]
    fn test_allow_overrides_disallow() {
        let txt = "User-agent: *\nDisallow: /api/\nAllow: /api/public/\n";
        let rules = parse_robots(txt, "SitegradeBot");
        assert!(!rules.is_allowed("/api/secret"));
        assert!(rules.is_allowed("/api/public/docs"));
    }

    #[test]
    fn test_specific_group_wins() {
        let txt = r#"
User-agent: *
Disallow: /

User-agent: SitegradeBot
Disallow: /drafts
"#;
        let rules = parse_robots(txt, "SitegradeBot/0.1 (+https://x)");
        assert!(rules.is_allowed("/blog"));
        assert!(!rules.is_allowed("/drafts/1"));

        let other = parse_robots(txt, "OtherBot");
        assert!(other.blocks_all());
    }

    #[test]
    fn test_wildcards() {
        let txt = "User-agent: *\nDisallow: /*.pdf$\nDisallow: /search*q=\n";
        let rules = parse_robots(txt, "SitegradeBot");
        assert!(!rules.is_allowed("/files/report.pdf"));
        assert!(rules.is_allowed("/files/report.pdf.html"));
        assert!(!rules.is_allowed("/search?q=shoes"));
        assert!(rules.is_allowed("/search"));
    }

    #[test]
    fn test_crawl_delay_is_capped() {
        let rules = parse_robots("User-agent: *\nCrawl-delay: 30\n", "SitegradeBot");
        assert_eq!(rules.crawl_delay(), Some(MAX_CRAWL_DELAY));
        let none = parse_robots("User-agent: *\nDisallow:\n", "SitegradeBot");
        assert_eq!(none.crawl_delay(), None);
        assert!(none.is_allowed("/anything"));
    }
}
