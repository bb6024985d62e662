//! Local test sites served by wiremock.

#![allow(dead_code)]

use sitegrade::{AuditConfig, Engine, EngineSettings};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const HTML: &str = "text/html; charset=utf-8";

/// An audit config with short timeouts for local servers.
pub fn fast_config() -> AuditConfig {
    AuditConfig {
        per_request_timeout_ms: 5_000,
        overall_timeout_ms: 30_000,
        ..AuditConfig::default()
    }
}

pub fn engine() -> Engine {
    Engine::new(EngineSettings::default()).unwrap()
}

pub fn page(html: impl Into<String>) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(html.into(), HTML)
}

pub async fn get(server: &MockServer, route: &str, response: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(response)
        .mount(server)
        .await;
}

/// A minimal HTML page linking to `links`.
pub fn linking_page(title: &str, links: &[&str]) -> String {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{href}">Go to {href}</a>"#))
        .collect();
    format!("<html><head><title>{title}</title></head><body><h1>{title}</h1>{anchors}</body></html>")
}

/// A single, fast, well-configured page plus robots.txt and a sitemap.
///
/// Served over plain HTTP, so HTTPS-only checks score or drop out
/// accordingly.
pub async fn mount_well_behaved_site(server: &MockServer) {
    let body = "Acme workshop tools are forged by hand. ".repeat(30);
    let html = format!(
        r#"<!doctype html>
<html lang="en">
<head>
  <meta charset="utf-8">
  <title>Acme Widgets - Handmade Tools</title>
  <meta name="description" content="Acme Widgets builds durable handmade tools for workshops, makers and schools around the world.">
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <link rel="canonical" href="/">
  <link rel="icon" href="/favicon.ico">
  <meta property="og:title" content="Acme Widgets">
  <meta property="og:description" content="Handmade tools">
  <meta property="og:image" content="/og.png">
  <meta name="twitter:card" content="summary">
  <script type="application/ld+json">{{"@context":"https://schema.org","@type":"Organization","name":"Acme"}}</script>
</head>
<body>
  <header><nav><a href="/">Home</a></nav></header>
  <main>
    <h1>Handmade tools</h1>
    <h2>Why Acme</h2>
    <p>{body}</p>
  </main>
  <footer>Acme Widgets Ltd</footer>
</body>
</html>"#
    );

    let secure_headers = [
        ("cache-control", "public, max-age=3600"),
        ("content-security-policy", "default-src 'self'; frame-ancestors 'none'"),
        ("x-frame-options", "DENY"),
        ("x-content-type-options", "nosniff"),
        ("referrer-policy", "strict-origin-when-cross-origin"),
        ("permissions-policy", "camera=(), microphone=()"),
    ];
    let mut home = page(html);
    for (name, value) in secure_headers {
        home = home.insert_header(name, value);
    }
    get(server, "/", home).await;

    Mock::given(method("HEAD"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", HTML)
                .insert_header("content-encoding", "br"),
        )
        .mount(server)
        .await;

    let robots = format!(
        "User-agent: *\nAllow: /\nSitemap: {}/sitemap.xml\n",
        server.uri()
    );
    get(
        server,
        "/robots.txt",
        ResponseTemplate::new(200).set_body_raw(robots, "text/plain"),
    )
    .await;

    let sitemap = format!(
        r#"<?xml version="1.0" encoding="UTF-8"?>
<urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">
  <url><loc>{}/</loc></url>
</urlset>"#,
        server.uri()
    );
    get(
        server,
        "/sitemap.xml",
        ResponseTemplate::new(200).set_body_raw(sitemap, "application/xml"),
    )
    .await;
}
