//! Structural fact extraction from fetched responses.

pub mod parser;

pub use parser::parse_html;

use crate::model::page::DomFacts;
use url::Url;

/// Run [`parse_html`] on the blocking pool.
///
/// Returns `None` only if the blocking task panicked.
pub async fn parse_html_blocking(html: String, base: Url) -> Option<DomFacts> {
    tokio::task::spawn_blocking(move || parse_html(&html, &base))
        .await
        .ok()
}
