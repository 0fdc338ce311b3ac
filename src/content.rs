use scraper::{Html, Selector};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::sanitizer::sanitize;

pub const UNTITLED: &str = "Untitled";

static H1_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("h1").expect("H1_SELECTOR: hardcoded selector is valid"));
static TITLE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("TITLE_SELECTOR: hardcoded selector is valid"));
static BODY_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("BODY_SELECTOR: hardcoded selector is valid"));

/// Sanitized inner markup of the first content container that matches,
/// or of the whole body when none does.
pub fn extract_content(markup: &str, content_selectors: &[String]) -> String {
    let document = Html::parse_document(markup);
    content_from_document(&document, content_selectors)
}

pub fn content_from_document(document: &Html, content_selectors: &[String]) -> String {
    for selector_str in content_selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Skipping invalid content selector \"{}\": {:?}", selector_str, e);
                continue;
            }
        };

        // inner_html() serializes a copy, so sanitizing never touches the parsed document.
        if let Some(element) = document.select(&selector).next() {
            debug!("Content matched selector \"{}\"", selector_str);
            return sanitize(&element.inner_html());
        }
    }

    debug!("No content selector matched, falling back to <body>");
    document
        .select(&BODY_SELECTOR)
        .next()
        .map(|body| sanitize(&body.inner_html()))
        .unwrap_or_default()
}

/// First `<h1>`, then `<title>`, then a placeholder.
pub fn extract_title(document: &Html) -> String {
    [&*H1_SELECTOR, &*TITLE_SELECTOR]
        .into_iter()
        .filter_map(|selector| document.select(selector).next())
        .map(|element| collapse_whitespace(&element.text().collect::<String>()))
        .find(|title| !title.is_empty())
        .unwrap_or_else(|| UNTITLED.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
