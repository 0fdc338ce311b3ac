use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::{debug, warn};
use url::Url;

use crate::url_helper::{normalize, same_origin_url};

static ANCHOR_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("ANCHOR_SELECTOR: hardcoded selector is valid"));

/// Probe every navigation selector and keep the one that finds the most
/// distinct same-origin links. Ties keep the earlier selector.
pub fn extract_links(markup: &str, base: &Url, nav_selectors: &[String]) -> Vec<Url> {
    let document = Html::parse_document(markup);
    links_from_document(&document, base, nav_selectors)
}

pub fn links_from_document(document: &Html, base: &Url, nav_selectors: &[String]) -> Vec<Url> {
    let mut best: Vec<Url> = Vec::new();
    let mut best_selector: Option<&str> = None;

    for selector_str in nav_selectors {
        let selector = match Selector::parse(selector_str) {
            Ok(selector) => selector,
            Err(e) => {
                warn!("Skipping invalid navigation selector \"{}\": {:?}", selector_str, e);
                continue;
            }
        };

        let links = collect_links(document, &selector, base);
        if links.len() > best.len() {
            best = links;
            best_selector = Some(selector_str.as_str());
        }
    }

    match best_selector {
        Some(selector) => debug!("Selector \"{}\" found {} links on {}", selector, best.len(), base),
        None => debug!("No navigation links found on {}", base),
    }
    best
}

/// Distinct same-origin links under `selector`, in document order.
fn collect_links(document: &Html, selector: &Selector, base: &Url) -> Vec<Url> {
    let mut links = Vec::new();
    let mut seen = HashSet::new();

    for element in document.select(selector) {
        for href in hrefs(element) {
            let Some(url) = normalize(href, base) else {
                continue;
            };
            if !same_origin_url(&url, base) {
                continue;
            }
            if seen.insert(url.clone()) {
                links.push(url);
            }
        }
    }

    links
}

/// The element's own `href`, or those of its descendant anchors when it has none.
fn hrefs(element: ElementRef<'_>) -> Vec<&str> {
    match element.value().attr("href") {
        Some(href) => vec![href],
        None => element
            .select(&ANCHOR_SELECTOR)
            .filter_map(|a| a.value().attr("href"))
            .collect(),
    }
}
