//! Boilerplate removal for extracted content fragments.
//!
//! The fragment is parsed once and re-serialized while skipping everything that
//! is not page content: scripts and styles, form widgets, structural chrome
//! (`nav`, `header`, `footer`, `aside` and their ARIA landmarks), elements whose
//! class or id names a known widget (breadcrumbs, sidebars, cookie notices...),
//! hidden elements, and finally elements left with neither text nor children.
//!
//! Emptiness is decided bottom-up in the same walk, so a parent that only held
//! pruned children is pruned too. That makes a second pass a no-op.

use regex::Regex;
use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};
use std::sync::LazyLock;
use tracing::warn;

const MAX_NESTING_DEPTH: usize = 512;

static REMOVE_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse(
        "script, style, noscript, template, iframe, object, embed, \
         xmp, noembed, noframes, plaintext, \
         form, input, button, select, textarea, dialog, \
         nav, header, footer, aside, \
         [role=\"navigation\"], [role=\"banner\"], [role=\"contentinfo\"], \
         [role=\"complementary\"], [role=\"search\"], \
         .copy-button, .edit-page, .edit-link, .page-edit, .github-link",
    )
    .expect("REMOVE_SELECTOR: hardcoded selector is valid")
});

// Matched against the id and each class token. A name hits when one of its
// `-`/`_` separated segments is a widget word, so `theme-doc-sidebar-container`
// and `pagination-nav` match while `shared-memory` does not.
static WIDGET_NAME_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^(?:.*[-_])?(?:nav|navbar|navigation|breadcrumbs?|sidebar|banner|cookies?|consent|share|sharing|social|pagination|pager|toc|advertisement|ads|skip-link)(?:[-_].*)?$",
    )
    .expect("WIDGET_NAME_RE: hardcoded regex is valid")
});

/// Kept even when they have no content.
const KEEP_WHEN_EMPTY: &[&str] = &["img", "br", "hr"];

const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Strip non-content markup from an HTML fragment.
///
/// Never fails: unparsable markup is handled by the HTML5 parser's error recovery.
pub fn sanitize(fragment: &str) -> String {
    let document = Html::parse_fragment(fragment);
    let mut output = String::with_capacity(fragment.len());
    write_children(&document.root_element(), &mut output, 0);
    output.trim().to_string()
}

/// Whether the element (and its whole subtree) is boilerplate.
pub fn is_boilerplate(element: &ElementRef) -> bool {
    REMOVE_SELECTOR.matches(element) || is_hidden(element) || has_widget_name(element)
}

fn is_hidden(element: &ElementRef) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    if value
        .attr("aria-hidden")
        .is_some_and(|v| v.trim().eq_ignore_ascii_case("true"))
    {
        return true;
    }
    value.attr("style").is_some_and(|style| {
        let style: String = style
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();
        style.contains("display:none") || style.contains("visibility:hidden")
    })
}

fn has_widget_name(element: &ElementRef) -> bool {
    let value = element.value();
    value.id().is_some_and(|id| WIDGET_NAME_RE.is_match(id))
        || value.classes().any(|class| WIDGET_NAME_RE.is_match(class))
}

/// Serialize the children of `element`, returning whether any text or element survived.
fn write_children(element: &ElementRef, output: &mut String, depth: usize) -> bool {
    let mut has_content = false;

    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if !text.trim().is_empty() {
                    has_content = true;
                }
                escape_text(text, output);
            }
            Node::Element(_) => {
                if let Some(child_element) = ElementRef::wrap(child) {
                    if write_element(&child_element, output, depth + 1) {
                        has_content = true;
                    }
                }
            }
            // Comments, doctypes and processing instructions are dropped.
            _ => {}
        }
    }

    has_content
}

fn write_element(element: &ElementRef, output: &mut String, depth: usize) -> bool {
    if depth > MAX_NESTING_DEPTH {
        warn!(
            element = element.value().name(),
            depth, "Maximum HTML nesting depth exceeded, truncating subtree"
        );
        return false;
    }

    if is_boilerplate(element) {
        return false;
    }

    let name = element.value().name();
    let is_void = VOID_ELEMENTS.contains(&name);

    let mut inner = String::new();
    let has_content = !is_void && write_children(element, &mut inner, depth);

    if !has_content && !KEEP_WHEN_EMPTY.contains(&name) {
        return false;
    }

    output.push('<');
    output.push_str(name);

    let mut attrs: Vec<(&str, &str)> = element
        .value()
        .attrs()
        .filter(|(attr, _)| !attr.starts_with("on"))
        .collect();
    attrs.sort_unstable_by(|a, b| a.0.cmp(b.0));
    for (attr, value) in attrs {
        output.push(' ');
        output.push_str(attr);
        output.push_str("=\"");
        escape_attribute(value, output);
        output.push('"');
    }
    output.push('>');

    if is_void {
        return true;
    }

    // The parser swallows one leading newline in these elements.
    if matches!(name, "pre" | "textarea" | "listing") && inner.starts_with('\n') {
        output.push('\n');
    }
    output.push_str(&inner);
    output.push_str("</");
    output.push_str(name);
    output.push('>');
    true
}

fn escape_text(text: &str, output: &mut String) {
    for ch in text.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            c => output.push(c),
        }
    }
}

fn escape_attribute(value: &str, output: &mut String) {
    for ch in value.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '"' => output.push_str("&quot;"),
            c => output.push(c),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_removes_scripts_styles_and_widgets() {
        let html = r#"
            <p>Keep me</p>
            <script>alert(1)</script>
            <style>p { color: red }</style>
            <form><input name="q"><button>Go</button></form>
        "#;
        let clean = sanitize(html);
        assert_eq!(clean, "<p>Keep me</p>");
    }

    #[test]
    fn test_removes_raw_text_elements() {
        let clean = sanitize("<p>Keep</p><xmp>a & b</xmp><noembed>x</noembed><noframes>y</noframes>");
        assert_eq!(clean, "<p>Keep</p>");
        assert_eq!(sanitize(&clean), clean);
    }

    #[test]
    fn test_removes_structural_boilerplate() {
        let html = r#"
            <header><h1>Site</h1></header>
            <nav><a href="/a">A</a></nav>
            <div role="navigation"><a href="/b">B</a></div>
            <article><p>Body</p></article>
            <aside>Related</aside>
            <footer>(c) 2024</footer>
        "#;
        let clean = sanitize(html);
        assert!(clean.contains("<p>Body</p>"), "got: {clean}");
        for gone in ["Site", "href=\"/a\"", "href=\"/b\"", "Related", "(c) 2024"] {
            assert!(!clean.contains(gone), "{gone} should be removed, got: {clean}");
        }
    }

    #[test]
    fn test_removes_widget_class_and_id_names() {
        let html = r#"
            <div class="breadcrumbs"><a href="/">Home</a></div>
            <div id="cookie-banner">We use cookies</div>
            <div class="theme-doc-sidebar-container">Menu</div>
            <div class="pagination-nav"><a href="/next">Next</a></div>
            <div class="share-buttons">Tweet</div>
            <div class="shared-memory">Real content</div>
        "#;
        let clean = sanitize(html);
        assert_eq!(clean, r#"<div class="shared-memory">Real content</div>"#);
    }

    #[test]
    fn test_removes_hidden_elements() {
        let html = r#"
            <p hidden>secret</p>
            <p style="display: none">gone</p>
            <p style="VISIBILITY:hidden">also gone</p>
            <span aria-hidden="true">#</span>
            <p>visible</p>
        "#;
        assert_eq!(sanitize(html), "<p>visible</p>");
    }

    #[test]
    fn test_prunes_empty_elements_but_keeps_images_and_breaks() {
        let html = r#"<div><span></span><p> </p></div><p>a<br>b</p><hr><div><img src="x.png" alt="x"></div>"#;
        let clean = sanitize(html);
        assert_eq!(
            clean,
            r#"<p>a<br>b</p><hr><div><img alt="x" src="x.png"></div>"#
        );
    }

    #[test]
    fn test_sanitize_is_idempotent() {
        let inputs = [
            "<div><div><span></span></div></div><p>text</p>",
            "<pre>\n\nfn main() {}\n</pre>",
            r#"<table><tr><td>a &amp; b</td><td></td></tr></table>"#,
            r#"<p>x &lt;y&gt; "quoted" <a href="/a?b=1&amp;c=2" title='say "hi"'>l</a></p>"#,
            "<ul><li>one<li>two</ul><p><div>bad nesting</div></p>",
            "unclosed <b>bold <i>italic",
            "<nav>only chrome</nav>",
            "<xmp>a & b < c</xmp><p>after</p>",
            "<noembed>x &amp; y</noembed><noframes>1 < 2</noframes>",
            "<p>before</p><plaintext>a & b <i>c</i>",
            "",
        ];
        for input in inputs {
            let once = sanitize(input);
            let twice = sanitize(&once);
            assert_eq!(once, twice, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_drops_event_handler_attributes() {
        let clean = sanitize(r#"<p onclick="steal()" class="lead">hi</p>"#);
        assert_eq!(clean, r#"<p class="lead">hi</p>"#);
    }
}
