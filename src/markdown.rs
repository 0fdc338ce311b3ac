//! HTML ↔ Markdown for page content.
//!
//! Pages are stored as Markdown so the assembled document carries portable,
//! predictable markup. Two rules override htmd's defaults:
//! - `<img>` keeps `width`/`height` in a trailing HTML comment.
//! - `<pre><code class="language-x">` becomes a fenced block tagged `x`,
//!   with the code's raw text as the body.

use htmd::element_handler::{HandlerResult, Handlers};
use htmd::options::{HeadingStyle, Options};
use htmd::{Element, HtmlToMarkdown};
use markup5ever_rcdom::{Node, NodeData};
use pulldown_cmark::{html, Parser};
use std::fmt::Display;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;
use tracing::warn;

pub struct MarkdownConverter {
    inner: HtmlToMarkdown,
}

impl MarkdownConverter {
    pub fn new() -> Self {
        let inner = HtmlToMarkdown::builder()
            .options(Options {
                heading_style: HeadingStyle::Atx,
                ..Default::default()
            })
            .skip_tags(vec!["script", "style", "noscript"])
            .add_handler(vec!["img"], image_handler)
            .add_handler(vec!["pre"], pre_handler)
            .build();
        Self { inner }
    }

    /// Convert a sanitized fragment. Falls back to the fragment itself when
    /// conversion fails, so a page is never lost to a converter bug.
    pub fn convert(&self, fragment: &str) -> String {
        convert_or_keep(fragment, || self.inner.convert(fragment))
    }
}

fn convert_or_keep<F, E>(fragment: &str, convert: F) -> String
where
    F: FnOnce() -> Result<String, E>,
    E: Display,
{
    match panic::catch_unwind(AssertUnwindSafe(convert)) {
        Ok(Ok(markdown)) => markdown,
        Ok(Err(e)) => {
            warn!("Markdown conversion failed, keeping HTML: {}", e);
            fragment.to_string()
        }
        Err(_) => {
            warn!("Markdown converter panicked, keeping HTML");
            fragment.to_string()
        }
    }
}

impl Default for MarkdownConverter {
    fn default() -> Self {
        Self::new()
    }
}

/// Expand stored Markdown back into HTML for rendering.
pub fn markdown_to_html(markdown: &str) -> String {
    let options = pulldown_cmark::Options::ENABLE_TABLES
        | pulldown_cmark::Options::ENABLE_STRIKETHROUGH
        | pulldown_cmark::Options::ENABLE_TASKLISTS
        | pulldown_cmark::Options::ENABLE_FOOTNOTES;
    let parser = Parser::new_ext(markdown, options);

    let mut output = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut output, parser);
    output
}

fn image_handler(_handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let attrs = element.attrs;
    let Some(src) = get_attr(attrs, "src") else {
        return Some(HandlerResult::from(String::new()));
    };

    let alt = get_attr(attrs, "alt").unwrap_or_default();
    let title = get_attr(attrs, "title");
    let width = get_attr(attrs, "width");
    let height = get_attr(attrs, "height");

    let mut markdown = format!(
        "![{}]({}",
        alt.replace(['[', ']'], ""),
        src.replace('(', "%28").replace(')', "%29").replace(' ', "%20")
    );
    if let Some(title) = title {
        markdown.push_str(&format!(" \"{}\"", title.replace('"', "\\\"")));
    }
    markdown.push(')');

    if width.is_some() || height.is_some() {
        markdown.push_str(&format!(
            " <!-- size: {}x{} -->",
            width.unwrap_or_default(),
            height.unwrap_or_default()
        ));
    }

    Some(HandlerResult::from(markdown))
}

fn pre_handler(_handlers: &dyn Handlers, element: Element) -> Option<HandlerResult> {
    let (language, code) = match sole_code_child(element.node) {
        Some(code) => (language_of(&code), raw_text(&code)),
        None => (String::new(), raw_text(element.node)),
    };
    Some(HandlerResult::from(fenced_block(&language, &code)))
}

fn fenced_block(language: &str, code: &str) -> String {
    let code = code.trim_end_matches('\n');

    // The fence must be longer than any backtick run inside the code.
    let mut longest = 0;
    let mut run = 0;
    for ch in code.chars() {
        if ch == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let fence = "`".repeat((longest + 1).max(3));

    format!("\n\n{fence}{language}\n{code}\n{fence}\n\n")
}

/// The `<code>` child of a `<pre>` when it is the only non-blank child.
fn sole_code_child(node: &Rc<Node>) -> Option<Rc<Node>> {
    let children = node.children.borrow();
    let mut significant = children.iter().filter(|child| match &child.data {
        NodeData::Text { contents } => !contents.borrow().trim().is_empty(),
        NodeData::Comment { .. } => false,
        _ => true,
    });

    let first = significant.next()?;
    if significant.next().is_some() {
        return None;
    }

    let code = match &first.data {
        NodeData::Element { name, .. } if &*name.local == "code" => Some(Rc::clone(first)),
        _ => None,
    };
    code
}

/// `go` for `class="language-go"`, empty when there is no such class.
fn language_of(node: &Rc<Node>) -> String {
    let NodeData::Element { attrs, .. } = &node.data else {
        return String::new();
    };
    let attrs = attrs.borrow();
    let language = attrs
        .iter()
        .find(|attr| &*attr.name.local == "class")
        .and_then(|attr| {
            attr.value
                .split_whitespace()
                .find_map(|class| class.strip_prefix("language-"))
                .map(str::to_string)
        })
        .unwrap_or_default();
    language
}

/// Text content with entities decoded and nothing re-escaped.
fn raw_text(node: &Rc<Node>) -> String {
    let mut text = String::new();
    collect_text(node, &mut text);
    text
}

fn collect_text(node: &Rc<Node>, text: &mut String) {
    match &node.data {
        NodeData::Text { contents } => text.push_str(&contents.borrow()),
        NodeData::Element { .. } | NodeData::Document => {
            for child in node.children.borrow().iter() {
                collect_text(child, text);
            }
        }
        _ => {}
    }
}

fn get_attr(attrs: &[html5ever::Attribute], name: &str) -> Option<String> {
    attrs
        .iter()
        .find(|attr| &*attr.name.local == name)
        .map(|attr| attr.value.trim().to_string())
        .filter(|value| !value.is_empty())
}
