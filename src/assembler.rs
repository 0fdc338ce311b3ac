use html_escape::encode_text;

use crate::crawler::{ContentFormat, Page};
use crate::markdown::markdown_to_html;

const PRINT_CSS: &str = include_str!("print.css");

pub const PAGE_BREAK: &str = r#"<div class="page-break"></div>"#;

/// Build one printable HTML document from a run of pages.
///
/// Each page gets a header with its title and source URL; consecutive pages
/// are separated by a page break, with none after the last one.
pub fn assemble_document(pages: &[Page]) -> String {
    let mut body = String::new();

    for (index, page) in pages.iter().enumerate() {
        body.push_str(&page_html(page));
        if index + 1 < pages.len() {
            body.push_str(PAGE_BREAK);
            body.push('\n');
        }
    }

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>Documentation</title>
<style>
{}
</style>
</head>
<body>
{}
</body>
</html>
"#,
        PRINT_CSS, body
    )
}

fn page_html(page: &Page) -> String {
    let content = match page.format {
        ContentFormat::Markdown => markdown_to_html(&page.content),
    };

    format!(
        r#"<div class="page-container">
<div class="page-header">
<h1>{}</h1>
<p class="page-url">{}</p>
</div>
<div class="page-content">
{}
</div>
</div>
"#,
        encode_text(&page.title),
        encode_text(&page.url),
        content
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(n: usize) -> Page {
        Page {
            url: format!("https://docs.example.com/p{n}?a=1&b=2"),
            title: format!("Page <{n}>"),
            content: format!("## Section {n}\n\nBody of page {n}."),
            format: ContentFormat::Markdown,
        }
    }

    #[test]
    fn test_page_breaks_between_pages_only() {
        let pages: Vec<Page> = (1..=3).map(page).collect();
        let html = assemble_document(&pages);

        assert_eq!(html.matches(PAGE_BREAK).count(), 2);
        let last_break = html.rfind(PAGE_BREAK).unwrap();
        assert!(last_break < html.find("Body of page 3").unwrap());
    }

    #[test]
    fn test_single_page_has_no_break() {
        let html = assemble_document(&[page(1)]);
        assert!(!html.contains(PAGE_BREAK));
    }

    #[test]
    fn test_header_is_escaped_and_content_expanded() {
        let html = assemble_document(&[page(7)]);

        assert!(html.contains("<h1>Page &lt;7&gt;</h1>"), "got: {html}");
        assert!(html.contains("https://docs.example.com/p7?a=1&amp;b=2"));
        assert!(html.contains("<h2>Section 7</h2>"));
        assert!(html.contains("<p>Body of page 7.</p>"));
    }
}
