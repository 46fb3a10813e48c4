//! Readable-text extraction from raw HTML.
//!
//! Strips page chrome, picks the most specific content container, and
//! collects paragraph, heading, and list text in document order.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

/// Nodes removed before extraction: scripts, styling, and site chrome.
static NOISE: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script, style, nav, footer, header, form").expect("static selector")
});

/// Content containers, most specific first.
static CONTAINERS: LazyLock<[Selector; 3]> = LazyLock::new(|| {
    ["article", "main", "body"].map(|s| Selector::parse(s).expect("static selector"))
});

/// Elements whose text makes up the excerpt.
static CONTENT: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("p, h1, h2, h3, ul").expect("static selector"));

/// Extract at most `max_chars` characters of readable text from an HTML document.
///
/// Returns an empty string when the document has no usable container or no
/// text-bearing elements.
pub fn extract_text(html: &str, max_chars: usize) -> String {
    let mut doc = Html::parse_document(html);
    strip_noise(&mut doc);

    let Some(container) = find_container(&doc) else {
        return String::new();
    };

    let text = container
        .select(&CONTENT)
        .map(|el| el.text().collect::<String>())
        .filter_map(|fragment| {
            let trimmed = fragment.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        })
        .collect::<Vec<_>>()
        .join("\n");

    truncate_chars(text, max_chars)
}

/// Detach every noise node from the tree so later selections cannot reach it.
fn strip_noise(doc: &mut Html) {
    let ids: Vec<_> = doc.select(&NOISE).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

fn find_container(doc: &Html) -> Option<ElementRef<'_>> {
    CONTAINERS
        .iter()
        .find_map(|selector| doc.select(selector).next())
}

/// Truncate to `max_chars` Unicode scalar values.
fn truncate_chars(mut text: String, max_chars: usize) -> String {
    if let Some((idx, _)) = text.char_indices().nth(max_chars) {
        text.truncate(idx);
    }
    text
}
