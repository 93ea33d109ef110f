//! Script source extraction from HTML documents.

use scraper::{Html, Selector};
use std::sync::LazyLock;

static SCRIPT_SRC: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("script[src]").expect("static selector 'script[src]' should always parse")
});

/// Collects the `src` of every `<script>` element, in document order.
///
/// Elements without a `src`, or with an empty one, are skipped. Values are
/// returned exactly as written in the document. Malformed markup is handled
/// leniently by the parser; the worst case is an empty list.
///
/// # Example
///
/// ```
/// use scriptscout::extract::extract_scripts;
///
/// let html = r#"<script src="/app.js"></script><script>inline()</script>"#;
/// assert_eq!(extract_scripts(html), vec!["/app.js"]);
/// ```
pub fn extract_scripts(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);

    document
        .select(&SCRIPT_SRC)
        .filter_map(|element| element.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(str::to_string)
        .collect()
}
