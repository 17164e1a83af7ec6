// Small helpers over `scraper` shared by the HTML-based adapters.

use scraper::{ElementRef, Html, Selector};

/// Parse a selector written in source. Panics only on a typo in a literal.
pub(crate) fn selector(css: &str) -> Selector {
    Selector::parse(css).unwrap_or_else(|e| panic!("invalid selector {css:?}: {e}"))
}

/// Non-empty, trimmed text nodes of an element, in document order.
pub(crate) fn lines(element: &ElementRef<'_>) -> Vec<String> {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(String::from)
        .collect()
}

/// All text of an element with whitespace runs collapsed.
pub(crate) fn text(element: &ElementRef<'_>) -> String {
    element.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// First line of text under the first match of `css`.
pub(crate) fn first_line(document: &Html, css: &str) -> Option<String> {
    let sel = selector(css);
    document
        .select(&sel)
        .next()
        .and_then(|el| lines(&el).into_iter().next())
}
