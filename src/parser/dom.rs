use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

static LINK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a[href]").unwrap());

/// Concatenated descendant text, trimmed at both ends.
pub fn text_of(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Rewrite site-relative hrefs (`/...`) against `origin`. Anything else passes
/// through unchanged.
pub fn absolutize(origin: &str, href: &str) -> String {
    if href.starts_with('/') {
        format!("{}{}", origin, href)
    } else {
        href.to_string()
    }
}

/// Every hyperlink under `scope` with a non-empty href and non-empty text, as
/// `(text, absolute url)` in document order.
pub fn links<'a>(
    scope: ElementRef<'a>,
    origin: &'a str,
) -> impl Iterator<Item = (String, String)> + 'a {
    scope.select(&LINK).filter_map(move |a| {
        let href = a.value().attr("href").unwrap_or("");
        let text = text_of(a);
        if href.is_empty() || text.is_empty() {
            return None;
        }
        Some((text, absolutize(origin, href)))
    })
}
