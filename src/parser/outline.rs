use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::dom::text_of;

static OUTLINE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.summaryOutline").unwrap());
static ITEM: LazyLock<Selector> = LazyLock::new(|| Selector::parse("li").unwrap());

/// Flattened outline entries across every outline block, in document order.
pub fn extract(landmark: ElementRef<'_>) -> Vec<String> {
    landmark
        .select(&OUTLINE)
        .flat_map(|block| block.select(&ITEM))
        .map(text_of)
        .filter(|t| !t.is_empty())
        .collect()
}
