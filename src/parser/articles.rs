use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::dom;
use crate::models::{ArticleRef, ArticleType};

static RESEARCH_GUIDE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.item.ref-rsg").unwrap());

/// Link text must be longer than this to count as an article title.
const MIN_TITLE_CHARS: usize = 3;

/// Research-guide article links under the landmark.
pub fn extract(landmark: ElementRef<'_>, origin: &str) -> Vec<ArticleRef> {
    landmark
        .select(&RESEARCH_GUIDE)
        .flat_map(|item| dom::links(item, origin))
        .filter(|(text, _)| text.chars().count() > MIN_TITLE_CHARS)
        .map(|(title, url)| {
            let kind = classify(&url, &title);
            ArticleRef { title, url, kind }
        })
        .collect()
}

/// Case-insensitive keyword match over url and title, first hit wins.
/// "publication" is only looked for in the url.
pub fn classify(url: &str, title: &str) -> ArticleType {
    let url = url.to_lowercase();
    let title = title.to_lowercase();
    let either = |kw: &str| url.contains(kw) || title.contains(kw);

    if either("watchtower") {
        ArticleType::Watchtower
    } else if either("awake") {
        ArticleType::Awake
    } else if either("study") {
        ArticleType::StudyArticle
    } else if url.contains("publication") {
        ArticleType::Publication
    } else {
        ArticleType::Other
    }
}
