use std::sync::LazyLock;

use scraper::{ElementRef, Selector};

use super::dom;
use crate::models::CrossRef;

static CROSS_REF_BLOCK: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.crossReferences, div.references").unwrap());

pub fn extract(landmark: ElementRef<'_>, origin: &str) -> Vec<CrossRef> {
    landmark
        .select(&CROSS_REF_BLOCK)
        .flat_map(|block| dom::links(block, origin))
        .map(|(reference_label, url)| CrossRef {
            reference_label,
            url,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use scraper::Html;

    #[test]
    fn both_block_kinds_in_order() {
        let doc = Html::parse_document(
            r#"<div class="references"><a href="/a">Ge 1:1</a></div>
               <div class="crossReferences"><a href="https://x.org/b">Joh 1:1</a><a href="/c"> </a></div>"#,
        );
        let refs = extract(doc.root_element(), "https://wol.jw.org");
        assert_eq!(
            refs,
            vec![
                CrossRef {
                    reference_label: "Ge 1:1".into(),
                    url: "https://wol.jw.org/a".into()
                },
                CrossRef {
                    reference_label: "Joh 1:1".into(),
                    url: "https://x.org/b".into()
                },
            ]
        );
    }

    #[test]
    fn none_present() {
        let doc = Html::parse_document(r#"<div class="section"><a href="/a">Ge 1:1</a></div>"#);
        assert!(extract(doc.root_element(), "https://wol.jw.org").is_empty());
    }
}
