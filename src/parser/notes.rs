use std::str::FromStr;
use std::sync::LazyLock;

use scraper::{Html, Selector};
use thiserror::Error;
use tracing::debug;

use super::dom;
use crate::models::{NoteLink, NoteParagraph, StudyNote, VerseStudyNotes};

static SECTION: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.section[data-key]").unwrap());
static NOTE_GROUP: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("div.studyNoteGroup").unwrap());
static NOTE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("li.item.studyNote").unwrap());
static PARAGRAPH: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// A section's `data-key`, e.g. `40-24-14`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseKey {
    pub book: u32,
    pub chapter: u32,
    pub verse: u32,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeyError {
    #[error("expected book-chapter-verse, got {0:?}")]
    TooFewParts(String),
    #[error("non-numeric part {part:?} in {key:?}")]
    NotNumeric { key: String, part: String },
}

impl FromStr for VerseKey {
    type Err = KeyError;

    fn from_str(key: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = key.split('-').collect();
        if parts.len() < 3 {
            return Err(KeyError::TooFewParts(key.to_string()));
        }
        let num = |part: &str| {
            part.trim().parse::<u32>().map_err(|_| KeyError::NotNumeric {
                key: key.to_string(),
                part: part.to_string(),
            })
        };
        Ok(VerseKey {
            book: num(parts[0])?,
            chapter: num(parts[1])?,
            verse: num(parts[2])?,
        })
    }
}

/// Study notes for every verse section of the requested chapter, scanning the
/// whole document. Sections keyed to other chapters are ignored.
pub fn extract(doc: &Html, origin: &str, book: u32, chapter: u32) -> Vec<VerseStudyNotes> {
    let mut verses = Vec::new();

    for section in doc.select(&SECTION) {
        let raw = section.value().attr("data-key").unwrap_or("");
        let key = match raw.parse::<VerseKey>() {
            Ok(k) => k,
            Err(e) => {
                debug!("Skipping section: {}", e);
                continue;
            }
        };
        if key.book != book || key.chapter != chapter {
            continue;
        }

        let notes: Vec<StudyNote> = section
            .select(&NOTE_GROUP)
            .flat_map(|group| group.select(&NOTE))
            .filter_map(|note| {
                let paragraphs: Vec<NoteParagraph> = note
                    .select(&PARAGRAPH)
                    .filter_map(|p| {
                        let text = dom::text_of(p);
                        if text.is_empty() {
                            return None;
                        }
                        let links = dom::links(p, origin)
                            .map(|(text, url)| NoteLink { text, url })
                            .collect();
                        Some(NoteParagraph { text, links })
                    })
                    .collect();
                (!paragraphs.is_empty()).then_some(StudyNote { paragraphs })
            })
            .collect();

        if notes.is_empty() {
            continue;
        }
        verses.push(VerseStudyNotes {
            book_num: key.book,
            chapter_num: key.chapter,
            verse_num: key.verse,
            notes,
        });
    }

    verses
}

#[cfg(test)]
mod tests {
    use super::*;

    const ORIGIN: &str = "https://wol.jw.org";

    fn section(key: &str, body: &str) -> String {
        format!(
            r#"<div class="section" data-key="{}"><div class="studyNoteGroup"><ul>{}</ul></div></div>"#,
            key, body
        )
    }

    #[test]
    fn parse_key() {
        let k: VerseKey = "40-24-14".parse().unwrap();
        assert_eq!(k, VerseKey { book: 40, chapter: 24, verse: 14 });
    }

    #[test]
    fn parse_key_extra_parts_ignored() {
        let k: VerseKey = "1-1-1-2".parse().unwrap();
        assert_eq!(k.verse, 1);
    }

    #[test]
    fn parse_key_errors() {
        assert_eq!(
            "40-24".parse::<VerseKey>(),
            Err(KeyError::TooFewParts("40-24".into()))
        );
        assert!(matches!(
            "40-x-3".parse::<VerseKey>(),
            Err(KeyError::NotNumeric { part, .. }) if part == "x"
        ));
        assert!("".parse::<VerseKey>().is_err());
        assert!("40--3".parse::<VerseKey>().is_err());
    }

    #[test]
    fn only_requested_chapter() {
        let html = format!(
            "{}{}",
            section("40-24-14", r#"<li class="item studyNote"><p>In chapter.</p></li>"#),
            section("40-25-1", r#"<li class="item studyNote"><p>Other chapter.</p></li>"#),
        );
        let doc = Html::parse_document(&html);

        let hits = extract(&doc, ORIGIN, 40, 24);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].verse_num, 14);

        assert!(extract(&doc, ORIGIN, 41, 24).is_empty());
    }

    #[test]
    fn malformed_key_does_not_stop_scan() {
        let html = format!(
            "{}{}",
            section("40-abc-1", r#"<li class="item studyNote"><p>Bad.</p></li>"#),
            section("40-24-2", r#"<li class="item studyNote"><p>Good.</p></li>"#),
        );
        let doc = Html::parse_document(&html);
        let hits = extract(&doc, ORIGIN, 40, 24);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].verse_num, 2);
    }

    #[test]
    fn empty_notes_and_sections_dropped() {
        let html = format!(
            "{}{}",
            section("40-24-1", r#"<li class="item studyNote"><p>  </p></li>"#),
            section(
                "40-24-2",
                r#"<li class="item studyNote"><p> </p></li><li class="item studyNote"><p>Kept.</p></li>"#
            ),
        );
        let doc = Html::parse_document(&html);
        let hits = extract(&doc, ORIGIN, 40, 24);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].verse_num, 2);
        assert_eq!(hits[0].notes.len(), 1);
        assert_eq!(hits[0].notes[0].paragraphs[0].text, "Kept.");
    }

    #[test]
    fn paragraph_links_absolutized() {
        let html = section(
            "40-24-14",
            r#"<li class="item studyNote"><p>See <a href="/en/wol/bc/1">Mr 13:10</a> and <a href="https://x.org/y">here</a>.</p></li>"#,
        );
        let doc = Html::parse_document(&html);
        let hits = extract(&doc, ORIGIN, 40, 24);
        let p = &hits[0].notes[0].paragraphs[0];
        assert_eq!(p.text, "See Mr 13:10 and here.");
        assert_eq!(
            p.links,
            vec![
                NoteLink {
                    text: "Mr 13:10".into(),
                    url: "https://wol.jw.org/en/wol/bc/1".into()
                },
                NoteLink {
                    text: "here".into(),
                    url: "https://x.org/y".into()
                },
            ]
        );
    }

    #[test]
    fn notes_outside_group_ignored() {
        let html = r#"<div class="section" data-key="40-24-3"><ul><li class="item studyNote"><p>Loose.</p></li></ul></div>"#;
        let doc = Html::parse_document(html);
        assert!(extract(&doc, ORIGIN, 40, 24).is_empty());
    }
}
