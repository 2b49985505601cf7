pub mod articles;
pub mod cross_refs;
pub mod dom;
pub mod notes;
pub mod outline;

use std::sync::LazyLock;

use scraper::{Html, Selector};
use serde::Serialize;
use tracing::debug;

use crate::models::{ChapterStudyRecord, VerseStudyNotes};

pub const DEFAULT_ORIGIN: &str = "https://wol.jw.org";

static LANDMARK: LazyLock<Selector> = LazyLock::new(|| Selector::parse("#studyDiscover").unwrap());

/// Everything pulled out of one chapter page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Extraction {
    pub book_num: u32,
    pub chapter_num: u32,
    pub chapter: Option<ChapterStudyRecord>,
    pub verses: Vec<VerseStudyNotes>,
}

/// Turns a study-mode chapter page into study records. Holds only the site
/// origin used to absolutize links, so one instance serves every chapter.
#[derive(Debug, Clone)]
pub struct Extractor {
    origin: String,
}

impl Default for Extractor {
    fn default() -> Self {
        Self::new(DEFAULT_ORIGIN)
    }
}

impl Extractor {
    pub fn new(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        Self {
            origin: origin.trim_end_matches('/').to_string(),
        }
    }

    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Two independent passes: chapter content scoped to `#studyDiscover`
    /// (None when the landmark is missing), and verse notes over the whole
    /// document.
    pub fn extract(&self, html: &str, book: u32, chapter: u32) -> Extraction {
        let doc = Html::parse_document(html);

        let record = match doc.select(&LANDMARK).next() {
            Some(landmark) => Some(ChapterStudyRecord {
                book_num: book,
                chapter_num: chapter,
                outline: outline::extract(landmark),
                articles: articles::extract(landmark, &self.origin),
                cross_references: cross_refs::extract(landmark, &self.origin),
            }),
            None => {
                debug!("No #studyDiscover in {}:{}", book, chapter);
                None
            }
        };

        let verses = notes::extract(&doc, &self.origin, book, chapter);

        Extraction {
            book_num: book,
            chapter_num: chapter,
            chapter: record,
            verses,
        }
    }
}
