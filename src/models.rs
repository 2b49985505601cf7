use serde::{Deserialize, Serialize};

/// Chapter-level study content, one per (book, chapter).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterStudyRecord {
    pub book_num: u32,
    pub chapter_num: u32,
    pub outline: Vec<String>,
    #[serde(rename = "study_articles")]
    pub articles: Vec<ArticleRef>,
    pub cross_references: Vec<CrossRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArticleRef {
    pub title: String,
    pub url: String,
    #[serde(rename = "type")]
    pub kind: ArticleType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArticleType {
    Watchtower,
    Awake,
    StudyArticle,
    Publication,
    Other,
}

impl ArticleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ArticleType::Watchtower => "watchtower",
            ArticleType::Awake => "awake",
            ArticleType::StudyArticle => "study_article",
            ArticleType::Publication => "publication",
            ArticleType::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrossRef {
    #[serde(rename = "reference")]
    pub reference_label: String,
    pub url: String,
}

/// Study notes for a single verse. Attached to an existing verse row, never
/// creates one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerseStudyNotes {
    pub book_num: u32,
    pub chapter_num: u32,
    pub verse_num: u32,
    #[serde(rename = "study_notes")]
    pub notes: Vec<StudyNote>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudyNote {
    #[serde(rename = "content")]
    pub paragraphs: Vec<NoteParagraph>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteParagraph {
    pub text: String,
    pub links: Vec<NoteLink>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteLink {
    pub text: String,
    pub url: String,
}
