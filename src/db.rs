use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::books;
use crate::models::{ChapterStudyRecord, StudyNote, VerseStudyNotes};
use crate::parser::Extraction;
use crate::settings::ExistingPolicy;

pub fn connect(path: &Path) -> Result<Connection> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).with_context(|| format!("Failed to create {:?}", dir))?;
    }
    let conn = Connection::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    Ok(conn)
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS verses (
            book_num         INTEGER NOT NULL,
            book_name        TEXT NOT NULL,
            chapter          INTEGER NOT NULL,
            verse_num        INTEGER NOT NULL,
            verse_text       TEXT NOT NULL,
            study_notes      TEXT,
            notes_updated_at TEXT,
            UNIQUE(book_num, chapter, verse_num)
        );

        CREATE TABLE IF NOT EXISTS study_content (
            id               INTEGER PRIMARY KEY,
            book_num         INTEGER NOT NULL,
            chapter          INTEGER NOT NULL,
            outline          TEXT NOT NULL,
            study_articles   TEXT NOT NULL,
            cross_references TEXT NOT NULL,
            created_at       TEXT NOT NULL,
            UNIQUE(book_num, chapter)
        );
        ",
    )?;
    ensure_study_notes_column(conn)?;
    Ok(())
}

/// Add the note columns to a `verses` table created before they existed.
/// Returns true when anything was added.
pub fn ensure_study_notes_column(conn: &Connection) -> Result<bool> {
    let mut stmt = conn.prepare("SELECT name FROM pragma_table_info('verses')")?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<HashSet<_>, _>>()?;

    let mut added = false;
    for column in ["study_notes", "notes_updated_at"] {
        if !columns.contains(column) {
            conn.execute_batch(&format!("ALTER TABLE verses ADD COLUMN {} TEXT", column))?;
            added = true;
        }
    }
    Ok(added)
}

// ── Verses ──

/// `verses.json`: `{"data": [{"book": 1, "chapter": 1, "verses": {"1": "..."}}]}`
#[derive(Debug, Deserialize)]
pub struct VersesFile {
    pub data: Vec<ChapterVerses>,
}

#[derive(Debug, Deserialize)]
pub struct ChapterVerses {
    pub book: u32,
    pub chapter: u32,
    pub verses: BTreeMap<String, String>,
}

/// Insert verse text, leaving rows that already exist alone.
pub fn import_verses(conn: &Connection, file: &VersesFile) -> Result<usize> {
    let tx = conn.unchecked_transaction()?;
    let mut count = 0;
    {
        let mut stmt = tx.prepare(
            "INSERT OR IGNORE INTO verses (book_num, book_name, chapter, verse_num, verse_text)
             VALUES (?1, ?2, ?3, ?4, ?5)",
        )?;
        for ch in &file.data {
            let book_name = books::display_name(ch.book);
            for (verse, text) in &ch.verses {
                let Ok(verse_num) = verse.trim().parse::<u32>() else {
                    warn!("Skipping verse {:?} in {}:{}", verse, ch.book, ch.chapter);
                    continue;
                };
                count += stmt.execute(rusqlite::params![
                    ch.book, book_name, ch.chapter, verse_num, text,
                ])?;
            }
        }
    }
    tx.commit()?;
    Ok(count)
}

pub struct VerseRow {
    pub book_name: String,
    pub chapter: u32,
    pub verse_num: u32,
    pub verse_text: String,
    pub study_notes: Option<Vec<StudyNote>>,
}

/// Verses of a chapter in order, optionally limited to an inclusive range.
pub fn fetch_verses(
    conn: &Connection,
    book: u32,
    chapter: u32,
    range: Option<(u32, u32)>,
) -> Result<Vec<VerseRow>> {
    let (from, to) = range.unwrap_or((0, u32::MAX));
    let mut stmt = conn.prepare(
        "SELECT book_num, book_name, chapter, verse_num, verse_text, study_notes
         FROM verses
         WHERE book_num = ?1 AND chapter = ?2 AND verse_num BETWEEN ?3 AND ?4
         ORDER BY verse_num",
    )?;
    let raw = stmt
        .query_map(rusqlite::params![book, chapter, from, to], |row| {
            Ok((
                row.get::<_, u32>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, u32>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, Option<String>>(5)?,
            ))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    raw.into_iter()
        .map(|(book_num, book_name, chapter, verse_num, verse_text, notes)| {
            let study_notes = notes
                .map(|s| serde_json::from_str(&s))
                .transpose()
                .with_context(|| format!("Bad study_notes for {}:{}:{}", book_num, chapter, verse_num))?;
            Ok(VerseRow {
                book_name,
                chapter,
                verse_num,
                verse_text,
                study_notes,
            })
        })
        .collect()
}

/// Verse text of a range read as one passage.
pub fn passage_text(rows: &[VerseRow]) -> String {
    rows.iter()
        .map(|r| r.verse_text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Store notes on the matching verse row. Update-only: a verse that is not
/// loaded yet affects zero rows and is not an error.
pub fn attach_verse_notes(conn: &Connection, notes: &VerseStudyNotes) -> Result<usize> {
    let json = serde_json::to_string(&notes.notes)?;
    let n = conn.execute(
        "UPDATE verses SET study_notes = ?1, notes_updated_at = ?2
         WHERE book_num = ?3 AND chapter = ?4 AND verse_num = ?5",
        rusqlite::params![
            json,
            Utc::now().to_rfc3339(),
            notes.book_num,
            notes.chapter_num,
            notes.verse_num,
        ],
    )?;
    Ok(n)
}

// ── Study content ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    Inserted,
    Replaced,
    Skipped,
}

pub fn chapter_study_exists(conn: &Connection, book: u32, chapter: u32) -> Result<bool> {
    let found = conn
        .query_row(
            "SELECT 1 FROM study_content WHERE book_num = ?1 AND chapter = ?2",
            rusqlite::params![book, chapter],
            |_| Ok(()),
        )
        .optional()?;
    Ok(found.is_some())
}

pub fn upsert_chapter_study(
    conn: &Connection,
    record: &ChapterStudyRecord,
    policy: ExistingPolicy,
) -> Result<WriteOutcome> {
    let exists = chapter_study_exists(conn, record.book_num, record.chapter_num)?;
    if exists && policy == ExistingPolicy::Skip {
        return Ok(WriteOutcome::Skipped);
    }

    conn.execute(
        "INSERT INTO study_content
         (book_num, chapter, outline, study_articles, cross_references, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT(book_num, chapter) DO UPDATE SET
            outline = excluded.outline,
            study_articles = excluded.study_articles,
            cross_references = excluded.cross_references,
            created_at = excluded.created_at",
        rusqlite::params![
            record.book_num,
            record.chapter_num,
            serde_json::to_string(&record.outline)?,
            serde_json::to_string(&record.articles)?,
            serde_json::to_string(&record.cross_references)?,
            Utc::now().to_rfc3339(),
        ],
    )?;

    Ok(if exists {
        WriteOutcome::Replaced
    } else {
        WriteOutcome::Inserted
    })
}

pub fn fetch_chapter_study(
    conn: &Connection,
    book: u32,
    chapter: u32,
) -> Result<Option<ChapterStudyRecord>> {
    let row = conn
        .query_row(
            "SELECT outline, study_articles, cross_references
             FROM study_content WHERE book_num = ?1 AND chapter = ?2",
            rusqlite::params![book, chapter],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )
        .optional()?;

    let Some((outline, articles, cross_references)) = row else {
        return Ok(None);
    };
    let ctx = || format!("Bad study_content row for {}:{}", book, chapter);
    Ok(Some(ChapterStudyRecord {
        book_num: book,
        chapter_num: chapter,
        outline: serde_json::from_str(&outline).with_context(ctx)?,
        articles: serde_json::from_str(&articles).with_context(ctx)?,
        cross_references: serde_json::from_str(&cross_references).with_context(ctx)?,
    }))
}

/// (book, chapter) pairs that already have study content.
pub fn chapters_with_study(conn: &Connection) -> Result<HashSet<(u32, u32)>> {
    let mut stmt = conn.prepare("SELECT book_num, chapter FROM study_content")?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<HashSet<_>, _>>()?;
    Ok(rows)
}

// ── Extraction results ──

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SaveCounts {
    /// None when the page had no chapter-level content.
    pub chapter: Option<WriteOutcome>,
    pub articles: usize,
    pub notes_found: usize,
    pub verses_updated: usize,
}

/// Drop stored verse notes for a chapter. Returns verses cleared.
pub fn clear_chapter_notes(conn: &Connection, book: u32, chapter: u32) -> Result<usize> {
    let n = conn.execute(
        "UPDATE verses SET study_notes = NULL, notes_updated_at = NULL
         WHERE book_num = ?1 AND chapter = ?2 AND study_notes IS NOT NULL",
        rusqlite::params![book, chapter],
    )?;
    Ok(n)
}

pub fn delete_chapter_study(conn: &Connection, book: u32, chapter: u32) -> Result<bool> {
    let n = conn.execute(
        "DELETE FROM study_content WHERE book_num = ?1 AND chapter = ?2",
        rusqlite::params![book, chapter],
    )?;
    Ok(n > 0)
}

/// Persist one chapter's extraction in a single transaction.
///
/// Under `Overwrite` the chapter ends up holding exactly what the page had:
/// notes on verses the page no longer annotates are cleared, and a page
/// without the study landmark removes the stored chapter record.
pub fn save_extraction(
    conn: &Connection,
    extraction: &Extraction,
    policy: ExistingPolicy,
) -> Result<SaveCounts> {
    let (book, chapter_num) = (extraction.book_num, extraction.chapter_num);
    let tx = conn.unchecked_transaction()?;

    if policy == ExistingPolicy::Overwrite {
        let cleared = clear_chapter_notes(&tx, book, chapter_num)?;
        let removed = extraction.chapter.is_none() && delete_chapter_study(&tx, book, chapter_num)?;
        debug!(
            "{}:{} overwrite: {} verse notes cleared, chapter record removed: {}",
            book, chapter_num, cleared, removed
        );
    }

    let chapter = extraction
        .chapter
        .as_ref()
        .map(|record| upsert_chapter_study(&tx, record, policy))
        .transpose()?;

    let mut verses_updated = 0;
    for verse in &extraction.verses {
        verses_updated += attach_verse_notes(&tx, verse)?;
    }
    tx.commit()?;

    Ok(SaveCounts {
        chapter,
        articles: extraction.chapter.as_ref().map_or(0, |c| c.articles.len()),
        notes_found: extraction.verses.len(),
        verses_updated,
    })
}

// ── Stats ──

pub struct Stats {
    pub verses: usize,
    pub verses_with_notes: usize,
    pub chapters: usize,
    pub articles: usize,
}

pub fn get_stats(conn: &Connection) -> Result<Stats> {
    let verses: usize = conn.query_row("SELECT COUNT(*) FROM verses", [], |r| r.get(0))?;
    let verses_with_notes: usize = conn.query_row(
        "SELECT COUNT(*) FROM verses WHERE study_notes IS NOT NULL",
        [],
        |r| r.get(0),
    )?;
    let chapters: usize =
        conn.query_row("SELECT COUNT(*) FROM study_content", [], |r| r.get(0))?;
    let articles: usize = conn.query_row(
        "SELECT COALESCE(SUM(json_array_length(study_articles)), 0) FROM study_content",
        [],
        |r| r.get(0),
    )?;
    Ok(Stats {
        verses,
        verses_with_notes,
        chapters,
        articles,
    })
}
