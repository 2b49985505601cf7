use std::sync::Arc;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};
use rusqlite::Connection;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

use crate::db::{self, SaveCounts, WriteOutcome};
use crate::fetcher::{self, FetchError};
use crate::parser::{Extraction, Extractor};
use crate::selection::ChapterRef;
use crate::settings::ExistingPolicy;

pub struct RunOptions {
    pub concurrency: usize,
    pub existing: ExistingPolicy,
    pub missing_only: bool,
}

#[derive(Debug)]
pub enum ChapterOutcome {
    Stored(SaveCounts),
    Unavailable(String),
    Failed(String),
}

/// Totals for a batch run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: usize,
    pub inserted: usize,
    pub replaced: usize,
    pub skipped: usize,
    pub no_record: usize,
    pub verses_updated: usize,
    pub unavailable: usize,
    pub failed: usize,
}

impl RunStats {
    pub fn record(&mut self, outcome: &ChapterOutcome) {
        match outcome {
            ChapterOutcome::Stored(c) => {
                match c.chapter {
                    Some(WriteOutcome::Inserted) => self.inserted += 1,
                    Some(WriteOutcome::Replaced) => self.replaced += 1,
                    Some(WriteOutcome::Skipped) => self.skipped += 1,
                    None => self.no_record += 1,
                }
                self.verses_updated += c.verses_updated;
            }
            ChapterOutcome::Unavailable(_) => self.unavailable += 1,
            ChapterOutcome::Failed(_) => self.failed += 1,
        }
    }
}

/// Fetch and extract one chapter. Runs off the connection-owning task.
pub async fn fetch_and_extract(
    client: &reqwest::Client,
    extractor: &Extractor,
    chapter: ChapterRef,
) -> Result<Extraction, FetchError> {
    let html =
        fetcher::fetch_chapter(client, extractor.origin(), chapter.book, chapter.chapter).await?;
    Ok(extractor.extract(&html, chapter.book, chapter.chapter))
}

/// Persist one chapter's result and turn every failure into an outcome.
pub fn process_chapter(
    conn: &Connection,
    existing: ExistingPolicy,
    chapter: ChapterRef,
    fetched: Result<Extraction, FetchError>,
) -> ChapterOutcome {
    let extraction = match fetched {
        Ok(e) => e,
        Err(e) => {
            warn!("{} unavailable: {}", chapter, e);
            return ChapterOutcome::Unavailable(e.to_string());
        }
    };

    match db::save_extraction(conn, &extraction, existing) {
        Ok(counts) => {
            debug!(
                "{}: chapter {:?}, {} articles, {} verse notes ({} verses updated)",
                chapter, counts.chapter, counts.articles, counts.notes_found, counts.verses_updated
            );
            ChapterOutcome::Stored(counts)
        }
        Err(e) => {
            warn!("{} failed to save: {:#}", chapter, e);
            ChapterOutcome::Failed(format!("{:#}", e))
        }
    }
}

/// Scrape one chapter only when no study content is stored for it yet.
/// Returns None when it was already there.
pub async fn fetch_if_missing(
    conn: &Connection,
    client: &reqwest::Client,
    extractor: &Extractor,
    chapter: ChapterRef,
    existing: ExistingPolicy,
) -> Result<Option<ChapterOutcome>> {
    if db::chapter_study_exists(conn, chapter.book, chapter.chapter)? {
        return Ok(None);
    }
    info!("{} has no study content, fetching", chapter);
    let fetched = fetch_and_extract(client, extractor, chapter).await;
    Ok(Some(process_chapter(conn, existing, chapter, fetched)))
}

/// Scrape chapters with bounded concurrency, saving each result on this task
/// as it arrives. One chapter failing never stops the batch.
pub async fn run_batch(
    conn: &Connection,
    client: reqwest::Client,
    extractor: Extractor,
    chapters: Vec<ChapterRef>,
    opts: &RunOptions,
) -> Result<RunStats> {
    let chapters = if opts.missing_only {
        let done = db::chapters_with_study(conn)?;
        let before = chapters.len();
        let remaining: Vec<_> = chapters
            .into_iter()
            .filter(|c| !done.contains(&(c.book, c.chapter)))
            .collect();
        info!("{} of {} chapters already have study content", before - remaining.len(), before);
        remaining
    } else {
        chapters
    };

    let total = chapters.len();
    let mut stats = RunStats {
        total,
        ..Default::default()
    };
    if total == 0 {
        return Ok(stats);
    }

    // More workers than chapters buys nothing.
    let concurrency = opts.concurrency.clamp(1, total);
    let client = Arc::new(client);
    let extractor = Arc::new(extractor);
    let semaphore = Arc::new(Semaphore::new(concurrency));

    let pb = ProgressBar::new(total as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta}) {msg}")?
            .progress_chars("=> "),
    );

    let (tx, mut rx) =
        tokio::sync::mpsc::channel::<(ChapterRef, Result<Extraction, FetchError>)>(concurrency * 2);

    for chapter in chapters {
        let client = Arc::clone(&client);
        let extractor = Arc::clone(&extractor);
        let sem = Arc::clone(&semaphore);
        let tx = tx.clone();

        tokio::spawn(async move {
            let Ok(_permit) = sem.acquire().await else {
                return;
            };
            let result = fetch_and_extract(&client, &extractor, chapter).await;
            let _ = tx.send((chapter, result)).await;
        });
    }

    // rx closes once every task has sent or died
    drop(tx);

    let mut received = 0usize;
    while let Some((chapter, result)) = rx.recv().await {
        received += 1;
        let outcome = process_chapter(conn, opts.existing, chapter, result);
        stats.record(&outcome);
        pb.set_message(chapter.to_string());
        pb.inc(1);
    }
    pb.finish_and_clear();

    // A task that panicked never reported back.
    if received < total {
        warn!("{} chapters produced no result", total - received);
        stats.failed += total - received;
    }

    info!(
        "Scraped {} chapters: {} inserted, {} replaced, {} kept, {} without study content, {} unavailable, {} failed; {} verses updated",
        stats.total,
        stats.inserted,
        stats.replaced,
        stats.skipped,
        stats.no_record,
        stats.unavailable,
        stats.failed,
        stats.verses_updated,
    );
    Ok(stats)
}
