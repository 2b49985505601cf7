mod books;
mod db;
mod fetcher;
mod models;
mod parser;
mod pipeline;
mod selection;
mod settings;

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use parser::Extractor;
use settings::ExistingPolicy;

#[derive(Parser)]
#[command(name = "wol_study", about = "Study Bible notes and research-guide scraper")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create tables (and add note columns to an older verses table)
    Init,
    /// Load verse text from a verses.json export
    ImportVerses {
        file: PathBuf,
    },
    /// Scrape study content for chapters: BOOK, BOOK:CH or BOOK:CH-CH
    Scrape {
        #[arg(required = true)]
        selectors: Vec<String>,
        /// Skip chapters that already have study content
        #[arg(long)]
        missing_only: bool,
        /// What to do with study content that is already stored
        #[arg(long, value_enum)]
        existing: Option<ExistingPolicy>,
        /// Chapters fetched at once
        #[arg(short = 'j', long)]
        concurrency: Option<usize>,
    },
    /// Run extraction on a saved chapter page and print the result
    Extract {
        file: PathBuf,
        #[arg(long)]
        book: u32,
        #[arg(long)]
        chapter: u32,
    },
    /// Show stored study content: BOOK:CH[:V[-V]]
    Show {
        selector: String,
        /// Scrape the chapter first if nothing is stored for it
        #[arg(long)]
        fetch: bool,
    },
    /// Show store statistics
    Stats,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let settings = settings::load()?;

    let result = match cli.command {
        Commands::Init => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            println!("Schema ready at {:?}", settings.db_path);
            Ok(())
        }
        Commands::ImportVerses { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let verses: db::VersesFile = serde_json::from_str(&raw)
                .with_context(|| format!("Failed to parse {:?}", file))?;
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let inserted = db::import_verses(&conn, &verses)?;
            println!(
                "Inserted {} new verses ({} chapters in file)",
                inserted,
                verses.data.len()
            );
            Ok(())
        }
        Commands::Scrape {
            selectors,
            missing_only,
            existing,
            concurrency,
        } => {
            let chapters = selection::parse_all(&selectors)?;
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;

            let client = fetcher::build_client(&settings.user_agent)?;
            let opts = pipeline::RunOptions {
                concurrency: concurrency.unwrap_or(settings.concurrency),
                existing: existing.unwrap_or(settings.existing),
                missing_only,
            };
            println!("Scraping {} chapters...", chapters.len());
            let stats = pipeline::run_batch(
                &conn,
                client,
                Extractor::new(settings.origin.as_str()),
                chapters,
                &opts,
            )
            .await?;
            println!(
                "Done: {} chapters ({} new, {} replaced, {} kept, {} without study content, {} unavailable, {} failed), {} verses updated.",
                stats.total,
                stats.inserted,
                stats.replaced,
                stats.skipped,
                stats.no_record,
                stats.unavailable,
                stats.failed,
                stats.verses_updated,
            );
            Ok(())
        }
        Commands::Extract {
            file,
            book,
            chapter,
        } => {
            let html = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {:?}", file))?;
            let extraction = Extractor::new(settings.origin.as_str()).extract(&html, book, chapter);
            println!("{}", serde_json::to_string_pretty(&extraction)?);
            Ok(())
        }
        Commands::Show { selector, fetch } => {
            let sel = selection::parse_verses(&selector)?;
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            if fetch {
                let client = fetcher::build_client(&settings.user_agent)?;
                let extractor = Extractor::new(settings.origin.as_str());
                match pipeline::fetch_if_missing(
                    &conn,
                    &client,
                    &extractor,
                    sel.chapter,
                    settings.existing,
                )
                .await?
                {
                    Some(pipeline::ChapterOutcome::Unavailable(reason)) => {
                        println!("Could not fetch {}: {}", sel.chapter, reason)
                    }
                    Some(pipeline::ChapterOutcome::Failed(reason)) => {
                        println!("Could not store {}: {}", sel.chapter, reason)
                    }
                    Some(pipeline::ChapterOutcome::Stored(_)) | None => {}
                }
            }
            show(&conn, sel)
        }
        Commands::Stats => {
            let conn = db::connect(&settings.db_path)?;
            db::init_schema(&conn)?;
            let s = db::get_stats(&conn)?;
            println!("Verses:            {}", s.verses);
            println!("Verses with notes: {}", s.verses_with_notes);
            println!("Chapters studied:  {}", s.chapters);
            println!("Articles:          {}", s.articles);
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn show(conn: &rusqlite::Connection, sel: selection::VerseSelector) -> anyhow::Result<()> {
    let chapter = sel.chapter;
    println!(
        "{} {}",
        books::display_name(chapter.book),
        chapter.chapter
    );

    match db::fetch_chapter_study(conn, chapter.book, chapter.chapter)? {
        Some(study) => {
            if !study.outline.is_empty() {
                println!("\n--- Outline ---");
                for item in &study.outline {
                    println!("  - {}", item);
                }
            }
            if !study.articles.is_empty() {
                println!("\n--- Research guide ---");
                for a in &study.articles {
                    println!("  [{}] {}", a.kind.as_str(), a.title);
                    println!("      {}", a.url);
                }
            }
            if !study.cross_references.is_empty() {
                println!("\n--- Cross references ---");
                for c in &study.cross_references {
                    println!("  {}  {}", c.reference_label, c.url);
                }
            }
        }
        None => println!(
            "\nNo study content stored. Run 'scrape {}' or 'show --fetch' first.",
            chapter
        ),
    }

    let verses = db::fetch_verses(conn, chapter.book, chapter.chapter, sel.verses)?;
    if let Some((from, to)) = sel.verses {
        println!("\n--- {}:{}-{} ---", chapter, from, to);
        println!("{}", db::passage_text(&verses));
    }
    for v in verses.iter().filter(|v| v.study_notes.is_some()) {
        println!("\n--- {} {}:{} ---", v.book_name, v.chapter, v.verse_num);
        println!("{}", truncate(&v.verse_text, 100));
        for note in v.study_notes.iter().flatten() {
            for p in &note.paragraphs {
                println!("  * {}", p.text);
                for link in &p.links {
                    println!("      -> {} ({})", link.text, link.url);
                }
            }
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let truncated: String = s.chars().take(max).collect();
        format!("{}...", truncated)
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
