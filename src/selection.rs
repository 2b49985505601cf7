use std::fmt;
use std::sync::LazyLock;

use anyhow::{bail, Result};
use regex::Regex;

use crate::books;

static CHAPTER_SEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3})(?::(\d{1,3})(?:-(\d{1,3}))?)?$").unwrap());

static VERSE_SEL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{1,3}):(\d{1,3})(?::(\d{1,3})(?:-(\d{1,3}))?)?$").unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChapterRef {
    pub book: u32,
    pub chapter: u32,
}

impl fmt::Display for ChapterRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.book, self.chapter)
    }
}

/// Expand `40`, `40:24` or `40:1-5` into chapter refs.
///
/// A single `book:chapter` is taken as given; whole-book and range forms are
/// checked against the book's chapter count.
pub fn parse_chapters(sel: &str) -> Result<Vec<ChapterRef>> {
    let Some(caps) = CHAPTER_SEL_RE.captures(sel.trim()) else {
        bail!("Invalid chapter selector {:?} (expected BOOK, BOOK:CH or BOOK:CH-CH)", sel);
    };
    let book: u32 = caps[1].parse()?;
    let first = caps.get(2).map(|m| m.as_str().parse::<u32>()).transpose()?;
    let last = caps.get(3).map(|m| m.as_str().parse::<u32>()).transpose()?;

    if let (Some(chapter), None) = (first, last) {
        return Ok(vec![ChapterRef { book, chapter }]);
    }

    let Some(count) = books::chapter_count(book) else {
        bail!("Unknown book {} (expected 1-{})", book, books::BOOK_COUNT);
    };
    let (from, to) = match (first, last) {
        (Some(a), Some(b)) => (a, b),
        _ => (1, count),
    };
    if from == 0 || from > to || to > count {
        bail!(
            "Chapter range {}-{} out of bounds for {} ({} chapters)",
            from,
            to,
            books::display_name(book),
            count
        );
    }
    Ok((from..=to).map(|chapter| ChapterRef { book, chapter }).collect())
}

/// Parse several selectors, dropping duplicates while keeping first-seen order.
pub fn parse_all<S: AsRef<str>>(sels: &[S]) -> Result<Vec<ChapterRef>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for s in sels {
        for c in parse_chapters(s.as_ref())? {
            if seen.insert(c) {
                out.push(c);
            }
        }
    }
    Ok(out)
}

/// `book:chapter` with an optional `:verse` or `:verse-verse`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseSelector {
    pub chapter: ChapterRef,
    pub verses: Option<(u32, u32)>,
}

pub fn parse_verses(sel: &str) -> Result<VerseSelector> {
    let Some(caps) = VERSE_SEL_RE.captures(sel.trim()) else {
        bail!("Invalid verse selector {:?} (expected BOOK:CH[:V[-V]])", sel);
    };
    let chapter = ChapterRef {
        book: caps[1].parse()?,
        chapter: caps[2].parse()?,
    };
    let start = caps.get(3).map(|m| m.as_str().parse::<u32>()).transpose()?;
    let end = caps.get(4).map(|m| m.as_str().parse::<u32>()).transpose()?;
    let verses = match (start, end) {
        (Some(a), Some(b)) if a > b => bail!("Verse range {}-{} is reversed", a, b),
        (Some(a), Some(b)) => Some((a, b)),
        (Some(a), None) => Some((a, a)),
        _ => None,
    };
    Ok(VerseSelector { chapter, verses })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn c(book: u32, chapter: u32) -> ChapterRef {
        ChapterRef { book, chapter }
    }

    #[test]
    fn single_chapter() {
        assert_eq!(parse_chapters("40:24").unwrap(), vec![c(40, 24)]);
    }

    #[test]
    fn single_chapter_not_range_checked() {
        assert_eq!(parse_chapters("40:99").unwrap(), vec![c(40, 99)]);
    }

    #[test]
    fn whole_book() {
        let all = parse_chapters("41").unwrap();
        assert_eq!(all.len(), 16);
        assert_eq!(all[0], c(41, 1));
        assert_eq!(all[15], c(41, 16));
    }

    #[test]
    fn chapter_range() {
        assert_eq!(
            parse_chapters("1:3-5").unwrap(),
            vec![c(1, 3), c(1, 4), c(1, 5)]
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse_chapters("0").is_err());
        assert!(parse_chapters("67").is_err());
        assert!(parse_chapters("8:1-5").is_err());
        assert!(parse_chapters("1:5-3").is_err());
        assert!(parse_chapters("matthew").is_err());
        assert!(parse_chapters("40:").is_err());
    }

    #[test]
    fn parse_all_dedups() {
        let refs = parse_all(&["65", "65:1", "64:1"]).unwrap();
        assert_eq!(refs, vec![c(65, 1), c(64, 1)]);
    }

    #[test]
    fn verse_selectors() {
        let s = parse_verses("40:24").unwrap();
        assert_eq!(s.chapter, c(40, 24));
        assert_eq!(s.verses, None);

        assert_eq!(parse_verses("40:24:14").unwrap().verses, Some((14, 14)));
        assert_eq!(parse_verses("40:24:14-16").unwrap().verses, Some((14, 16)));
        assert!(parse_verses("40:24:16-14").is_err());
        assert!(parse_verses("40").is_err());
    }

    #[test]
    fn display() {
        assert_eq!(c(19, 119).to_string(), "19:119");
    }
}
