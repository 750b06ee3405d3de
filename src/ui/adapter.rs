use std::collections::BTreeMap;

use crate::backend::bookmarks::Bookmark;
use crate::backend::mangadex::{ChapterData, MangaData};

const UNKNOWN_TITLE: &str = "Unknown Title";
const PREFERRED_TITLE_LANGUAGES: [&str; 3] = ["en", "ja-ro", "ja"];

/// One row of the search results list.
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogEntry {
    pub manga_id: String,
    pub title: String,
    pub year: Option<i64>,
    pub status: String,
}

impl CatalogEntry {
    pub fn detail(&self) -> String {
        let year = self.year.map(|y| y.to_string()).unwrap_or_else(|| "?".to_string());
        format!("Year: {}  Status: {}  ID: {}", year, self.status, self.manga_id)
    }
}

impl From<MangaData> for CatalogEntry {
    fn from(manga: MangaData) -> Self {
        CatalogEntry {
            title: pick_title(&manga.attributes.title),
            year: manga.attributes.year,
            status: manga.attributes.status.unwrap_or_else(|| "unknown".to_string()),
            manga_id: manga.id,
        }
    }
}

/// One row of the chapter list.
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterEntry {
    pub chapter_id: String,
    pub chapter: Option<String>,
    pub title: String,
    pub volume: Option<String>,
    pub pages: u32,
    pub language: String,
}

impl ChapterEntry {
    /// Chapter number, when the feed gave one that parses.
    pub fn number(&self) -> Option<f64> {
        self.chapter.as_deref().and_then(parse_chapter)
    }

    pub fn label(&self) -> String {
        let number = self.chapter.as_deref().filter(|c| !c.is_empty()).unwrap_or("?");
        let title = if self.title.is_empty() {
            String::new()
        } else {
            format!(" - {}", self.title)
        };
        format!("Ch. {}{} ({} pages) [{}]", number, title, self.pages, self.language)
    }
}

impl From<ChapterData> for ChapterEntry {
    fn from(chapter: ChapterData) -> Self {
        let attrs = chapter.attributes;
        ChapterEntry {
            chapter_id: chapter.id,
            chapter: attrs.chapter,
            title: attrs.title.unwrap_or_default(),
            volume: attrs.volume,
            pages: attrs.pages,
            language: attrs.translated_language.unwrap_or_default(),
        }
    }
}

/// Display title for a manga: English, then romanized Japanese, then
/// Japanese, then whatever non-empty title comes first.
pub fn pick_title(titles: &BTreeMap<String, String>) -> String {
    PREFERRED_TITLE_LANGUAGES
        .iter()
        .filter_map(|lang| titles.get(*lang))
        .chain(titles.values())
        .find(|title| !title.is_empty())
        .cloned()
        .unwrap_or_else(|| UNKNOWN_TITLE.to_string())
}

pub fn parse_chapter(raw: &str) -> Option<f64> {
    raw.trim().parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Highest parseable chapter number in the feed.
pub fn latest_chapter(entries: &[ChapterEntry]) -> Option<f64> {
    entries
        .iter()
        .filter_map(ChapterEntry::number)
        .fold(None, |max, n| match max {
            Some(m) if m >= n => Some(m),
            _ => Some(n),
        })
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Freshness {
    NewChapter { latest: f64 },
    UpToDate,
}

pub fn freshness(stored: f64, latest: Option<f64>) -> Freshness {
    match latest {
        Some(latest) if stored < latest => Freshness::NewChapter { latest },
        _ => Freshness::UpToDate,
    }
}

pub fn freshness_status(bookmark: &Bookmark, latest: Option<f64>) -> String {
    match freshness(bookmark.chapter, latest) {
        Freshness::NewChapter { latest } => format!(
            "Manga: {}, Last read: Ch. {}, New Chapter: Yes (Latest: Ch. {})",
            bookmark.title, bookmark.chapter, latest
        ),
        Freshness::UpToDate => format!(
            "Manga: {}, Last read: Ch. {}, New Chapter: No",
            bookmark.title, bookmark.chapter
        ),
    }
}

pub fn bookmark_label(bookmark: &Bookmark) -> String {
    format!("{} (Ch. {})", bookmark.title, bookmark.chapter)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn titles(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn chapter(number: &str) -> ChapterEntry {
        ChapterEntry {
            chapter_id: format!("ch-{number}"),
            chapter: Some(number.to_string()),
            title: String::new(),
            volume: None,
            pages: 20,
            language: "en".to_string(),
        }
    }

    #[test]
    fn english_title_wins() {
        assert_eq!(pick_title(&titles(&[("en", "Attack"), ("ja-ro", "Shingeki")])), "Attack");
    }

    #[test]
    fn empty_english_falls_through() {
        assert_eq!(pick_title(&titles(&[("ja", "X"), ("en", "")])), "X");
        assert_eq!(pick_title(&titles(&[("ja", "Kanji"), ("ja-ro", "Romaji")])), "Romaji");
        assert_eq!(pick_title(&titles(&[("ko", "Hangul"), ("zh", "")])), "Hangul");
    }

    #[test]
    fn unknown_only_without_any_title() {
        assert_eq!(pick_title(&titles(&[])), "Unknown Title");
        assert_eq!(pick_title(&titles(&[("en", ""), ("fr", "")])), "Unknown Title");
    }

    #[test]
    fn latest_chapter_ignores_unparseable() {
        let feed: Vec<_> = ["1", "2.5", "abc", "10"].into_iter().map(chapter).collect();
        assert_eq!(latest_chapter(&feed), Some(10.0));
        assert_eq!(latest_chapter(&[chapter("abc"), chapter("")]), None);
        assert_eq!(latest_chapter(&[]), None);
    }

    #[test]
    fn freshness_compares_against_latest() {
        assert_eq!(freshness(5.0, Some(10.0)), Freshness::NewChapter { latest: 10.0 });
        assert_eq!(freshness(10.0, Some(10.0)), Freshness::UpToDate);
        assert_eq!(freshness(3.0, None), Freshness::UpToDate);
    }

    #[test]
    fn status_and_labels() {
        let bookmark = Bookmark {
            manga_id: "m1".to_string(),
            title: "Berserk".to_string(),
            chapter: 5.0,
        };
        assert_eq!(
            freshness_status(&bookmark, Some(10.5)),
            "Manga: Berserk, Last read: Ch. 5, New Chapter: Yes (Latest: Ch. 10.5)"
        );
        assert_eq!(
            freshness_status(&bookmark, Some(5.0)),
            "Manga: Berserk, Last read: Ch. 5, New Chapter: No"
        );
        assert_eq!(bookmark_label(&bookmark), "Berserk (Ch. 5)");
    }

    #[test]
    fn chapter_label_formats() {
        let mut entry = chapter("12");
        entry.title = "The Eclipse".to_string();
        assert_eq!(entry.label(), "Ch. 12 - The Eclipse (20 pages) [en]");

        entry.chapter = None;
        entry.title.clear();
        assert_eq!(entry.label(), "Ch. ? (20 pages) [en]");
        assert_eq!(entry.number(), None);
    }
}
