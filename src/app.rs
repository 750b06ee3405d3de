mod dispatch;

use ratatui::widgets::ListState;
use std::collections::VecDeque;

use crate::backend::bookmarks::{Bookmark, BookmarkStore};
use crate::backend::cover::CoverChain;
use crate::backend::mangadex::{CatalogClient, FeedOrigin};
use crate::error::AppError;
use crate::ui::adapter::{CatalogEntry, ChapterEntry, parse_chapter};

#[derive(Clone, Copy, PartialEq, Eq, Default, Debug)]
pub enum Focus {
    #[default]
    Search,
    Manga,
    Chapters,
    Bookmarks,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Focus::Search => Focus::Manga,
            Focus::Manga => Focus::Chapters,
            Focus::Chapters => Focus::Bookmarks,
            Focus::Bookmarks => Focus::Search,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            Focus::Search => Focus::Bookmarks,
            Focus::Manga => Focus::Search,
            Focus::Chapters => Focus::Manga,
            Focus::Bookmarks => Focus::Chapters,
        }
    }
}

/// The manga (and optionally chapter) the user is looking at.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub manga_id: String,
    pub title: String,
    pub chapter: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notice {
    pub title: String,
    pub message: String,
}

pub struct App {
    pub focus: Focus,
    pub search_query: String,
    pub searching: bool,
    pub manga_list: Vec<CatalogEntry>,
    pub manga_state: ListState,
    pub chapter_list: Vec<ChapterEntry>,
    pub chapter_state: ListState,
    pub latest_chapter: Option<f64>,
    pub bookmarks: Vec<Bookmark>,
    pub bookmark_state: ListState,
    pub selected: Selection,
    pub cover: CoverChain,
    pub status: String,
    notices: VecDeque<Notice>,
    pub pending_delete: Option<Bookmark>,
    client: CatalogClient,
    store: Option<BookmarkStore>,
}

impl App {
    /// `store` is `None` when the database could not be opened; bookmark
    /// actions then fail with `StorageUnavailable`.
    pub fn new(client: CatalogClient, store: Option<BookmarkStore>) -> Self {
        Self {
            focus: Focus::Search,
            search_query: String::new(),
            searching: false,
            manga_list: Vec::new(),
            manga_state: ListState::default(),
            chapter_list: Vec::new(),
            chapter_state: ListState::default(),
            latest_chapter: None,
            bookmarks: Vec::new(),
            bookmark_state: ListState::default(),
            selected: Selection::default(),
            cover: CoverChain::default(),
            status: String::new(),
            notices: VecDeque::new(),
            pending_delete: None,
            client,
            store,
        }
    }

    pub fn report(&mut self, err: AppError) {
        log::warn!("{}: {}", err.title(), err);
        self.notices.push_back(Notice {
            title: err.title().to_string(),
            message: err.to_string(),
        });
    }

    /// Oldest notice the user has not dismissed yet.
    pub fn notice(&self) -> Option<&Notice> {
        self.notices.front()
    }

    pub fn dismiss_notice(&mut self) {
        self.notices.pop_front();
    }

    fn store(&self) -> Result<&BookmarkStore, AppError> {
        self.store.as_ref().ok_or_else(|| {
            AppError::StorageUnavailable("bookmark database is not open".to_string())
        })
    }

    pub fn bookmark(&self, manga_id: &str) -> Option<&Bookmark> {
        self.bookmarks.iter().find(|b| b.manga_id == manga_id)
    }

    pub async fn reload_bookmarks(&mut self) -> Result<(), AppError> {
        let bookmarks = self.store()?.load_all().await?;
        log::debug!("loaded {} bookmarks", bookmarks.len());
        self.bookmarks = bookmarks;
        reset_selection(&mut self.bookmark_state, self.bookmarks.len());
        Ok(())
    }

    pub fn search(&mut self) -> Result<(), AppError> {
        self.client.search_manga(&self.search_query)?;
        self.searching = true;
        Ok(())
    }

    pub fn open_selected_manga(&mut self) {
        let Some(entry) = self
            .manga_state
            .selected()
            .and_then(|i| self.manga_list.get(i))
            .cloned()
        else {
            return;
        };
        self.open_manga(&entry.manga_id, &entry.title, FeedOrigin::Catalog);
    }

    pub fn open_selected_bookmark(&mut self) {
        let Some(bookmark) = self
            .bookmark_state
            .selected()
            .and_then(|i| self.bookmarks.get(i))
            .cloned()
        else {
            return;
        };
        self.open_manga(&bookmark.manga_id, &bookmark.title, FeedOrigin::Bookmark);
    }

    fn open_manga(&mut self, manga_id: &str, title: &str, origin: FeedOrigin) {
        self.selected = Selection {
            manga_id: manga_id.to_string(),
            title: title.to_string(),
            chapter: None,
        };
        self.status = format!("Loading chapters for {title}...");
        self.client.fetch_chapter_feed(manga_id, title, origin);
        self.cover.start(manga_id);
        self.client.fetch_cover_chain(manga_id);
    }

    pub fn select_chapter(&mut self) {
        let Some(entry) = self
            .chapter_state
            .selected()
            .and_then(|i| self.chapter_list.get(i))
        else {
            return;
        };
        log::debug!(
            "selected chapter {} (volume {:?})",
            entry.chapter_id,
            entry.volume
        );
        self.selected.chapter = entry.chapter.as_deref().and_then(parse_chapter);
        self.status = match self.selected.chapter {
            Some(chapter) => format!("Selected: {}, Ch. {}", self.selected.title, chapter),
            None => format!("Selected: {}, chapter has no number", self.selected.title),
        };
    }

    /// Stores the current selection as the last-read bookmark for its manga.
    pub async fn mark_last_read(&mut self) -> Result<(), AppError> {
        let Some(chapter) = self.selected.chapter else {
            return Err(AppError::NoChapterSelected);
        };
        let bookmark = Bookmark {
            manga_id: self.selected.manga_id.clone(),
            title: self.selected.title.clone(),
            chapter,
        };
        self.store()?.upsert(&bookmark).await?;
        log::info!(
            "saved bookmark: {} chapter {}",
            bookmark.title,
            bookmark.chapter
        );
        self.status = format!("Saved: {}, Ch. {}", bookmark.title, bookmark.chapter);
        self.reload_bookmarks().await
    }

    pub fn request_delete(&mut self) -> Result<(), AppError> {
        let bookmark = self
            .bookmark_state
            .selected()
            .and_then(|i| self.bookmarks.get(i))
            .cloned()
            .ok_or(AppError::NoBookmarkSelected)?;
        self.pending_delete = Some(bookmark);
        Ok(())
    }

    pub async fn confirm_delete(&mut self, confirmed: bool) -> Result<(), AppError> {
        let Some(bookmark) = self.pending_delete.take() else {
            return Ok(());
        };
        if !confirmed {
            return Ok(());
        }
        self.store()?.delete(&bookmark.manga_id).await?;
        log::info!("deleted bookmark: {}", bookmark.title);
        self.status = format!("Deleted bookmark for {}", bookmark.title);
        self.reload_bookmarks().await
    }

    pub fn move_selection(&mut self, delta: isize) {
        match self.focus {
            Focus::Search => {}
            Focus::Manga => step(&mut self.manga_state, self.manga_list.len(), delta),
            Focus::Chapters => step(&mut self.chapter_state, self.chapter_list.len(), delta),
            Focus::Bookmarks => step(&mut self.bookmark_state, self.bookmarks.len(), delta),
        }
    }

    pub fn highlighted_manga(&self) -> Option<&CatalogEntry> {
        self.manga_state.selected().and_then(|i| self.manga_list.get(i))
    }
}

fn reset_selection(state: &mut ListState, len: usize) {
    state.select(if len == 0 { None } else { Some(0) });
}

fn step(state: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let next = (current + delta).clamp(0, len as isize - 1);
    state.select(Some(next as usize));
}
