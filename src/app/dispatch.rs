use serde::de::DeserializeOwned;

use super::{App, reset_selection};
use crate::backend::cover::CoverState;
use crate::backend::mangadex::{
    ChapterFeedResponse, Completion, CoverResponse, FeedOrigin, MangaDetailsResponse,
    MangaListResponse, PendingRequest, RequestTag,
};
use crate::error::AppError;
use crate::ui::adapter::{self, CatalogEntry, ChapterEntry};

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|e| AppError::malformed(body, &e))
}

impl App {
    /// Routes one finished request. The completion is consumed here, so its
    /// body and context are released once whichever branch runs.
    pub fn handle_completion(&mut self, completion: Completion) -> Result<(), AppError> {
        let Completion { request, outcome } = completion;
        log::debug!("completion #{} {:?}", request.id, request.tag);

        let body = match outcome {
            Ok(body) => body,
            Err(message) => {
                self.abandon(&request);
                return Err(AppError::Network(message));
            }
        };

        let routed = match request.tag {
            // Image bytes skip JSON decoding entirely.
            RequestTag::RawCoverImageBytes => {
                self.show_cover(&request, &body);
                Ok(())
            }
            RequestTag::SearchResults => decode::<MangaListResponse>(&body).map(|response| {
                self.searching = false;
                self.rebuild_manga_list(response);
            }),
            RequestTag::ChapterFeed => decode::<ChapterFeedResponse>(&body)
                .map(|response| self.rebuild_chapter_list(&request, response)),
            RequestTag::MangaDetailsForCover => decode::<MangaDetailsResponse>(&body)
                .map(|response| self.on_manga_details(&request, response)),
            RequestTag::CoverImageMetadata => decode::<CoverResponse>(&body)
                .map(|response| self.on_cover_metadata(&request, response)),
        };
        if routed.is_err() {
            self.abandon(&request);
        }
        routed
    }

    /// Leaves no "in progress" state behind for a request that failed.
    fn abandon(&mut self, request: &PendingRequest) {
        match request.tag {
            RequestTag::SearchResults => self.searching = false,
            RequestTag::ChapterFeed if request.manga_id == self.selected.manga_id => {
                self.status = format!("Failed to load chapters for {}", request.title);
            }
            _ => {
                if self.cover.accepts(request) {
                    self.cover.set(CoverState::Failed);
                }
            }
        }
    }

    fn rebuild_manga_list(&mut self, response: MangaListResponse) {
        log::info!("received {} search results", response.data.len());
        self.manga_list = response.data.into_iter().map(CatalogEntry::from).collect();
        reset_selection(&mut self.manga_state, self.manga_list.len());
    }

    fn rebuild_chapter_list(&mut self, request: &PendingRequest, response: ChapterFeedResponse) {
        if request.manga_id != self.selected.manga_id {
            log::debug!(
                "ignoring chapter feed for {}, {} is selected",
                request.manga_id,
                self.selected.manga_id
            );
            return;
        }

        self.chapter_list = response.data.into_iter().map(ChapterEntry::from).collect();
        reset_selection(&mut self.chapter_state, self.chapter_list.len());
        self.latest_chapter = adapter::latest_chapter(&self.chapter_list);

        let count = self.chapter_list.len();
        match self.latest_chapter {
            Some(latest) => log::info!("{count} chapters for {}, latest {latest}", request.title),
            None => log::info!("{count} chapters for {}, no valid chapter numbers", request.title),
        }

        self.status = match (request.origin, self.bookmark(&request.manga_id)) {
            (FeedOrigin::Bookmark, Some(bookmark)) => {
                adapter::freshness_status(bookmark, self.latest_chapter)
            }
            _ => format!("Manga: {}", request.title),
        };
    }

    fn on_manga_details(&mut self, request: &PendingRequest, response: MangaDetailsResponse) {
        if !self.cover.accepts(request) {
            log::debug!("ignoring stale manga details for {}", request.manga_id);
            return;
        }
        match response.data.cover_art_id() {
            Some(cover_id) => {
                log::debug!("found cover id {cover_id}");
                self.cover.set(CoverState::AwaitingCoverMeta);
                self.client.fetch_cover_metadata(&request.manga_id, cover_id);
            }
            None => {
                log::debug!("no cover art for {}", request.manga_id);
                self.cover.set(CoverState::NoCover);
            }
        }
    }

    fn on_cover_metadata(&mut self, request: &PendingRequest, response: CoverResponse) {
        if !self.cover.accepts(request) {
            log::debug!("ignoring stale cover metadata for {}", request.manga_id);
            return;
        }
        match response.data.attributes.file_name.filter(|f| !f.is_empty()) {
            Some(file_name) => {
                self.cover.set(CoverState::AwaitingImage);
                self.client.fetch_cover_image(&request.manga_id, &file_name);
            }
            None => self.cover.set(CoverState::NoCover),
        }
    }

    fn show_cover(&mut self, request: &PendingRequest, body: &[u8]) {
        if !self.cover.accepts(request) {
            log::debug!("ignoring stale cover image for {}", request.manga_id);
            return;
        }
        match image::load_from_memory(body) {
            Ok(image) => {
                log::debug!(
                    "cover for {} is {}x{}",
                    request.manga_id,
                    image.width(),
                    image.height()
                );
                self.cover.set(CoverState::Done(image));
            }
            Err(e) => {
                log::warn!("failed to decode cover for {}: {e}", request.manga_id);
                self.cover.set(CoverState::Failed);
            }
        }
    }
}
