use image::DynamicImage;

use super::mangadex::{PendingRequest, RequestTag};

/// Progress of the details -> cover metadata -> image lookup.
#[derive(Debug, Clone, Default)]
pub enum CoverState {
    #[default]
    Idle,
    AwaitingDetails,
    AwaitingCoverMeta,
    AwaitingImage,
    Done(DynamicImage),
    NoCover,
    Failed,
}

impl CoverState {
    /// The hop this state is waiting on, if any.
    fn awaited_tag(&self) -> Option<RequestTag> {
        match self {
            CoverState::AwaitingDetails => Some(RequestTag::MangaDetailsForCover),
            CoverState::AwaitingCoverMeta => Some(RequestTag::CoverImageMetadata),
            CoverState::AwaitingImage => Some(RequestTag::RawCoverImageBytes),
            _ => None,
        }
    }

    fn name(&self) -> &'static str {
        match self {
            CoverState::Idle => "idle",
            CoverState::AwaitingDetails => "awaiting details",
            CoverState::AwaitingCoverMeta => "awaiting cover metadata",
            CoverState::AwaitingImage => "awaiting image",
            CoverState::Done(_) => "done",
            CoverState::NoCover => "no cover",
            CoverState::Failed => "failed",
        }
    }

    pub fn caption(&self) -> &'static str {
        match self {
            CoverState::Idle => "",
            CoverState::AwaitingDetails
            | CoverState::AwaitingCoverMeta
            | CoverState::AwaitingImage => "Loading cover...",
            CoverState::Done(_) => "",
            CoverState::NoCover => "No cover available",
            CoverState::Failed => "Failed to load cover",
        }
    }
}

/// Cover lookup for the currently selected manga. Starting a new chain
/// supersedes the old one; hops that belong to a superseded chain are
/// rejected by `accepts`.
#[derive(Debug, Default)]
pub struct CoverChain {
    manga_id: String,
    state: CoverState,
    revision: u64,
}

impl CoverChain {
    pub fn start(&mut self, manga_id: &str) {
        self.manga_id = manga_id.to_string();
        self.set(CoverState::AwaitingDetails);
    }

    pub fn accepts(&self, request: &PendingRequest) -> bool {
        request.manga_id == self.manga_id && self.state.awaited_tag() == Some(request.tag)
    }

    pub fn set(&mut self, state: CoverState) {
        log::debug!(
            "cover chain for {}: {} -> {}",
            self.manga_id,
            self.state.name(),
            state.name()
        );
        self.state = state;
        self.revision += 1;
    }

    pub fn state(&self) -> &CoverState {
        &self.state
    }

    /// Bumped on every transition so the renderer knows when to rebuild.
    pub fn revision(&self) -> u64 {
        self.revision
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::mangadex::FeedOrigin;

    fn request(tag: RequestTag, manga_id: &str) -> PendingRequest {
        PendingRequest {
            id: 1,
            tag,
            url: String::new(),
            manga_id: manga_id.to_string(),
            title: String::new(),
            origin: FeedOrigin::Catalog,
        }
    }

    #[test]
    fn accepts_only_the_awaited_hop() {
        let mut chain = CoverChain::default();
        chain.start("m1");
        assert!(chain.accepts(&request(RequestTag::MangaDetailsForCover, "m1")));
        assert!(!chain.accepts(&request(RequestTag::CoverImageMetadata, "m1")));

        chain.set(CoverState::AwaitingCoverMeta);
        assert!(chain.accepts(&request(RequestTag::CoverImageMetadata, "m1")));
        assert!(!chain.accepts(&request(RequestTag::MangaDetailsForCover, "m1")));
    }

    #[test]
    fn restarting_supersedes_the_previous_manga() {
        let mut chain = CoverChain::default();
        chain.start("m1");
        chain.start("m2");
        assert!(!chain.accepts(&request(RequestTag::MangaDetailsForCover, "m1")));
        assert!(chain.accepts(&request(RequestTag::MangaDetailsForCover, "m2")));
    }

    #[test]
    fn terminal_states_accept_nothing() {
        let mut chain = CoverChain::default();
        chain.start("m1");
        chain.set(CoverState::NoCover);
        assert!(!chain.accepts(&request(RequestTag::MangaDetailsForCover, "m1")));
        assert_eq!(chain.state().caption(), "No cover available");
        assert_eq!(chain.revision(), 2);
    }
}
