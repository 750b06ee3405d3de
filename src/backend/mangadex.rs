use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;

use crate::config::Config;
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestTag {
    SearchResults,
    ChapterFeed,
    MangaDetailsForCover,
    CoverImageMetadata,
    RawCoverImageBytes,
}

impl RequestTag {
    /// Everything except the cover image itself is a JSON endpoint.
    pub fn expects_json(self) -> bool {
        self != RequestTag::RawCoverImageBytes
    }
}

/// Where a chapter feed was opened from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedOrigin {
    #[default]
    Catalog,
    Bookmark,
}

pub type RequestId = u64;

/// Context of one outbound request. Created when the request is issued and
/// handed back unchanged with its completion.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingRequest {
    pub id: RequestId,
    pub tag: RequestTag,
    pub url: String,
    pub manga_id: String,
    pub title: String,
    pub origin: FeedOrigin,
}

#[derive(Debug)]
pub struct Completion {
    pub request: PendingRequest,
    pub outcome: Result<Vec<u8>, String>,
}

/// Carries a request to the network and eventually produces a `Completion`.
pub trait Transport {
    fn send(&self, request: PendingRequest);
}

/// reqwest-backed transport: every request runs on its own tokio task and
/// posts its completion to the event loop's channel.
pub struct HttpTransport {
    client: reqwest::Client,
    completions: mpsc::UnboundedSender<Completion>,
}

impl HttpTransport {
    pub fn new(
        config: &Config,
        completions: mpsc::UnboundedSender<Completion>,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            completions,
        })
    }
}

impl Transport for HttpTransport {
    fn send(&self, request: PendingRequest) {
        let client = self.client.clone();
        let tx = self.completions.clone();

        tokio::spawn(async move {
            let outcome = fetch(&client, &request).await.map_err(|e| e.to_string());
            if tx.send(Completion { request, outcome }).is_err() {
                log::debug!("event loop gone, dropping completion");
            }
        });
    }
}

async fn fetch(
    client: &reqwest::Client,
    request: &PendingRequest,
) -> Result<Vec<u8>, reqwest::Error> {
    let mut builder = client.get(&request.url);
    if request.tag.expects_json() {
        builder = builder.header(CONTENT_TYPE, "application/json");
    }
    let response = builder.send().await?.error_for_status()?;
    let bytes = response.bytes().await?;
    Ok(bytes.to_vec())
}

pub struct CatalogClient {
    api_base_url: String,
    uploads_base_url: String,
    feed_page_size: u32,
    feed_language: String,
    transport: Box<dyn Transport>,
    next_id: AtomicU64,
}

impl CatalogClient {
    pub fn new(config: &Config, transport: Box<dyn Transport>) -> Self {
        Self {
            api_base_url: config.api_base_url.clone(),
            uploads_base_url: config.uploads_base_url.clone(),
            feed_page_size: config.feed_page_size,
            feed_language: config.feed_language.clone(),
            transport,
            next_id: AtomicU64::new(1),
        }
    }

    fn issue(
        &self,
        tag: RequestTag,
        url: String,
        manga_id: &str,
        title: &str,
        origin: FeedOrigin,
    ) -> PendingRequest {
        let request = PendingRequest {
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            tag,
            url,
            manga_id: manga_id.to_string(),
            title: title.to_string(),
            origin,
        };
        log::debug!("request #{} {:?} -> {}", request.id, request.tag, request.url);
        self.transport.send(request.clone());
        request
    }

    pub fn search_manga(&self, title: &str) -> Result<PendingRequest, AppError> {
        let query = title.trim();
        if query.is_empty() {
            return Err(AppError::EmptyQuery);
        }
        let url = format!(
            "{}/manga?title={}",
            self.api_base_url,
            urlencoding::encode(query)
        );
        Ok(self.issue(RequestTag::SearchResults, url, "", query, FeedOrigin::Catalog))
    }

    pub fn fetch_chapter_feed(
        &self,
        manga_id: &str,
        title: &str,
        origin: FeedOrigin,
    ) -> PendingRequest {
        let url = format!(
            "{}/manga/{}/feed?limit={}&translatedLanguage[]={}&order[chapter]=asc",
            self.api_base_url, manga_id, self.feed_page_size, self.feed_language
        );
        self.issue(RequestTag::ChapterFeed, url, manga_id, title, origin)
    }

    /// First hop of the cover lookup: manga details with the cover_art
    /// relationship expanded.
    pub fn fetch_cover_chain(&self, manga_id: &str) -> PendingRequest {
        let url = format!("{}/manga/{}?includes[]=cover_art", self.api_base_url, manga_id);
        self.issue(RequestTag::MangaDetailsForCover, url, manga_id, "", FeedOrigin::Catalog)
    }

    pub fn fetch_cover_metadata(&self, manga_id: &str, cover_id: &str) -> PendingRequest {
        let url = format!("{}/cover/{}", self.api_base_url, cover_id);
        self.issue(RequestTag::CoverImageMetadata, url, manga_id, "", FeedOrigin::Catalog)
    }

    pub fn fetch_cover_image(&self, manga_id: &str, file_name: &str) -> PendingRequest {
        let url = cover_image_url(&self.uploads_base_url, manga_id, file_name);
        self.issue(RequestTag::RawCoverImageBytes, url, manga_id, "", FeedOrigin::Catalog)
    }
}

pub fn cover_image_url(uploads_base_url: &str, manga_id: &str, file_name: &str) -> String {
    format!("{}/covers/{}/{}", uploads_base_url, manga_id, file_name)
}

#[derive(Debug, Deserialize)]
pub struct MangaListResponse {
    #[serde(default)]
    pub data: Vec<MangaData>,
}

#[derive(Debug, Deserialize)]
pub struct MangaDetailsResponse {
    pub data: MangaData,
}

#[derive(Debug, Deserialize)]
pub struct MangaData {
    pub id: String,
    #[serde(default)]
    pub attributes: MangaAttributes,
    #[serde(default)]
    pub relationships: Vec<Relationship>,
}

#[derive(Debug, Default, Deserialize)]
pub struct MangaAttributes {
    #[serde(default)]
    pub title: BTreeMap<String, String>,
    pub year: Option<i64>,
    pub status: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Relationship {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub rel_type: String,
}

impl MangaData {
    /// Id of the first relationship of type `cover_art`.
    pub fn cover_art_id(&self) -> Option<&str> {
        self.relationships
            .iter()
            .find(|rel| rel.rel_type == "cover_art")
            .map(|rel| rel.id.as_str())
            .filter(|id| !id.is_empty())
    }
}

#[derive(Debug, Deserialize)]
pub struct ChapterFeedResponse {
    #[serde(default)]
    pub data: Vec<ChapterData>,
}

#[derive(Debug, Deserialize)]
pub struct ChapterData {
    pub id: String,
    #[serde(default)]
    pub attributes: ChapterAttributes,
}

#[derive(Debug, Default, Deserialize)]
pub struct ChapterAttributes {
    pub chapter: Option<String>,
    pub title: Option<String>,
    pub volume: Option<String>,
    #[serde(default)]
    pub pages: u32,
    #[serde(rename = "translatedLanguage")]
    pub translated_language: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CoverResponse {
    pub data: CoverData,
}

#[derive(Debug, Deserialize)]
pub struct CoverData {
    #[serde(default)]
    pub attributes: CoverAttributes,
}

#[derive(Debug, Default, Deserialize)]
pub struct CoverAttributes {
    #[serde(rename = "fileName")]
    pub file_name: Option<String>,
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    /// Transport that records requests instead of sending them.
    #[derive(Clone, Default)]
    pub(crate) struct RecordingTransport {
        pub(crate) sent: Arc<Mutex<Vec<PendingRequest>>>,
    }

    impl RecordingTransport {
        pub(crate) fn sent(&self) -> Vec<PendingRequest> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, request: PendingRequest) {
            self.sent.lock().unwrap().push(request);
        }
    }

    fn client() -> (CatalogClient, RecordingTransport) {
        let transport = RecordingTransport::default();
        let config = Config::from_lookup(|_| None);
        (CatalogClient::new(&config, Box::new(transport.clone())), transport)
    }

    #[test]
    fn search_encodes_query() {
        let (client, transport) = client();
        let request = client.search_manga("  One Piece & Co ").unwrap();
        assert_eq!(request.tag, RequestTag::SearchResults);
        assert_eq!(
            request.url,
            "https://api.mangadex.org/manga?title=One%20Piece%20%26%20Co"
        );
        assert_eq!(transport.sent(), vec![request]);
    }

    #[test]
    fn blank_search_is_rejected_locally() {
        let (client, transport) = client();
        assert!(matches!(client.search_manga(" \t "), Err(AppError::EmptyQuery)));
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn feed_url_and_metadata() {
        let (client, _) = client();
        let request = client.fetch_chapter_feed("abc", "Berserk", FeedOrigin::Bookmark);
        assert_eq!(
            request.url,
            "https://api.mangadex.org/manga/abc/feed?limit=100&translatedLanguage[]=en&order[chapter]=asc"
        );
        assert_eq!(request.manga_id, "abc");
        assert_eq!(request.title, "Berserk");
        assert_eq!(request.origin, FeedOrigin::Bookmark);
    }

    #[test]
    fn cover_hops_use_their_endpoints() {
        let (client, transport) = client();
        client.fetch_cover_chain("m1");
        client.fetch_cover_metadata("m1", "c9");
        client.fetch_cover_image("m1", "cover.jpg");

        let sent = transport.sent();
        let urls: Vec<_> = sent.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://api.mangadex.org/manga/m1?includes[]=cover_art",
                "https://api.mangadex.org/cover/c9",
                "https://uploads.mangadex.org/covers/m1/cover.jpg",
            ]
        );
        assert!(sent.iter().all(|r| r.manga_id == "m1"));
        assert!(!sent[2].tag.expects_json());
    }

    #[test]
    fn request_ids_are_unique() {
        let (client, _) = client();
        let a = client.fetch_cover_chain("m1");
        let b = client.fetch_cover_chain("m1");
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn cover_art_relationship_lookup() {
        let details: MangaDetailsResponse = serde_json::from_str(
            r#"{"data":{"id":"m1","attributes":{"title":{"en":"X"}},
                "relationships":[{"id":"a1","type":"author"},{"id":"c1","type":"cover_art"},{"id":"c2","type":"cover_art"}]}}"#,
        )
        .unwrap();
        assert_eq!(details.data.cover_art_id(), Some("c1"));
    }

    #[tokio::test]
    #[ignore = "hits the live MangaDex API"]
    async fn live_search_returns_results() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let config = Config::from_lookup(|_| None);
        let transport = HttpTransport::new(&config, tx).unwrap();
        let client = CatalogClient::new(&config, Box::new(transport));

        client.search_manga("Berserk").unwrap();
        let completion = rx.recv().await.unwrap();
        let body = completion.outcome.unwrap();
        let response: MangaListResponse = serde_json::from_slice(&body).unwrap();
        assert!(!response.data.is_empty(), "No manga returned");
    }
}
