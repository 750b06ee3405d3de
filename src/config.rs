use std::path::PathBuf;

const APP_DIR: &str = "manga-tracker";
const DEFAULT_API_URL: &str = "https://api.mangadex.org";
const DEFAULT_UPLOADS_URL: &str = "https://uploads.mangadex.org";
const FEED_PAGE_SIZE: u32 = 100;
const FEED_LANGUAGE: &str = "en";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_base_url: String,
    pub uploads_base_url: String,
    pub database_path: PathBuf,
    pub log_path: PathBuf,
    pub user_agent: String,
    pub feed_page_size: u32,
    pub feed_language: String,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = data_dir();
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            uploads_base_url: DEFAULT_UPLOADS_URL.to_string(),
            database_path: data_dir.join("manga_bookmarks.db"),
            log_path: data_dir.join("manga-tracker.log"),
            user_agent: format!("manga-tracker/{}", env!("CARGO_PKG_VERSION")),
            feed_page_size: FEED_PAGE_SIZE,
            feed_language: FEED_LANGUAGE.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup` (normally the process environment)
    /// on top of the defaults.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        let set = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(url) = set("MANGADEX_API_URL") {
            config.api_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(url) = set("MANGADEX_UPLOADS_URL") {
            config.uploads_base_url = url.trim_end_matches('/').to_string();
        }
        if let Some(path) = set("MANGA_TRACKER_DB") {
            config.database_path = PathBuf::from(path);
        }
        config
    }
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_point_at_mangadex() {
        let config = Config::from_lookup(|_| None);
        assert_eq!(config.api_base_url, "https://api.mangadex.org");
        assert_eq!(config.uploads_base_url, "https://uploads.mangadex.org");
        assert_eq!(config.feed_page_size, 100);
        assert_eq!(config.feed_language, "en");
        assert!(config.database_path.ends_with("manga-tracker/manga_bookmarks.db"));
    }

    #[test]
    fn overrides_are_applied() {
        let config = Config::from_lookup(|key| match key {
            "MANGADEX_API_URL" => Some("http://localhost:8080/".to_string()),
            "MANGA_TRACKER_DB" => Some("/tmp/bm.db".to_string()),
            "MANGADEX_UPLOADS_URL" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.api_base_url, "http://localhost:8080");
        assert_eq!(config.uploads_base_url, "https://uploads.mangadex.org");
        assert_eq!(config.database_path, PathBuf::from("/tmp/bm.db"));
    }
}
