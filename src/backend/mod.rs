pub mod bookmarks;
pub mod cover;
pub mod mangadex;
