use std::path::Path;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq)]
pub struct Bookmark {
    pub manga_id: String,
    pub title: String,
    pub chapter: f64,
}

/// Last-read bookmarks, one row per manga.
#[derive(Debug, Clone)]
pub struct BookmarkStore {
    pool: SqlitePool,
}

impl BookmarkStore {
    pub async fn open(path: &Path) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true);

        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| AppError::StorageUnavailable(e.to_string()))?;

        sqlx::query(
            r"CREATE TABLE IF NOT EXISTS bookmarks (
                manga_id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                chapter REAL NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .map_err(|e| AppError::StorageUnavailable(format!("failed to create table: {e}")))?;

        log::info!("opened bookmark database at {}", path.display());
        Ok(Self { pool })
    }

    pub async fn upsert(&self, bookmark: &Bookmark) -> Result<(), AppError> {
        sqlx::query(
            r"INSERT OR REPLACE INTO bookmarks (manga_id, title, chapter)
            VALUES (?, ?, ?)",
        )
        .bind(&bookmark.manga_id)
        .bind(&bookmark.title)
        .bind(bookmark.chapter)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::WriteFailed(e.to_string()))?;
        Ok(())
    }

    /// Every row, in whatever order SQLite returns them.
    pub async fn load_all(&self) -> Result<Vec<Bookmark>, AppError> {
        let rows = sqlx::query_as::<_, (String, String, f64)>(
            r"SELECT manga_id, title, chapter FROM bookmarks",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::ReadFailed(e.to_string()))?;

        Ok(rows
            .into_iter()
            .map(|(manga_id, title, chapter)| Bookmark {
                manga_id,
                title,
                chapter,
            })
            .collect())
    }

    pub async fn delete(&self, manga_id: &str) -> Result<(), AppError> {
        sqlx::query(r"DELETE FROM bookmarks WHERE manga_id = ?")
            .bind(manga_id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::WriteFailed(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bookmark(id: &str, title: &str, chapter: f64) -> Bookmark {
        Bookmark {
            manga_id: id.to_string(),
            title: title.to_string(),
            chapter,
        }
    }

    async fn temp_store() -> (tempfile::TempDir, BookmarkStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = BookmarkStore::open(&dir.path().join("bookmarks.db"))
            .await
            .unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn open_creates_empty_table() {
        let (dir, store) = temp_store().await;
        assert!(dir.path().join("bookmarks.db").exists());
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn open_fails_when_directory_is_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("nested").join("bookmarks.db");
        let err = BookmarkStore::open(&path).await.unwrap_err();
        assert!(matches!(err, AppError::StorageUnavailable(_)), "{err:?}");
    }

    #[tokio::test]
    async fn upsert_replaces_existing_row() {
        let (_dir, store) = temp_store().await;
        store.upsert(&bookmark("a1", "Attack", 3.0)).await.unwrap();
        store.upsert(&bookmark("a1", "Attack on Titan", 12.5)).await.unwrap();

        let all = store.load_all().await.unwrap();
        assert_eq!(all, vec![bookmark("a1", "Attack on Titan", 12.5)]);
    }

    #[tokio::test]
    async fn delete_missing_id_is_a_noop() {
        let (_dir, store) = temp_store().await;
        store.upsert(&bookmark("a1", "Attack", 3.0)).await.unwrap();

        store.delete("does-not-exist").await.unwrap();
        assert_eq!(store.load_all().await.unwrap().len(), 1);

        store.delete("a1").await.unwrap();
        assert!(store.load_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn rows_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bookmarks.db");
        {
            let store = BookmarkStore::open(&path).await.unwrap();
            store.upsert(&bookmark("b2", "Berserk", 364.0)).await.unwrap();
        }
        let store = BookmarkStore::open(&path).await.unwrap();
        assert_eq!(store.load_all().await.unwrap(), vec![bookmark("b2", "Berserk", 364.0)]);
    }
}
