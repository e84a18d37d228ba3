//! Diesel-based episode repository for SQLite.
//!
//! Uses diesel-async's SyncConnectionWrapper to provide an async interface
//! while maintaining Diesel's compile-time query checking. A single
//! connection is opened at startup and reused for the whole run.

use async_trait::async_trait;
use diesel::prelude::*;
use diesel::sqlite::SqliteConnection;
use diesel_async::sync_connection_wrapper::SyncConnectionWrapper;
use diesel_async::{AsyncConnection, RunQueryDsl, SimpleAsyncConnection};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::diesel_models::{EpisodeRow, NewEpisode};
use super::{EpisodeStore, StoreError};
use crate::models::EpisodeRecord;
use crate::schema::episodes;

/// Async SQLite connection using SyncConnectionWrapper.
pub type AsyncSqliteConnection = SyncConnectionWrapper<SqliteConnection>;

/// Episode repository holding the run's single database connection.
pub struct DieselEpisodeRepository {
    conn: Mutex<AsyncSqliteConnection>,
}

impl DieselEpisodeRepository {
    /// Open the database and make sure the schema and unique index exist.
    pub async fn open(database_path: &str) -> Result<Self, StoreError> {
        let mut conn = AsyncSqliteConnection::establish(database_path).await?;
        Self::init_schema(&mut conn).await?;
        info!("Opened episode database at {}", database_path);

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    async fn init_schema(conn: &mut AsyncSqliteConnection) -> Result<(), StoreError> {
        conn.batch_execute(
            r#"
            CREATE TABLE IF NOT EXISTS episodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                episode_id TEXT NOT NULL,
                video_page_url TEXT NOT NULL,
                iframe_src TEXT,
                video_url TEXT,
                download_url TEXT,
                scraped_at TEXT NOT NULL
            );

            CREATE UNIQUE INDEX IF NOT EXISTS idx_episodes_episode_id
                ON episodes(episode_id);
            "#,
        )
        .await?;

        Ok(())
    }

    /// Get an episode by its episode id.
    pub async fn get(&self, episode_id: &str) -> Result<Option<EpisodeRecord>, StoreError> {
        let mut conn = self.conn.lock().await;

        let row = episodes::table
            .filter(episodes::episode_id.eq(episode_id))
            .first::<EpisodeRow>(&mut *conn)
            .await
            .optional()?;

        Ok(row.map(EpisodeRecord::from))
    }

    /// Number of stored episodes.
    pub async fn count(&self) -> Result<i64, StoreError> {
        let mut conn = self.conn.lock().await;

        let count = episodes::table
            .count()
            .get_result::<i64>(&mut *conn)
            .await?;

        Ok(count)
    }

    /// Most recently stored episodes, newest first.
    pub async fn recent(&self, limit: i64) -> Result<Vec<EpisodeRecord>, StoreError> {
        let mut conn = self.conn.lock().await;

        let rows = episodes::table
            .order(episodes::id.desc())
            .limit(limit)
            .load::<EpisodeRow>(&mut *conn)
            .await?;

        Ok(rows.into_iter().map(EpisodeRecord::from).collect())
    }

    /// Release the connection.
    pub async fn close(self) {
        drop(self.conn.into_inner());
        info!("Episode database closed");
    }
}

#[async_trait]
impl EpisodeStore for DieselEpisodeRepository {
    async fn exists(&self, episode_id: &str) -> Result<bool, StoreError> {
        let mut conn = self.conn.lock().await;

        use diesel::dsl::count_star;
        let count: i64 = episodes::table
            .filter(episodes::episode_id.eq(episode_id))
            .select(count_star())
            .first(&mut *conn)
            .await?;

        Ok(count > 0)
    }

    async fn insert(&self, record: &EpisodeRecord) -> Result<bool, StoreError> {
        let new_episode = NewEpisode::from(record);
        let mut conn = self.conn.lock().await;

        // INSERT OR IGNORE against the unique index keeps the first write
        let rows = diesel::insert_or_ignore_into(episodes::table)
            .values(&new_episode)
            .execute(&mut *conn)
            .await?;

        if rows == 0 {
            debug!("Episode {} already stored", record.episode_id);
        }

        Ok(rows > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use tempfile::tempdir;

    async fn setup_test_db() -> (DieselEpisodeRepository, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("episodes.db");
        let repo = DieselEpisodeRepository::open(&db_path.display().to_string())
            .await
            .unwrap();
        (repo, dir)
    }

    fn record(episode_id: &str) -> EpisodeRecord {
        EpisodeRecord {
            episode_id: episode_id.to_string(),
            video_page_url: format!("https://example.com/videos/{}/", episode_id),
            iframe_src: Some(format!(
                "https://player.example/e?source=https%3A%2F%2Fcdn%2F{}.mp4",
                episode_id
            )),
            video_url: Some(format!("https://cdn/{}.mp4", episode_id)),
            download_url: None,
            scraped_at: Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let (repo, _dir) = setup_test_db().await;

        assert!(!repo.exists("ep-1").await.unwrap());
        assert!(repo.insert(&record("ep-1")).await.unwrap());
        assert!(repo.exists("ep-1").await.unwrap());

        let fetched = repo.get("ep-1").await.unwrap().unwrap();
        assert_eq!(fetched, record("ep-1"));
        assert!(repo.get("ep-2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_insert_is_ignored() {
        let (repo, _dir) = setup_test_db().await;

        let first = record("ep-1");
        assert!(repo.insert(&first).await.unwrap());

        let mut second = record("ep-1");
        second.video_url = Some("https://cdn/other.mp4".to_string());
        assert!(!repo.insert(&second).await.unwrap());

        assert_eq!(repo.count().await.unwrap(), 1);
        let stored = repo.get("ep-1").await.unwrap().unwrap();
        assert_eq!(stored.video_url.as_deref(), Some("https://cdn/ep-1.mp4"));
    }

    #[tokio::test]
    async fn test_recent_is_newest_first() {
        let (repo, _dir) = setup_test_db().await;

        for id in ["ep-1", "ep-2", "ep-3"] {
            repo.insert(&record(id)).await.unwrap();
        }

        let recent = repo.recent(2).await.unwrap();
        let ids: Vec<_> = recent.iter().map(|r| r.episode_id.as_str()).collect();
        assert_eq!(ids, vec!["ep-3", "ep-2"]);
    }

    #[tokio::test]
    async fn test_reopen_keeps_records() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("episodes.db").display().to_string();

        let repo = DieselEpisodeRepository::open(&db_path).await.unwrap();
        repo.insert(&record("ep-1")).await.unwrap();
        repo.close().await;

        let repo = DieselEpisodeRepository::open(&db_path).await.unwrap();
        assert!(repo.exists("ep-1").await.unwrap());
        assert_eq!(repo.count().await.unwrap(), 1);
    }
}
