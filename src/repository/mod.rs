//! Repository layer for database persistence.
//!
//! All database access uses Diesel ORM with compile-time query checking
//! on SQLite. The crawler only sees the [`EpisodeStore`] trait.

pub mod diesel_episode;
pub mod diesel_models;

pub use diesel_episode::DieselEpisodeRepository;
pub use diesel_models::{EpisodeRow, NewEpisode};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::models::EpisodeRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database connection error: {0}")]
    Connection(#[from] diesel::ConnectionError),
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),
}

/// Persistence operations the crawler depends on.
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Whether a record with this episode id has been stored.
    async fn exists(&self, episode_id: &str) -> Result<bool, StoreError>;

    /// Insert the record unless its episode id is already present.
    /// Returns `false` when nothing was written.
    async fn insert(&self, record: &EpisodeRecord) -> Result<bool, StoreError>;
}

/// Parse a datetime string from the database, defaulting to Unix epoch on error.
pub fn parse_datetime(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(DateTime::UNIX_EPOCH)
}
