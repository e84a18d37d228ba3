//! Diesel ORM models for database tables.

use diesel::prelude::*;

use super::parse_datetime;
use crate::models::EpisodeRecord;
use crate::schema;

/// Episode row from the database.
#[derive(Queryable, Selectable, Identifiable, Debug, Clone)]
#[diesel(table_name = schema::episodes)]
#[diesel(check_for_backend(diesel::sqlite::Sqlite))]
pub struct EpisodeRow {
    pub id: i32,
    pub episode_id: String,
    pub video_page_url: String,
    pub iframe_src: Option<String>,
    pub video_url: Option<String>,
    pub download_url: Option<String>,
    pub scraped_at: String,
}

/// New episode for insertion.
#[derive(Insertable, Debug)]
#[diesel(table_name = schema::episodes)]
pub struct NewEpisode<'a> {
    pub episode_id: &'a str,
    pub video_page_url: &'a str,
    pub iframe_src: Option<&'a str>,
    pub video_url: Option<&'a str>,
    pub download_url: Option<&'a str>,
    pub scraped_at: String,
}

impl<'a> From<&'a EpisodeRecord> for NewEpisode<'a> {
    fn from(record: &'a EpisodeRecord) -> Self {
        Self {
            episode_id: &record.episode_id,
            video_page_url: &record.video_page_url,
            iframe_src: record.iframe_src.as_deref(),
            video_url: record.video_url.as_deref(),
            download_url: record.download_url.as_deref(),
            scraped_at: record.scraped_at.to_rfc3339(),
        }
    }
}

/// Convert a database row to a domain model.
impl From<EpisodeRow> for EpisodeRecord {
    fn from(row: EpisodeRow) -> Self {
        EpisodeRecord {
            episode_id: row.episode_id,
            video_page_url: row.video_page_url,
            iframe_src: row.iframe_src,
            video_url: row.video_url,
            download_url: row.download_url,
            scraped_at: parse_datetime(&row.scraped_at),
        }
    }
}
