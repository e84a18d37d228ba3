//! Data models for epharvest.

mod episode;

pub use episode::{video_page_url, EpisodeRecord};
