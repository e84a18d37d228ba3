//! epharvest - incremental episode harvester.
//!
//! Walks a paginated episode API, skips episodes already in the local
//! database, and drives a headless browser to resolve the direct video
//! stream URL for everything new.

pub mod browser;
pub mod cli;
pub mod config;
pub mod crawl;
pub mod decode;
pub mod discovery;
pub mod extract;
pub mod models;
pub mod repository;
pub mod schema;

pub use crawl::{CrawlSummary, Crawler};
pub use decode::extract_video_url;
pub use models::EpisodeRecord;
