//! Episode record model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::extract::ExtractedEpisode;

/// A harvested episode. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeRecord {
    /// The discovery API's `link` value; unique across the store.
    pub episode_id: String,
    pub video_page_url: String,
    /// Raw player iframe `src` as seen on the page.
    pub iframe_src: Option<String>,
    /// Decoded, quality-resolved stream URL.
    pub video_url: Option<String>,
    pub download_url: Option<String>,
    pub scraped_at: DateTime<Utc>,
}

impl EpisodeRecord {
    /// Build a record from a successful extraction, stamped with the current time.
    pub fn from_extraction(
        episode_id: &str,
        video_page_url: String,
        extracted: ExtractedEpisode,
        video_url: Option<String>,
    ) -> Self {
        Self {
            episode_id: episode_id.to_string(),
            video_page_url,
            iframe_src: extracted.iframe_src,
            video_url,
            download_url: extracted.download_url,
            scraped_at: Utc::now(),
        }
    }
}

/// Detail page URL for an episode: `<base><episode_id>/`.
pub fn video_page_url(base: &str, episode_id: &str) -> String {
    format!("{}{}/", base, episode_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_video_page_url() {
        assert_eq!(
            video_page_url("https://example.com/videos/", "show-episode-3"),
            "https://example.com/videos/show-episode-3/"
        );
    }

    #[test]
    fn test_from_extraction_copies_fields() {
        let extracted = ExtractedEpisode {
            iframe_src: Some("https://player.example/e?source=x".to_string()),
            download_url: Some("https://dl.example/x.mp4".to_string()),
        };
        let before = Utc::now();
        let record = EpisodeRecord::from_extraction(
            "ep-1",
            "https://example.com/videos/ep-1/".to_string(),
            extracted,
            Some("https://cdn.example/x_720p.mp4".to_string()),
        );

        assert_eq!(record.episode_id, "ep-1");
        assert_eq!(
            record.iframe_src.as_deref(),
            Some("https://player.example/e?source=x")
        );
        assert_eq!(
            record.download_url.as_deref(),
            Some("https://dl.example/x.mp4")
        );
        assert!(record.scraped_at >= before);
    }

    #[test]
    fn test_serializes_camel_case() {
        let record = EpisodeRecord {
            episode_id: "ep-1".to_string(),
            video_page_url: "https://example.com/videos/ep-1/".to_string(),
            iframe_src: None,
            video_url: None,
            download_url: None,
            scraped_at: DateTime::UNIX_EPOCH,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["episodeId"], "ep-1");
        assert!(json["videoUrl"].is_null());
    }
}
