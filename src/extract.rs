//! Episode detail page extraction.
//!
//! The browser-backed implementation lives in [`crate::browser`]; this module
//! holds the seam the crawler talks to and the DOM reading itself, which only
//! needs a rendered HTML snapshot.

use async_trait::async_trait;
use scraper::{Html, Selector};
use thiserror::Error;

/// Primary player iframe. Its `src` starts out as `about:blank`.
pub const PLAYER_IFRAME_SELECTOR: &str = "#search_iframe";

/// Secondary player iframe used by some page templates.
pub const FALLBACK_IFRAME_SELECTOR: &str = "iframe.metaframe";

/// Direct download anchor.
pub const DOWNLOAD_LINK_SELECTOR: &str = ".download-video";

/// Raw values read from a rendered episode page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractedEpisode {
    pub iframe_src: Option<String>,
    pub download_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("Navigation timed out after {secs}s for {url}")]
    NavigationTimeout { url: String, secs: u64 },
    #[error("Player iframe not rendered after {secs}s on {url}")]
    RenderTimeout { url: String, secs: u64 },
    #[error("Navigation failed for {url}: {reason}")]
    Navigation { url: String, reason: String },
    #[error("Browser error: {0}")]
    Browser(String),
}

/// Something that can load an episode detail page and read the player.
///
/// Implementations make a single attempt; the caller decides what a
/// failure means for the crawl.
#[async_trait]
pub trait EpisodeExtractor: Send + Sync {
    async fn extract(&self, video_page_url: &str) -> Result<ExtractedEpisode, ExtractError>;
}

/// Read the player iframe and download link out of rendered page HTML.
///
/// Iframe lookup order: primary `src`, primary `data-src`, fallback
/// `src`, fallback `data-src`. Empty attributes count as missing.
pub fn parse_episode_html(html: &str) -> ExtractedEpisode {
    let document = Html::parse_document(html);

    let iframe_src = [PLAYER_IFRAME_SELECTOR, FALLBACK_IFRAME_SELECTOR]
        .iter()
        .find_map(|selector| {
            first_attr(&document, selector, "src")
                .or_else(|| first_attr(&document, selector, "data-src"))
        });

    let download_url = first_attr(&document, DOWNLOAD_LINK_SELECTOR, "href");

    ExtractedEpisode {
        iframe_src,
        download_url,
    }
}

fn first_attr(document: &Html, selector: &str, attr: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;
    document
        .select(&selector)
        .next()?
        .value()
        .attr(attr)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
