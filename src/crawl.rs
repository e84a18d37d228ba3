//! Crawl driver.
//!
//! Walks the discovery API page by page and sends every episode that is not
//! yet stored through extraction, decoding and persistence. Everything runs
//! sequentially on one browser page and one database connection.
//!
//! A failing episode is logged and skipped; it never ends the crawl. A
//! failing discovery page ends pagination because the page count is unknown
//! without it.

use std::fmt;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::VIDEO_BASE;
use crate::decode::extract_video_url;
use crate::discovery::DiscoveryApi;
use crate::extract::{EpisodeExtractor, ExtractError};
use crate::models::{video_page_url, EpisodeRecord};
use crate::repository::{EpisodeStore, StoreError};

/// Failure while handling a single episode.
#[derive(Debug, Error)]
pub enum EpisodeError {
    #[error("episode entry has no link")]
    EmptyLink,
    #[error(transparent)]
    Extract(#[from] ExtractError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Counters for a finished crawl.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CrawlSummary {
    pub pages_fetched: u32,
    pub pages_failed: u32,
    pub discovered: usize,
    pub skipped: usize,
    pub saved: usize,
    pub failed: usize,
}

impl fmt::Display for CrawlSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} pages, {} episodes seen, {} saved, {} skipped, {} failed",
            self.pages_fetched, self.discovered, self.saved, self.skipped, self.failed
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Skipped,
    Saved,
}

/// `[Page n/total]` log prefix.
#[derive(Clone, Copy)]
struct PageContext {
    page: u32,
    total: u32,
}

impl fmt::Display for PageContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[Page {}/{}]", self.page, self.total)
    }
}

/// Sequential crawl over borrowed collaborators.
pub struct Crawler<'a> {
    discovery: &'a dyn DiscoveryApi,
    extractor: &'a dyn EpisodeExtractor,
    store: &'a dyn EpisodeStore,
    video_base: String,
}

impl<'a> Crawler<'a> {
    pub fn new(
        discovery: &'a dyn DiscoveryApi,
        extractor: &'a dyn EpisodeExtractor,
        store: &'a dyn EpisodeStore,
    ) -> Self {
        Self {
            discovery,
            extractor,
            store,
            video_base: VIDEO_BASE.to_string(),
        }
    }

    /// Override the detail page base URL.
    pub fn with_video_base(mut self, video_base: impl Into<String>) -> Self {
        self.video_base = video_base.into();
        self
    }

    /// Traverse all discovery pages and process every unseen episode.
    ///
    /// `total_pages` is re-read from every response, so a feed that grows
    /// while the crawl is running is followed to its latest reported end.
    pub async fn run(&self) -> CrawlSummary {
        let mut summary = CrawlSummary::default();
        let mut page = 1u32;
        let mut total_pages = 1u32;

        while page <= total_pages {
            info!("Fetching API page {} / {}", page, total_pages);

            let listing = match self.discovery.fetch_page(page).await {
                Ok(listing) => listing,
                Err(e) => {
                    error!("Discovery failed on page {}: {}", page, e);
                    summary.pages_failed += 1;
                    break;
                }
            };

            total_pages = listing.total_pages;
            summary.pages_fetched += 1;

            let ctx = PageContext {
                page,
                total: total_pages,
            };

            for entry in &listing.data.recent_episodes {
                summary.discovered += 1;

                let link = entry.link.as_deref();
                match self.process_episode(link, ctx).await {
                    Ok(Outcome::Skipped) => summary.skipped += 1,
                    Ok(Outcome::Saved) => summary.saved += 1,
                    Err(e) => {
                        summary.failed += 1;
                        error!("{} Failed: {}: {}", ctx, link.unwrap_or("<no link>"), e);
                    }
                }
            }

            page += 1;
        }

        summary
    }

    async fn process_episode(
        &self,
        link: Option<&str>,
        ctx: PageContext,
    ) -> Result<Outcome, EpisodeError> {
        let episode_id = link
            .filter(|id| !id.is_empty())
            .ok_or(EpisodeError::EmptyLink)?;

        if self.store.exists(episode_id).await? {
            info!("{} Skipped: {}", ctx, episode_id);
            return Ok(Outcome::Skipped);
        }

        info!("{} -> Episode: {}", ctx, episode_id);

        let page_url = video_page_url(&self.video_base, episode_id);
        let extracted = self.extractor.extract(&page_url).await?;
        let video_url = extract_video_url(extracted.iframe_src.as_deref());

        if video_url.is_none() {
            warn!(
                "{} No video URL resolved for {} (iframe: {:?})",
                ctx, episode_id, extracted.iframe_src
            );
        }

        let record = EpisodeRecord::from_extraction(episode_id, page_url, extracted, video_url);

        if !self.store.insert(&record).await? {
            info!("{} Already stored: {}", ctx, episode_id);
            return Ok(Outcome::Skipped);
        }

        info!("{} Saved: {}", ctx, episode_id);
        Ok(Outcome::Saved)
    }
}
