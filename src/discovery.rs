//! Discovery API client.
//!
//! `GET <base>?page=<n>` returns one page of recent episodes together with
//! the current total page count.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::config::{API_BASE, REQUEST_TIMEOUT, USER_AGENT};

/// One page of discovery results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryPage {
    pub data: DiscoveryData,
    /// Missing counts as zero, which ends pagination after this page.
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryData {
    #[serde(default)]
    pub recent_episodes: Vec<EpisodeEntry>,
}

/// A listed episode. Only `link` is used; it doubles as the episode id.
///
/// Entries are read leniently: a missing, null or non-string `link` (or an
/// entry that is not an object at all) yields `None` so the crawler can
/// fail that one episode instead of the whole page.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub struct EpisodeEntry {
    pub link: Option<String>,
}

impl EpisodeEntry {
    pub fn new(link: impl Into<String>) -> Self {
        Self {
            link: Some(link.into()),
        }
    }
}

impl From<serde_json::Value> for EpisodeEntry {
    fn from(value: serde_json::Value) -> Self {
        Self {
            link: value
                .get("link")
                .and_then(|v| v.as_str())
                .map(String::from),
        }
    }
}

#[derive(Debug, Error)]
pub enum DiscoveryError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Discovery API returned HTTP {status} for {url}")]
    Status { status: u16, url: String },
    #[error("Invalid discovery response for page {page}: {source}")]
    Decode {
        page: u32,
        #[source]
        source: serde_json::Error,
    },
}

/// Source of paginated episode listings.
#[async_trait]
pub trait DiscoveryApi: Send + Sync {
    async fn fetch_page(&self, page: u32) -> Result<DiscoveryPage, DiscoveryError>;
}

/// reqwest-backed discovery client.
#[derive(Clone)]
pub struct DiscoveryClient {
    client: Client,
    base_url: String,
}

impl DiscoveryClient {
    /// Client for the production API.
    pub fn new() -> Result<Self, DiscoveryError> {
        Self::with_base_url(API_BASE)
    }

    /// Client for an alternate endpoint (used by tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Result<Self, DiscoveryError> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into(),
        })
    }

    pub fn page_url(&self, page: u32) -> String {
        format!("{}?page={}", self.base_url, page)
    }
}

#[async_trait]
impl DiscoveryApi for DiscoveryClient {
    async fn fetch_page(&self, page: u32) -> Result<DiscoveryPage, DiscoveryError> {
        let url = self.page_url(page);
        debug!("Fetching discovery page {}: {}", page, url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DiscoveryError::Status {
                status: status.as_u16(),
                url,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|source| DiscoveryError::Decode { page, source })
    }
}
