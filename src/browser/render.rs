//! Episode page navigation and the player render barrier.

use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::Page;
use tracing::debug;

use crate::config::{NAVIGATION_ACK_WAIT, NAVIGATION_TIMEOUT, POLL_INTERVAL, RENDER_TIMEOUT};
use crate::extract::{parse_episode_html, EpisodeExtractor, ExtractError, ExtractedEpisode};

/// Tags the current document so readiness checks can tell it apart from
/// the one being navigated to.
const MARK_STALE_SCRIPT: &str = "window.__epharvestStale = true; true";

/// True once a fresh document has parsed its initial HTML (DOMContentLoaded).
const DOCUMENT_READY_SCRIPT: &str =
    "window.__epharvestStale !== true && document.readyState !== 'loading'";

/// True once the player iframe has been given its real source.
const PLAYER_READY_SCRIPT: &str = r#"
    (() => {
        const iframe = document.querySelector('#search_iframe');
        if (!iframe) return false;
        const src = iframe.getAttribute('src');
        return !!src && src !== 'about:blank';
    })()
"#;

/// Extracts episodes through a single reused browser page.
#[derive(Clone)]
pub struct PageExtractor {
    page: Page,
}

impl PageExtractor {
    pub(crate) fn new(page: Page) -> Self {
        Self { page }
    }

    /// Navigate and wait for DOMContentLoaded, bounded by `NAVIGATION_TIMEOUT`.
    async fn navigate(&self, url: &str) -> Result<(), ExtractError> {
        debug!("Navigating to {}", url);

        let nav_params = NavigateParams::builder()
            .url(url)
            .build()
            .map_err(|reason| ExtractError::Navigation {
                url: url.to_string(),
                reason,
            })?;

        let load = async {
            self.page
                .evaluate(MARK_STALE_SCRIPT.to_string())
                .await
                .map_err(|e| ExtractError::Browser(e.to_string()))?;

            // Page.navigate is only answered once the frame has fully loaded.
            // Give it a short window to report early failures, then gate on
            // DOMContentLoaded ourselves.
            let ack = match tokio::time::timeout(
                NAVIGATION_ACK_WAIT,
                self.page.execute(nav_params),
            )
            .await
            {
                Ok(Ok(response)) => Some(Ok(response.result.error_text.clone())),
                Ok(Err(e)) => Some(Err(e.to_string())),
                Err(_) => None,
            };
            check_navigation_ack(url, ack)?;

            poll_until(&self.page, DOCUMENT_READY_SCRIPT).await;
            Ok(())
        };

        tokio::time::timeout(NAVIGATION_TIMEOUT, load)
            .await
            .map_err(|_| ExtractError::NavigationTimeout {
                url: url.to_string(),
                secs: NAVIGATION_TIMEOUT.as_secs(),
            })?
    }

    /// Block until the player iframe has a real `src`, bounded by `RENDER_TIMEOUT`.
    async fn wait_for_player(&self, url: &str) -> Result<(), ExtractError> {
        wait_for(&self.page, PLAYER_READY_SCRIPT, RENDER_TIMEOUT)
            .await
            .then_some(())
            .ok_or_else(|| ExtractError::RenderTimeout {
                url: url.to_string(),
                secs: RENDER_TIMEOUT.as_secs(),
            })
    }
}

#[async_trait]
impl EpisodeExtractor for PageExtractor {
    async fn extract(&self, video_page_url: &str) -> Result<ExtractedEpisode, ExtractError> {
        self.navigate(video_page_url).await?;
        self.wait_for_player(video_page_url).await?;

        let html = self
            .page
            .content()
            .await
            .map_err(|e| ExtractError::Browser(e.to_string()))?;

        Ok(parse_episode_html(&html))
    }
}

/// Interpret the answer to Page.navigate.
///
/// `None` means the browser has not answered yet, which is the normal case
/// for any page that is still loading subresources.
fn check_navigation_ack(
    url: &str,
    ack: Option<Result<Option<String>, String>>,
) -> Result<(), ExtractError> {
    match ack {
        None | Some(Ok(None)) => Ok(()),
        Some(Ok(Some(reason))) | Some(Err(reason)) => Err(ExtractError::Navigation {
            url: url.to_string(),
            reason,
        }),
    }
}

/// Poll `script` until it evaluates to true or `timeout` elapses.
async fn wait_for(page: &Page, script: &str, timeout: Duration) -> bool {
    tokio::time::timeout(timeout, poll_until(page, script))
        .await
        .is_ok()
}

async fn poll_until(page: &Page, script: &str) {
    loop {
        if probe(page, script).await {
            return;
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// Evaluate a boolean expression in the page. Errors count as "not yet";
/// the execution context is torn down while a navigation commits.
async fn probe(page: &Page, script: &str) -> bool {
    match page.evaluate(script.to_string()).await {
        Ok(result) => result.into_value::<bool>().unwrap_or(false),
        Err(e) => {
            debug!("Readiness probe failed: {}", e);
            false
        }
    }
}
