//! Headless Chrome session shared by the whole crawl.
//!
//! One browser and one page are opened at startup and reused for every
//! episode. Uses chromiumoxide (CDP); either launches a local Chrome or
//! attaches to a remote DevTools endpoint.

#[cfg(feature = "browser")]
mod render;

#[cfg(feature = "browser")]
pub use render::PageExtractor;

use anyhow::Result;

use crate::config::BrowserSettings;

#[cfg(feature = "browser")]
use std::path::PathBuf;

#[cfg(feature = "browser")]
use anyhow::Context;
#[cfg(feature = "browser")]
use chromiumoxide::cdp::browser_protocol::network::SetUserAgentOverrideParams;
#[cfg(feature = "browser")]
use chromiumoxide::handler::{Handler, HandlerConfig};
#[cfg(feature = "browser")]
use chromiumoxide::{Browser, BrowserConfig, Page};
#[cfg(feature = "browser")]
use futures::StreamExt;
#[cfg(feature = "browser")]
use tokio::task::JoinHandle;
#[cfg(feature = "browser")]
use tracing::{debug, info, warn};

#[cfg(feature = "browser")]
use crate::config::{CDP_REQUEST_TIMEOUT, USER_AGENT};

/// A running browser with the single page used for extraction.
#[cfg(feature = "browser")]
pub struct BrowserSession {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
    remote: bool,
}

#[cfg(feature = "browser")]
impl BrowserSession {
    /// Common Chrome executable paths to check.
    const CHROME_PATHS: &'static [&'static str] = &[
        // Linux
        "/usr/bin/google-chrome",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
        "/snap/bin/chromium",
        // macOS
        "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        "/Applications/Chromium.app/Contents/MacOS/Chromium",
        // Common install locations
        "/opt/google/chrome/google-chrome",
    ];

    /// Launch (or connect to) a browser and open the extraction page.
    ///
    /// If opening the page fails, the browser is shut down before the
    /// error is returned.
    pub async fn launch(settings: &BrowserSettings) -> Result<Self> {
        let (Connected { browser, handler }, remote) = match settings.remote_url.as_deref() {
            Some(url) => (Self::connect_remote(url).await?, true),
            None => (Self::launch_local(settings).await?, false),
        };

        let handler = spawn_handler(handler);

        match open_page(&browser).await {
            Ok(page) => Ok(Self {
                browser,
                page,
                handler,
                remote,
            }),
            Err(e) => {
                shutdown(browser, handler, remote).await;
                Err(e)
            }
        }
    }

    /// Extractor bound to this session's page.
    pub fn extractor(&self) -> PageExtractor {
        PageExtractor::new(self.page.clone())
    }

    /// Close the page and the browser.
    ///
    /// A remote browser is only disconnected, never shut down.
    pub async fn close(self) {
        if let Err(e) = self.page.close().await {
            debug!("Failed to close page: {}", e);
        }
        shutdown(self.browser, self.handler, self.remote).await;
    }

    /// Find Chrome executable.
    fn find_chrome() -> Result<PathBuf> {
        for path in Self::CHROME_PATHS {
            let p = std::path::Path::new(path);
            if p.exists() {
                info!("Found Chrome at: {}", path);
                return Ok(p.to_path_buf());
            }
        }

        for cmd in &[
            "google-chrome",
            "google-chrome-stable",
            "chromium",
            "chromium-browser",
        ] {
            if let Ok(path) = which::which(cmd) {
                info!("Found Chrome in PATH: {}", path.display());
                return Ok(path);
            }
        }

        Err(anyhow::anyhow!(
            "Chrome/Chromium not found. Please install it:\n\
             - Arch/Manjaro: sudo pacman -S chromium\n\
             - Ubuntu/Debian: sudo apt install chromium-browser\n\
             - Fedora: sudo dnf install chromium\n\
             - Or set BROWSER_URL to a running Chrome DevTools endpoint"
        ))
    }

    async fn launch_local(settings: &BrowserSettings) -> Result<Connected> {
        info!("Launching browser (headless={})", settings.headless);

        let chrome_path = Self::find_chrome()?;

        let mut builder = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .request_timeout(CDP_REQUEST_TIMEOUT);

        // with_head means NOT headless
        if !settings.headless {
            builder = builder.with_head();
        }

        builder = builder
            .arg("--no-sandbox")
            .arg("--disable-setuid-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-gpu")
            .arg("--no-first-run")
            .arg("--no-default-browser-check");

        for arg in &settings.chrome_args {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build browser config: {}", e))?;

        let (browser, handler) = Browser::launch(config)
            .await
            .context("Failed to launch browser")?;

        Ok(Connected { browser, handler })
    }

    /// Connect to a remote Chrome instance.
    async fn connect_remote(url: &str) -> Result<Connected> {
        info!("Connecting to remote browser at {}", url);

        // Bare host endpoints still need the debugger URL from /json/version
        let ws_url = if url.contains("/devtools/") {
            url.to_string()
        } else {
            Self::resolve_debugger_url(url).await?
        };

        info!("Connecting to WebSocket: {}", ws_url);

        let handler_config = HandlerConfig {
            request_timeout: CDP_REQUEST_TIMEOUT,
            ..Default::default()
        };

        let (browser, handler) = Browser::connect_with_config(ws_url, handler_config)
            .await
            .context("Failed to connect to remote browser")?;

        Ok(Connected { browser, handler })
    }

    /// Get the WebSocket URL from the /json/version endpoint.
    async fn resolve_debugger_url(url: &str) -> Result<String> {
        let http_url = url
            .replace("ws://", "http://")
            .replace("wss://", "https://");
        let version_url = format!("{}/json/version", http_url.trim_end_matches('/'));

        let resp: serde_json::Value = reqwest::Client::new()
            .get(&version_url)
            .send()
            .await
            .context("Failed to connect to remote browser")?
            .json()
            .await
            .context("Failed to parse browser version info")?;

        resp.get("webSocketDebuggerUrl")
            .and_then(|v| v.as_str())
            .map(String::from)
            .ok_or_else(|| anyhow::anyhow!("No webSocketDebuggerUrl in response"))
    }
}

#[cfg(feature = "browser")]
struct Connected {
    browser: Browser,
    handler: Handler,
}

/// Drive the CDP event stream until the connection drops.
#[cfg(feature = "browser")]
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(h) = handler.next().await {
            if h.is_err() {
                break;
            }
        }
    })
}

#[cfg(feature = "browser")]
async fn open_page(browser: &Browser) -> Result<Page> {
    let page = browser
        .new_page("about:blank")
        .await
        .context("Failed to open browser page")?;

    // Set user agent before any navigation
    page.execute(SetUserAgentOverrideParams::new(USER_AGENT.to_string()))
        .await
        .context("Failed to set user agent")?;

    Ok(page)
}

#[cfg(feature = "browser")]
async fn shutdown(mut browser: Browser, handler: JoinHandle<()>, remote: bool) {
    if !remote {
        if let Err(e) = browser.close().await {
            warn!("Failed to close browser: {}", e);
        }
    }
    handler.abort();
    info!("Browser closed");
}

// Stub for when browser feature is disabled
#[cfg(not(feature = "browser"))]
pub struct BrowserSession;

#[cfg(not(feature = "browser"))]
impl BrowserSession {
    pub async fn launch(_settings: &BrowserSettings) -> Result<Self> {
        Err(anyhow::anyhow!(
            "Browser support not compiled. Rebuild with: cargo build --features browser"
        ))
    }

    pub fn extractor(&self) -> PageExtractor {
        PageExtractor
    }

    pub async fn close(self) {}
}

#[cfg(not(feature = "browser"))]
pub struct PageExtractor;

#[cfg(not(feature = "browser"))]
#[async_trait::async_trait]
impl crate::extract::EpisodeExtractor for PageExtractor {
    async fn extract(
        &self,
        _video_page_url: &str,
    ) -> Result<crate::extract::ExtractedEpisode, crate::extract::ExtractError> {
        Err(crate::extract::ExtractError::Browser(
            "browser support not compiled".to_string(),
        ))
    }
}
