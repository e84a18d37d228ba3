//! Runtime settings and fixed crawl constants.
//!
//! Only the database location and browser connection are configurable.
//! Endpoints, timeouts and the user agent are compiled in.

use std::path::Path;
use std::time::Duration;

/// Discovery API endpoint; pages are requested with `?page=<n>`.
pub const API_BASE: &str = "https://api.henpro.fun/api/episodes";

/// Episode detail pages live at `VIDEO_BASE<episode_id>/`.
pub const VIDEO_BASE: &str = "https://watchhentai.net/videos/";

/// Static user agent for both the API client and the browser page.
pub const USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 Chrome/120 Safari/537.36";

/// Upper bound for a page navigation to reach DOMContentLoaded.
pub const NAVIGATION_TIMEOUT: Duration = Duration::from_secs(60);

/// Upper bound for the player iframe to receive its real `src`.
pub const RENDER_TIMEOUT: Duration = Duration::from_secs(60);

/// How long to wait for the browser to answer a navigation before relying on
/// the DOMContentLoaded poll alone.
pub const NAVIGATION_ACK_WAIT: Duration = Duration::from_secs(5);

/// CDP command timeout. Kept above `NAVIGATION_TIMEOUT` so a slow page
/// surfaces as a navigation timeout rather than a failed command.
pub const CDP_REQUEST_TIMEOUT: Duration = Duration::from_secs(90);

/// Interval between DOM readiness probes.
pub const POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Timeout for a single discovery API request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default database file name when `database_url` names a directory.
pub const DEFAULT_DATABASE_NAME: &str = "episodes.db";

/// Process settings.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// SQLite connection string: a file path, a `sqlite:` URL, or a directory.
    pub database_url: String,

    /// Database file name used when `database_url` is a directory.
    pub database_name: String,

    pub browser: BrowserSettings,
}

/// Browser launch settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BrowserSettings {
    /// Run in headless mode (default: true).
    pub headless: bool,

    /// Remote Chrome DevTools URL (e.g., "ws://localhost:9222").
    /// If set, connects to an existing browser instead of launching one.
    pub remote_url: Option<String>,

    /// Additional Chrome arguments for a locally launched browser.
    pub chrome_args: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            database_name: default_database_name(),
            browser: BrowserSettings::default(),
        }
    }
}

impl Default for BrowserSettings {
    fn default() -> Self {
        Self {
            headless: default_headless(),
            remote_url: None,
            chrome_args: Vec::new(),
        }
    }
}

impl Settings {
    /// Apply environment variable overrides.
    ///
    /// - `DATABASE_URL` - SQLite path, `sqlite:` URL, or data directory
    /// - `DATABASE_NAME` - database file name inside a data directory
    /// - `BROWSER_URL` - remote Chrome DevTools URL
    /// - `BROWSER_HEADLESS` - set to `false` to show the browser window
    /// - `BROWSER_ARGS` - extra Chrome flags, whitespace separated
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(val) = non_empty_env("DATABASE_URL") {
            self.database_url = val;
        }
        if let Some(val) = non_empty_env("DATABASE_NAME") {
            self.database_name = val;
        }
        if let Some(val) = non_empty_env("BROWSER_URL") {
            self.browser.remote_url = Some(val);
        }
        if let Some(val) = non_empty_env("BROWSER_HEADLESS") {
            self.browser.headless = !matches!(val.to_lowercase().as_str(), "0" | "false" | "no");
        }
        if let Some(val) = non_empty_env("BROWSER_ARGS") {
            self.browser.chrome_args = parse_chrome_args(&val);
        }
        self
    }

    /// Resolve the SQLite file path diesel should open.
    ///
    /// A `sqlite:` prefix is stripped. Anything that does not look like a
    /// database file is treated as a directory holding `database_name`.
    pub fn database_path(&self) -> String {
        let url = self
            .database_url
            .strip_prefix("sqlite://")
            .or_else(|| self.database_url.strip_prefix("sqlite:"))
            .unwrap_or(&self.database_url);

        if url == ":memory:" || looks_like_database_file(url) {
            return url.to_string();
        }

        Path::new(url)
            .join(&self.database_name)
            .display()
            .to_string()
    }
}

fn looks_like_database_file(url: &str) -> bool {
    Path::new(url)
        .extension()
        .is_some_and(|ext| ext == "db" || ext == "sqlite" || ext == "sqlite3")
}

fn parse_chrome_args(val: &str) -> Vec<String> {
    val.split_whitespace().map(String::from).collect()
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|s| !s.is_empty())
}

fn default_database_url() -> String {
    ".".to_string()
}

fn default_database_name() -> String {
    DEFAULT_DATABASE_NAME.to_string()
}

fn default_headless() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_default() {
        let settings = Settings::default();
        assert_eq!(settings.database_url, ".");
        assert_eq!(settings.database_name, "episodes.db");
        assert!(settings.browser.headless);
        assert!(settings.browser.remote_url.is_none());
    }

    #[test]
    fn test_parse_chrome_args() {
        assert_eq!(
            parse_chrome_args("--lang=en-US  --window-size=1280,720\n--mute-audio"),
            vec!["--lang=en-US", "--window-size=1280,720", "--mute-audio"]
        );
        assert!(parse_chrome_args("   ").is_empty());
    }

    #[test]
    fn test_cdp_timeout_outlasts_navigation_bound() {
        assert!(CDP_REQUEST_TIMEOUT > NAVIGATION_TIMEOUT);
        assert!(NAVIGATION_ACK_WAIT < NAVIGATION_TIMEOUT);
    }

    #[test]
    fn test_database_path_directory_with_custom_name() {
        let settings = Settings {
            database_url: "/var/lib/epharvest".to_string(),
            database_name: "feed.sqlite".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.database_path(), "/var/lib/epharvest/feed.sqlite");
    }

    #[test]
    fn test_database_path_file() {
        let settings = Settings {
            database_url: "sqlite:data/episodes.sqlite3".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.database_path(), "data/episodes.sqlite3");

        let settings = Settings {
            database_url: "sqlite:///tmp/x.db".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.database_path(), "/tmp/x.db");
    }

    #[test]
    fn test_database_path_directory() {
        let settings = Settings {
            database_url: "/srv/harvest".to_string(),
            database_name: "anime.db".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.database_path(), "/srv/harvest/anime.db");
    }

    #[test]
    fn test_database_path_memory() {
        let settings = Settings {
            database_url: ":memory:".to_string(),
            ..Default::default()
        };
        assert_eq!(settings.database_path(), ":memory:");
    }
}
