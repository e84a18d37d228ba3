//! CLI commands implementation.

use anyhow::Context;
use clap::{Parser, Subcommand};
use console::style;
use tracing::info;

use crate::browser::BrowserSession;
use crate::config::Settings;
use crate::crawl::Crawler;
use crate::discovery::DiscoveryClient;
use crate::repository::DieselEpisodeRepository;

#[derive(Parser)]
#[command(name = "epharvest")]
#[command(about = "Incremental episode and video-stream URL harvester")]
#[command(version)]
pub struct Cli {
    /// SQLite database file, sqlite: URL, or data directory [env: DATABASE_URL]
    #[arg(long, global = true)]
    database_url: Option<String>,

    /// Database file name used inside a data directory [env: DATABASE_NAME]
    #[arg(long, global = true)]
    database_name: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Check if verbose mode is enabled (for early logging setup).
pub fn is_verbose() -> bool {
    std::env::args().any(|arg| arg == "-v" || arg == "--verbose")
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl the episode feed and store every new episode (default)
    Crawl,

    /// Show stored episode count and the most recent episodes
    Status {
        /// Number of recent episodes to list
        #[arg(short, long, default_value = "10")]
        limit: i64,
    },
}

impl Cli {
    /// Environment settings with command-line flags on top.
    fn settings(&self) -> Settings {
        let mut settings = Settings::default().with_env_overrides();
        if let Some(ref url) = self.database_url {
            settings.database_url = url.clone();
        }
        if let Some(ref name) = self.database_name {
            settings.database_name = name.clone();
        }
        settings
    }
}

/// Run the CLI.
pub async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = cli.settings();

    match cli.command.unwrap_or(Commands::Crawl) {
        Commands::Crawl => cmd_crawl(&settings).await,
        Commands::Status { limit } => cmd_status(&settings, limit).await,
    }
}

async fn cmd_crawl(settings: &Settings) -> anyhow::Result<()> {
    let discovery = DiscoveryClient::new().context("Failed to build HTTP client")?;

    let store = DieselEpisodeRepository::open(&settings.database_path())
        .await
        .context("Failed to open episode database")?;

    let browser = match BrowserSession::launch(&settings.browser).await {
        Ok(browser) => browser,
        Err(e) => {
            store.close().await;
            return Err(e.context("Failed to start browser"));
        }
    };

    let extractor = browser.extractor();
    let summary = Crawler::new(&discovery, &extractor, &store).run().await;

    browser.close().await;
    store.close().await;

    info!("Crawl complete: {}", summary);
    if summary.pages_failed > 0 {
        println!(
            "{} Discovery stopped early after {} pages",
            style("!").yellow(),
            summary.pages_fetched
        );
    }
    println!("{} Crawl complete: {}", style("✓").green(), summary);

    Ok(())
}

async fn cmd_status(settings: &Settings, limit: i64) -> anyhow::Result<()> {
    let db_path = settings.database_path();
    let store = DieselEpisodeRepository::open(&db_path)
        .await
        .context("Failed to open episode database")?;

    let count = store.count().await?;
    let recent = store.recent(limit).await?;
    store.close().await;

    println!("{:<30} {}", style("epharvest status").bold(), style(&db_path).dim());
    println!();
    println!("{:<30} {}", "Episodes stored:", count);

    if !recent.is_empty() {
        println!();
        println!("{}", style("RECENT").cyan().bold());
        for episode in recent {
            println!(
                "  {}  {}",
                style(episode.scraped_at.format("%Y-%m-%d %H:%M")).dim(),
                episode.episode_id
            );
            println!(
                "      {}",
                episode
                    .video_url
                    .as_deref()
                    .map(|u| style(u.to_string()).green())
                    .unwrap_or_else(|| style("(no video URL)".to_string()).red())
            );
        }
    }

    Ok(())
}
