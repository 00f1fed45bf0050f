use belltower_client::{FileStore, NotificationCache, NotificationStore};
use belltower_core::FetchParams;
use belltower_sdk::NotificationsClient;
use clap::{Parser, Subcommand};
use dotenvy::dotenv;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use tracing_subscriber::{EnvFilter, fmt};

mod commands;
mod config;

use config::{CliConfig, config_from_env};

#[derive(Parser)]
#[command(name = "belltower")]
#[command(about = "Belltower notification client")]
struct Cli {
    /// Server base URL (overrides BELLTOWER_SERVER)
    #[arg(short, long)]
    server: Option<String>,

    /// Offline cache directory (overrides BELLTOWER_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Bearer token (overrides BELLTOWER_TOKEN)
    #[arg(long)]
    token: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and list notifications
    List {
        /// Only unread notifications
        #[arg(long)]
        unread: bool,
        /// Only notifications of this type
        #[arg(long)]
        kind: Option<String>,
    },
    /// Poll the server until interrupted
    Watch {
        /// Poll interval in seconds (overrides BELLTOWER_POLL_SECS)
        #[arg(long)]
        interval: Option<u64>,
    },
    /// Mark a notification as read
    Read {
        /// Notification ID
        id: String,
    },
    /// Mark every notification as read
    ReadAll,
    /// Remove a notification
    Remove {
        /// Notification ID
        id: String,
    },
    /// Clear the local notification list
    Clear,
    /// Add a local notification
    Add {
        /// Notification title
        title: String,
        /// Notification message
        message: String,
        /// Notification type
        #[arg(long)]
        kind: Option<String>,
        /// Extra JSON data
        #[arg(long)]
        data: Option<String>,
    },
    /// List notifications grouped by date
    Groups,
}

impl Cli {
    fn apply_overrides(&self, mut config: CliConfig) -> CliConfig {
        if let Some(server) = &self.server {
            config.app.server_url = server.clone();
        }
        if let Some(cache_dir) = &self.cache_dir {
            config.cache_dir = cache_dir.clone();
        }
        if let Some(token) = &self.token {
            config.app.token = Some(token.clone());
        }
        config
    }
}

fn build_store(config: &CliConfig, params: FetchParams) -> Arc<NotificationStore> {
    let app = &config.app;

    let mut client = NotificationsClient::new(&app.server_url)
        .with_timeout(Duration::from_secs(app.timeout_seconds));
    if let Some(token) = &app.token {
        client = client.with_token(token);
    }

    let cache = NotificationCache::new(
        Arc::new(FileStore::new(config.cache_dir.clone())),
        &app.storage_key,
    )
    .with_limit(app.cache_limit);

    let store = NotificationStore::new(Arc::new(client), cache)
        .with_params(params)
        .with_new_activity_window(Duration::from_secs(app.new_activity_seconds));
    Arc::new(store)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = cli.apply_overrides(config_from_env()?);
    debug!(
        server = %config.app.server_url,
        cache_dir = %config.cache_dir.display(),
        "configuration loaded"
    );

    let params = match &cli.command {
        Commands::List { unread: true, .. } => FetchParams {
            unread_only: true,
            ..Default::default()
        },
        _ => FetchParams::default(),
    };
    let store = build_store(&config, params);

    match cli.command {
        Commands::List { unread, kind } => commands::list(&store, unread, kind).await,
        Commands::Watch { interval } => {
            let secs = interval.unwrap_or(config.app.poll_interval_seconds).max(1);
            commands::watch_notifications(store, Duration::from_secs(secs)).await?;
        }
        Commands::Read { id } => commands::mark_read(&store, &id).await,
        Commands::ReadAll => commands::mark_all_read(&store).await,
        Commands::Remove { id } => commands::remove(&store, &id).await,
        Commands::Clear => commands::clear(&store),
        Commands::Add {
            title,
            message,
            kind,
            data,
        } => commands::add(&store, kind, &title, &message, data)?,
        Commands::Groups => commands::groups(&store).await,
    }

    Ok(())
}
