//! taste-sync - music taste data behind an OAuth login
//!
//! Logs a user in against the music provider and serves their top tracks and
//! artists, refreshing stale data and writing it back in the background.

mod auth;
mod background;
mod cache;
mod config;
mod error;
mod models;
mod provider;
mod repository;
mod tastes;
#[cfg(test)]
mod testing;

use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use auth::{AuthFlow, StateStore, TokenCache, TokenSource};
use background::Background;
use cache::MemoryCache;
use config::{Config, StorageKind};
use provider::{Provider, SpotifyClient};
use repository::{FileRepository, MemoryRepository, Repository};
use tastes::TasteService;

#[derive(Parser)]
#[command(name = "taste-sync")]
#[command(about = "Fetch and cache a user's music taste from the provider", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with the provider and store the user's credentials
    Login {
        /// Callback URL to use instead of the configured redirect URI
        #[arg(long)]
        callback: Option<Url>,
    },

    /// Print a user's taste data as JSON
    Fetch {
        /// Data category: tracks, artists or genres
        category: String,

        /// User id (as printed by `login`)
        user_id: String,
    },

    /// Print the config file path
    ConfigPath,
}

/// Long-lived collaborators shared by the auth flow and the taste service.
struct App {
    auth: AuthFlow,
    tastes: TasteService,
    background: Background,
}

impl App {
    async fn build(config: &Config) -> Result<Self> {
        let state_cache = Arc::new(
            MemoryCache::new("state", config.cache.state_capacity, config.cache.state_ttl())
                .prune_batch(config.cache.prune_batch),
        );
        let token_cache = Arc::new(
            MemoryCache::new("token", config.cache.token_capacity, config.cache.token_ttl())
                .prune_batch(config.cache.prune_batch)
                .return_expired(true),
        );
        let tokens = TokenCache::new(token_cache, config.cache.token_ttl());

        let repository = open_repository(config).await?;
        let provider: Arc<dyn Provider> = Arc::new(SpotifyClient::new(&config.provider));
        let token_source: Arc<dyn TokenSource> = Arc::from(
            auth::source::from_config(&config.provider, &config.token_source)
                .context("Failed to set up token source")?,
        );
        let background = Background::new(config.background.max_in_flight);

        let default_callback = Url::parse(&config.provider.redirect_uri)
            .context("Invalid provider redirect_uri")?;

        let auth = AuthFlow::new(
            config.provider.name.clone(),
            default_callback,
            StateStore::new(state_cache),
            tokens.clone(),
            Arc::clone(&token_source),
            Arc::clone(&provider),
            Arc::clone(&repository),
            background.clone(),
        );
        let tastes = TasteService::new(
            repository,
            provider,
            token_source,
            tokens,
            background.clone(),
            config.refresh_ttl_days,
        );

        Ok(Self {
            auth,
            tastes,
            background,
        })
    }
}

async fn open_repository(config: &Config) -> Result<Arc<dyn Repository>> {
    match config.storage {
        StorageKind::File => {
            let data_dir = config.data_dir()?;
            let repository = FileRepository::open(&data_dir)
                .await
                .with_context(|| format!("Failed to open data directory {}", data_dir.display()))?;
            Ok(Arc::new(repository))
        }
        StorageKind::Memory => {
            tracing::warn!("Using in-memory storage; nothing is kept after exit");
            Ok(Arc::new(MemoryRepository::new()))
        }
    }
}

/// Pull `code` and `state` out of the URL the provider redirected to.
fn parse_callback(input: &str) -> Result<(String, String)> {
    let url = Url::parse(input.trim()).context("Not a valid URL")?;
    let param = |name: &str| {
        url.query_pairs()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.into_owned())
    };

    if let Some(error) = param("error") {
        bail!("Provider denied the login: {}", error);
    }
    let code = param("code").context("Callback URL has no `code` parameter")?;
    let state = param("state").context("Callback URL has no `state` parameter")?;
    Ok((code, state))
}

async fn login(app: &App, callback: Option<Url>) -> Result<()> {
    let redirect = app.auth.begin_login(callback.as_ref())?;

    println!();
    println!("Open this URL in your browser and log in:");
    println!();
    println!("  {}", redirect.url);
    println!();
    print!("Paste the URL you were redirected to: ");
    io::stdout().flush()?;

    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    let (code, state) = parse_callback(&line)?;

    if state != redirect.state {
        tracing::warn!("Callback state does not match this login attempt");
    }

    let profile = app.auth.complete_callback(&code, &state).await?;
    println!("{}", serde_json::to_string_pretty(&profile)?);
    Ok(())
}

async fn fetch(app: &App, category: &str, user_id: &str) -> Result<()> {
    match app.tastes.fetch(user_id, category).await {
        Ok(snapshot) => {
            println!("{}", serde_json::to_string_pretty(&snapshot)?);
            Ok(())
        }
        Err(e) => {
            let status = e.status();
            bail!("{} ({})", e, status)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    if let Commands::ConfigPath = cli.command {
        let path = match cli.config {
            Some(path) => path,
            None => Config::default_path()?,
        };
        println!("{}", path.display());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let app = App::build(&config).await?;

    let result = match cli.command {
        Commands::Login { callback } => {
            tracing::info!("Starting login flow...");
            login(&app, callback).await
        }
        Commands::Fetch { category, user_id } => fetch(&app, &category, &user_id).await,
        Commands::ConfigPath => Ok(()),
    };

    // Let queued writes land before the runtime shuts down
    if app.background.pending() > 0 {
        tracing::debug!("Waiting for {} background writes", app.background.pending());
    }
    app.background.drain().await;

    result
}
