//! Process configuration
//!
//! Loaded from `config.toml` in the platform config directory (or an explicit
//! path). Missing files fall back to defaults; provider secrets can be supplied
//! through the environment instead of the file.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const ENV_CLIENT_ID: &str = "TASTE_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "TASTE_CLIENT_SECRET";
const ENV_REDIRECT_URI: &str = "TASTE_REDIRECT_URI";

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum snapshot age, in days, before it is refreshed from the provider
    pub refresh_ttl_days: u32,
    pub provider: ProviderConfig,
    pub token_source: TokenSourceConfig,
    pub cache: CacheConfig,
    pub background: BackgroundConfig,
    pub storage: StorageKind,
    /// Where the file repository keeps its records (platform data dir if unset)
    pub data_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            refresh_ttl_days: 30,
            provider: ProviderConfig::default(),
            token_source: TokenSourceConfig::default(),
            cache: CacheConfig::default(),
            background: BackgroundConfig::default(),
            storage: StorageKind::default(),
            data_dir: None,
        }
    }
}

/// OAuth client and API endpoints of the music provider
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Short name, appended to callback URLs as `provider=<name>`
    pub name: String,
    /// Identifier stamped on snapshots
    pub source: String,
    pub client_id: String,
    pub client_secret: String,
    /// Default OAuth redirect URI
    pub redirect_uri: String,
    pub auth_url: String,
    pub token_url: String,
    pub api_base: String,
    pub scopes: Vec<String>,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "spotify".to_string(),
            source: "SPOTIFY".to_string(),
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://localhost:8080/callback".to_string(),
            auth_url: "https://accounts.spotify.com/authorize".to_string(),
            token_url: "https://accounts.spotify.com/api/token".to_string(),
            api_base: "https://api.spotify.com/v1".to_string(),
            scopes: vec!["user-top-read".to_string()],
        }
    }
}

/// Where access tokens come from
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum TokenSourceConfig {
    /// Authorization-code and refresh-token grants against the provider
    #[default]
    OAuth,
    /// Fixed token, for local runs
    Static {
        access_token: String,
        #[serde(default = "default_static_expiry")]
        expires_in: u64,
    },
}

fn default_static_expiry() -> u64 {
    3600
}

/// Backing store for snapshots and auth users
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// JSON files under `data_dir`
    #[default]
    File,
    /// Process memory only; everything is lost on exit
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub state_capacity: usize,
    pub state_ttl_secs: u64,
    pub token_capacity: usize,
    pub token_ttl_secs: u64,
    /// Entries dropped at once when a cache is full
    pub prune_batch: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            state_capacity: 1000,
            state_ttl_secs: 600,
            token_capacity: 1000,
            token_ttl_secs: 3600,
            prune_batch: 100,
        }
    }
}

impl CacheConfig {
    pub fn state_ttl(&self) -> Duration {
        Duration::from_secs(self.state_ttl_secs)
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackgroundConfig {
    /// Background writes allowed to run concurrently
    pub max_in_flight: usize,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self { max_in_flight: 64 }
    }
}

impl Config {
    fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("com", "taste-sync", "taste-sync")
            .context("Could not determine config directory")
    }

    /// Default config file path
    pub fn default_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.config_dir().join("config.toml"))
    }

    /// Load configuration from `path` (or the default location), then apply
    /// environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };

        let mut config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            Self::parse(&content)?
        } else {
            tracing::debug!("No config file at {}, using defaults", path.display());
            Self::default()
        };

        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        if let Some(v) = var(ENV_CLIENT_ID) {
            self.provider.client_id = v;
        }
        if let Some(v) = var(ENV_CLIENT_SECRET) {
            self.provider.client_secret = v;
        }
        if let Some(v) = var(ENV_REDIRECT_URI) {
            self.provider.redirect_uri = v;
        }
    }

    /// Directory for persisted records
    pub fn data_dir(&self) -> Result<PathBuf> {
        match &self.data_dir {
            Some(dir) => Ok(dir.clone()),
            None => Ok(Self::project_dirs()?.data_dir().to_path_buf()),
        }
    }
}
