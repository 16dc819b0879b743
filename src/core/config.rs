use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_CURRENCYLAYER_URL: &str = "http://apilayer.net/api";
pub const DEFAULT_CURRENCYAPI_URL: &str = "https://api.currencyapi.com";

fn default_address() -> String {
    "127.0.0.1:8080".to_string()
}

fn default_fetch_timeout_secs() -> u64 {
    10
}

fn default_currencylayer_url() -> String {
    DEFAULT_CURRENCYLAYER_URL.to_string()
}

fn default_currencyapi_url() -> String {
    DEFAULT_CURRENCYAPI_URL.to_string()
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_address")]
    pub address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: default_address(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CurrencyLayerConfig {
    pub api_key: String,
    #[serde(default = "default_currencylayer_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CurrencyApiConfig {
    pub api_key: String,
    #[serde(default = "default_currencyapi_url")]
    pub base_url: String,
}

/// Upstream sources to register. An omitted section leaves that source
/// unregistered.
#[derive(Debug, Deserialize, Serialize, Clone, Default)]
pub struct SourcesConfig {
    pub currencylayer: Option<CurrencyLayerConfig>,
    pub currencyapi: Option<CurrencyApiConfig>,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// Optional append-only rate log. Omit to disable persistence.
    pub database: Option<DatabaseConfig>,
    #[serde(default)]
    pub sources: SourcesConfig,
    /// Deadline for a single source fetch. A source that exceeds it is
    /// treated as unavailable for that collection round.
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "ratehub", "ratehub")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
