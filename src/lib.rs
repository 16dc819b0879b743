pub mod aggregator;
pub mod api;
pub mod core;
pub mod providers;
pub mod store;

use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::aggregator::Aggregator;
use crate::core::config::AppConfig;
use crate::providers::currencyapi::CurrencyApiSource;
use crate::providers::currencylayer::CurrencyLayerSource;
use crate::store::sqlite::SqliteStore;

pub async fn run(config_path: Option<&str>) -> Result<()> {
    info!("Rate server starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let aggregator = build_aggregator(&config)?;
    let state = api::AppState {
        aggregator: Arc::new(aggregator),
    };

    api::serve(&config.server.address, state).await
}

/// Builds the aggregator from config: one source per configured provider
/// section, sharing one outbound HTTP client, plus the sqlite sink when a
/// database path is set.
pub fn build_aggregator(config: &AppConfig) -> Result<Aggregator> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("ratehub/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("Failed to build HTTP client")?;

    let mut aggregator = Aggregator::new(Duration::from_secs(config.fetch_timeout_secs));

    if let Some(source_config) = &config.sources.currencylayer {
        aggregator = aggregator.add_source(Arc::new(CurrencyLayerSource::new(
            "currencylayer",
            &source_config.api_key,
            &source_config.base_url,
            client.clone(),
        )));
    }
    if let Some(source_config) = &config.sources.currencyapi {
        aggregator = aggregator.add_source(Arc::new(CurrencyApiSource::new(
            "currencyapi",
            &source_config.api_key,
            &source_config.base_url,
            client.clone(),
        )));
    }
    if config.sources.currencylayer.is_none() && config.sources.currencyapi.is_none() {
        warn!("No sources configured; every collection round will be empty");
    }

    if let Some(database) = &config.database {
        aggregator = aggregator.with_store(Arc::new(SqliteStore::open(&database.path)?));
    }

    Ok(aggregator)
}
