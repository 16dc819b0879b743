//! HTTP surface: one endpoint serving the merged rate snapshot.

use anyhow::{Context, Result};
use axum::{Json, Router, extract::State, routing::get};
use serde::Serialize;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::aggregator::Aggregator;
use crate::core::rate::Rate;

#[derive(Clone)]
pub struct AppState {
    pub aggregator: Arc<Aggregator>,
}

#[derive(Debug, Serialize)]
pub struct RatesResponse {
    pub rates: Vec<Rate>,
}

pub fn app_router(state: AppState) -> Router {
    Router::new()
        .route("/api/rate", get(get_rates))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Runs one collection round and serializes the merged snapshot. A round
/// where every source failed still answers 200 with an empty list.
async fn get_rates(State(state): State<AppState>) -> Json<RatesResponse> {
    let rates = state.aggregator.collect().await;
    Json(RatesResponse { rates })
}

pub async fn serve(address: &str, state: AppState) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Listening on {}", address);

    axum::serve(listener, app_router(state))
        .await
        .context("Server error")?;
    Ok(())
}
