pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;

use crate::core::rate::Rate;

/// Append-only sink for fetched rates. Every successful fetch produces new
/// rows, even when values are unchanged since the previous round.
#[async_trait]
pub trait RateStore: Send + Sync {
    async fn save(&self, rates: &[Rate]) -> Result<()>;
}
