use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::Mutex;

use super::RateStore;
use crate::core::rate::Rate;

/// In-process append log. Used by tests and as the sink when no database is
/// configured.
#[derive(Default)]
pub struct MemoryStore {
    rates: Mutex<Vec<Rate>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn saved(&self) -> Vec<Rate> {
        self.rates.lock().await.clone()
    }
}

#[async_trait]
impl RateStore for MemoryStore {
    async fn save(&self, rates: &[Rate]) -> Result<()> {
        self.rates.lock().await.extend_from_slice(rates);
        Ok(())
    }
}
