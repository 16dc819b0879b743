//! Fan-out collection of rates across all registered sources.

use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, error, instrument};

use crate::core::rate::{Rate, RateSource, SourceUnavailable};
use crate::store::RateStore;

/// Turns N independent, possibly-failing source fetches into one best-effort
/// merged result. Source failures are logged and dropped; they never fail the
/// collection round.
pub struct Aggregator {
    sources: Vec<Arc<dyn RateSource>>,
    store: Option<Arc<dyn RateStore>>,
    fetch_timeout: Duration,
}

impl Aggregator {
    pub fn new(fetch_timeout: Duration) -> Self {
        Aggregator {
            sources: Vec::new(),
            store: None,
            fetch_timeout,
        }
    }

    pub fn add_source(mut self, source: Arc<dyn RateSource>) -> Self {
        self.sources.push(source);
        self
    }

    pub fn with_store(mut self, store: Arc<dyn RateStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Fetches every registered source concurrently and merges the surviving
    /// results. Returns after all fetches have completed or hit the deadline;
    /// total latency is bounded by the slowest source, not the sum.
    ///
    /// An empty result means no source had data this round, which is a valid
    /// outcome rather than an error.
    #[instrument(name = "Collect", skip(self), fields(sources = self.sources.len()))]
    pub async fn collect(&self) -> Vec<Rate> {
        let fetches = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            let deadline = self.fetch_timeout;
            async move {
                let result = match timeout(deadline, source.rates()).await {
                    Ok(result) => result,
                    Err(_) => Err(SourceUnavailable::new(
                        source.code(),
                        format!("No response within {}s", deadline.as_secs()),
                    )),
                };
                (source.code().to_string(), result)
            }
        });

        // Single join barrier; the map is owned by this task alone, so
        // concurrent fetches never share mutable state.
        let mut merged: HashMap<String, Vec<Rate>> = HashMap::new();
        for (code, result) in join_all(fetches).await {
            match result {
                Ok(rates) => {
                    debug!(source = %code, count = rates.len(), "Source fetch succeeded");
                    merged.insert(code, rates);
                }
                Err(err) => error!(source = %err.code, "Source error: {}", err.message),
            }
        }

        if let Some(store) = &self.store {
            for (code, batch) in &merged {
                if let Err(err) = store.save(batch).await {
                    error!(source = %code, "Error saving rates to store: {err:#}");
                }
            }
        }

        merged.into_values().flatten().collect()
    }
}
