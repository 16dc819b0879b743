use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{Connection, params};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

use super::RateStore;
use crate::core::rate::Rate;

/// Observation log backed by a sqlite file. Rows are only ever appended;
/// there is no upsert or dedup.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Opens the database and ensures the rates table exists.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref()).with_context(|| {
            format!("Failed to open database: {}", path.as_ref().display())
        })?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS rates (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                source TEXT,
                currency_from TEXT,
                currency_to TEXT,
                rate REAL,
                updated_at TIMESTAMP)",
            [],
        )
        .context("Failed to sync database schema")?;

        Ok(SqliteStore {
            conn: Mutex::new(conn),
        })
    }

    pub async fn count(&self) -> Result<u64> {
        let conn = self.conn.lock().await;
        let count = conn.query_row("SELECT COUNT(*) FROM rates", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[async_trait]
impl RateStore for SqliteStore {
    async fn save(&self, rates: &[Rate]) -> Result<()> {
        let conn = self.conn.lock().await;
        // One row per rate. A mid-batch failure propagates; rows inserted
        // before it stay committed.
        for rate in rates {
            conn.execute(
                "INSERT INTO rates (source, currency_from, currency_to, rate, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    rate.source,
                    rate.from.to_string(),
                    rate.to.to_string(),
                    rate.rate,
                    rate.updated_at,
                ],
            )
            .with_context(|| format!("Failed to insert rate from source {}", rate.source))?;
        }
        debug!(count = rates.len(), "Saved rates");
        Ok(())
    }
}
