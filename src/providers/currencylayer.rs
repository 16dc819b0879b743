//! Source adapter for the apilayer.net "live" currency endpoint.

use async_trait::async_trait;
use chrono::{SecondsFormat, TimeZone, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;

use super::util::get_body;
use crate::core::rate::{Currency, Rate, RateSource, SourceUnavailable};

pub struct CurrencyLayerSource {
    code: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl CurrencyLayerSource {
    pub fn new(code: &str, api_key: &str, base_url: &str, client: reqwest::Client) -> Self {
        CurrencyLayerSource {
            code: code.to_string(),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            client,
        }
    }

    fn quote(&self, quotes: &HashMap<String, f64>, pair: &str) -> Result<f64, SourceUnavailable> {
        let value = *quotes.get(pair).ok_or_else(|| {
            SourceUnavailable::new(&self.code, format!("Quote {pair} missing from response"))
        })?;
        if !value.is_finite() || value <= 0.0 {
            return Err(SourceUnavailable::new(
                &self.code,
                format!("Quote {pair} has implausible value {value}"),
            ));
        }
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct LiveResponse {
    success: bool,
    timestamp: Option<i64>,
    #[serde(default)]
    quotes: HashMap<String, f64>,
}

#[async_trait]
impl RateSource for CurrencyLayerSource {
    fn code(&self) -> &str {
        &self.code
    }

    #[instrument(name = "CurrencyLayerFetch", skip(self), fields(source = %self.code))]
    async fn rates(&self) -> Result<Vec<Rate>, SourceUnavailable> {
        let url = format!("{}/live", self.base_url);
        let query = [
            ("access_key", self.api_key.as_str()),
            ("currencies", "EUR,RUB"),
            ("source", "USD"),
        ];
        let body = get_body(&self.client, &url, &query, &self.code).await?;

        let response: LiveResponse = serde_json::from_str(&body).map_err(|e| {
            SourceUnavailable::new(&self.code, format!("Unable to decode response: {e}"))
        })?;

        if !response.success {
            return Err(SourceUnavailable::new(
                &self.code,
                "Response failed with false status code",
            ));
        }

        // The endpoint reports observation time as unix seconds.
        let updated_at = response
            .timestamp
            .and_then(|ts| Utc.timestamp_opt(ts, 0).single())
            .ok_or_else(|| {
                SourceUnavailable::new(&self.code, "Unable to parse last update time")
            })?
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let rub = self.quote(&response.quotes, "USDRUB")?;
        let eur = self.quote(&response.quotes, "USDEUR")?;

        Ok(vec![
            Rate {
                source: self.code.clone(),
                updated_at: updated_at.clone(),
                from: Currency::Usd,
                to: Currency::Rub,
                rate: rub,
            },
            Rate {
                source: self.code.clone(),
                updated_at,
                from: Currency::Usd,
                to: Currency::Eur,
                rate: eur,
            },
        ])
    }
}
