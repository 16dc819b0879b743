//! Source adapter for https://currencyapi.com

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use std::collections::HashMap;
use tracing::instrument;

use super::util::get_body;
use crate::core::rate::{Currency, Rate, RateSource, SourceUnavailable};

pub struct CurrencyApiSource {
    code: String,
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl CurrencyApiSource {
    pub fn new(code: &str, api_key: &str, base_url: &str, client: reqwest::Client) -> Self {
        CurrencyApiSource {
            code: code.to_string(),
            api_key: api_key.to_string(),
            base_url: base_url.to_string(),
            client,
        }
    }

    fn value(
        &self,
        data: &HashMap<String, CurrencyData>,
        currency: &str,
    ) -> Result<f64, SourceUnavailable> {
        let value = data
            .get(currency)
            .ok_or_else(|| {
                SourceUnavailable::new(
                    &self.code,
                    format!("Currency {currency} missing from response"),
                )
            })?
            .value;
        if !value.is_finite() || value <= 0.0 {
            return Err(SourceUnavailable::new(
                &self.code,
                format!("Currency {currency} has implausible value {value}"),
            ));
        }
        Ok(value)
    }
}

#[derive(Debug, Deserialize)]
struct CurrencyData {
    value: f64,
}

#[derive(Debug, Deserialize)]
struct ResponseMeta {
    last_updated_at: String,
}

#[derive(Debug, Deserialize)]
struct LatestResponse {
    meta: ResponseMeta,
    #[serde(default)]
    data: HashMap<String, CurrencyData>,
}

#[async_trait]
impl RateSource for CurrencyApiSource {
    fn code(&self) -> &str {
        &self.code
    }

    #[instrument(name = "CurrencyApiFetch", skip(self), fields(source = %self.code))]
    async fn rates(&self) -> Result<Vec<Rate>, SourceUnavailable> {
        let url = format!("{}/v3/latest", self.base_url);
        let query = [
            ("apikey", self.api_key.as_str()),
            ("currencies", "EUR,RUB"),
            ("base_currency", "USD"),
        ];
        let body = get_body(&self.client, &url, &query, &self.code).await?;

        let response: LatestResponse = serde_json::from_str(&body).map_err(|e| {
            SourceUnavailable::new(&self.code, format!("Unable to decode response: {e}"))
        })?;

        // Reported as RFC 3339 with an offset; re-emit in UTC.
        let updated_at = DateTime::parse_from_rfc3339(&response.meta.last_updated_at)
            .map_err(|e| {
                SourceUnavailable::new(&self.code, format!("Unable to parse last update time: {e}"))
            })?
            .with_timezone(&Utc)
            .to_rfc3339_opts(SecondsFormat::Secs, true);

        let rub = self.value(&response.data, "RUB")?;
        let eur = self.value(&response.data, "EUR")?;

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
