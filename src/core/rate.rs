//! Exchange rate abstractions and core types

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;

/// Currencies the service understands. Serialized as the 3-letter ISO code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Rub,
    Eur,
}

impl Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Currency::Usd => "USD",
                Currency::Rub => "RUB",
                Currency::Eur => "EUR",
            }
        )
    }
}

impl FromStr for Currency {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "USD" => Ok(Currency::Usd),
            "RUB" => Ok(Currency::Rub),
            "EUR" => Ok(Currency::Eur),
            _ => Err(anyhow::anyhow!("Unsupported currency: {}", s)),
        }
    }
}

/// One exchange rate observation: `1 from == rate to`.
///
/// Constructed by a source from a single upstream response and never mutated
/// afterwards. `updated_at` is the upstream-reported observation time,
/// normalized to RFC 3339 in UTC.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rate {
    pub source: String,
    pub updated_at: String,
    pub from: Currency,
    pub to: Currency,
    pub rate: f64,
}

/// Failure of a single upstream source. Scoped to that source only; the
/// aggregator reads `code` to attribute the failure without parsing the
/// message.
#[derive(Debug, Clone, Error)]
#[error("Source {code} unavailable: {message}")]
pub struct SourceUnavailable {
    pub code: String,
    pub message: String,
}

impl SourceUnavailable {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// A provider of exchange rate data.
///
/// `rates` performs one outbound request and returns either the full set of
/// supported pairs or a [`SourceUnavailable`] error, never a partial result.
/// Retry policy, if any, belongs to the caller.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Stable identifier, used as the merge key and as the `source` tag on
    /// every rate this instance produces.
    fn code(&self) -> &str;

    async fn rates(&self) -> Result<Vec<Rate>, SourceUnavailable>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_currency_display_parse_roundtrip() {
        for (currency, code) in [
            (Currency::Usd, "USD"),
            (Currency::Rub, "RUB"),
            (Currency::Eur, "EUR"),
        ] {
            assert_eq!(currency.to_string(), code);
            assert_eq!(code.parse::<Currency>().unwrap(), currency);
        }

        assert!("GBP".parse::<Currency>().is_err());
        assert_eq!("rub".parse::<Currency>().unwrap(), Currency::Rub);
    }

    #[test]
    fn test_rate_wire_shape() {
        let rate = Rate {
            source: "currencyapi".to_string(),
            updated_at: "2024-01-01T00:00:00Z".to_string(),
            from: Currency::Usd,
            to: Currency::Rub,
            rate: 91.5,
        };

        let json = serde_json::to_value(&rate).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "source": "currencyapi",
                "updatedAt": "2024-01-01T00:00:00Z",
                "from": "USD",
                "to": "RUB",
                "rate": 91.5
            })
        );
    }

    #[test]
    fn test_source_unavailable_keeps_code() {
        let err = SourceUnavailable::new("currencylayer", "connection refused");
        assert_eq!(err.code, "currencylayer");
        assert_eq!(
            err.to_string(),
            "Source currencylayer unavailable: connection refused"
        );
    }
}
