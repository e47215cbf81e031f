use serde::{Deserialize, Serialize};

/// Response of the API's `/health` endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct HealthStatus {
    pub status: String,
    pub service: String,
    pub timestamp: String,
}

impl HealthStatus {
    pub fn is_healthy(&self) -> bool {
        self.status.eq_ignore_ascii_case("healthy")
    }
}

/// Latest quote for a currency pair. The upstream feed sends prices as
/// strings and any of them may be missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct ExchangeRate {
    pub symbol: String,
    #[serde(default)]
    pub ask: Option<String>,
    #[serde(default)]
    pub bid: Option<String>,
    #[serde(default)]
    pub high: Option<String>,
    #[serde(default)]
    pub low: Option<String>,
    #[serde(default)]
    pub last: Option<String>,
}

impl ExchangeRate {
    /// Best available single price: last trade, else the bid/ask midpoint.
    pub fn reference_price(&self) -> Option<f64> {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse::<f64>().ok());
        parse(&self.last).or_else(|| match (parse(&self.bid), parse(&self.ask)) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            (Some(one), None) | (None, Some(one)) => Some(one),
            (None, None) => None,
        })
    }
}
