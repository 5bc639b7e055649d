use async_trait::async_trait;
use chrono::NaiveDateTime;
use reqwest::Client;
use serde::Deserialize;

use crate::config::Config;
use crate::error::MarketDataError;
use crate::models::{Bar, Timeframe};
use crate::providers::MarketData;

const BASE_URL: &str = "https://api.twelvedata.com";

#[derive(Debug, Deserialize)]
struct TimeSeriesResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    code: Option<u32>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    values: Vec<RawValue>,
}

#[derive(Debug, Deserialize)]
struct RawValue {
    datetime: String,
    open: String,
    high: String,
    low: String,
    close: String,
    #[serde(default)]
    volume: Option<String>,
}

/// TwelveData time-series client, used for forex symbols (and crypto
/// pairs outside Bybit).
pub struct TwelveDataClient {
    client: Client,
    api_key: String,
}

impl TwelveDataClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: cfg.twelvedata_api_key.clone(),
        }
    }

    fn classify_api_error(code: Option<u32>, message: String) -> MarketDataError {
        match code {
            Some(429) => MarketDataError::RateLimited(message),
            Some(400) | Some(404) if message.to_lowercase().contains("symbol") => {
                MarketDataError::SymbolNotFound(message)
            }
            _ => MarketDataError::Network(message),
        }
    }
}

#[async_trait]
impl MarketData for TwelveDataClient {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>, MarketDataError> {
        let resp = self
            .client
            .get(format!("{}/time_series", BASE_URL))
            .query(&[
                ("symbol", symbol),
                ("interval", timeframe.twelvedata_interval()),
                ("outputsize", &lookback.to_string()),
                ("apikey", &self.api_key),
            ])
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        if resp.status().as_u16() == 429 {
            return Err(MarketDataError::RateLimited("HTTP 429".to_string()));
        }

        let data: TimeSeriesResponse = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Network(format!("bad time_series payload: {e}")))?;

        if data.status != "ok" {
            let message = data.message.unwrap_or_else(|| "unknown API error".to_string());
            return Err(Self::classify_api_error(data.code, message));
        }

        Ok(parse_bars(data.values))
    }
}

/// TwelveData returns newest first; the snapshot builder wants oldest
/// first. Unparseable rows are skipped.
fn parse_bars(values: Vec<RawValue>) -> Vec<Bar> {
    let mut bars: Vec<Bar> = values
        .into_iter()
        .filter_map(|rv| {
            let naive = NaiveDateTime::parse_from_str(&rv.datetime, "%Y-%m-%d %H:%M:%S").ok()?;
            Some(Bar {
                timestamp: naive.and_utc(),
                open: rv.open.parse().ok()?,
                high: rv.high.parse().ok()?,
                low: rv.low.parse().ok()?,
                close: rv.close.parse().ok()?,
                volume: rv
                    .volume
                    .as_deref()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(0.0),
            })
        })
        .collect();
    bars.sort_by_key(|b| b.timestamp);
    bars
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_error_classification() {
        let e = TwelveDataClient::classify_api_error(Some(429), "limit".to_string());
        assert!(matches!(e, MarketDataError::RateLimited(_)));

        let e = TwelveDataClient::classify_api_error(
            Some(400),
            "symbol EUR/XYZ not found".to_string(),
        );
        assert!(matches!(e, MarketDataError::SymbolNotFound(_)));

        let e = TwelveDataClient::classify_api_error(Some(500), "oops".to_string());
        assert!(matches!(e, MarketDataError::Network(_)));
    }

    #[test]
    fn payload_parses_and_sorts_oldest_first() {
        let json = r#"{
            "status": "ok",
            "values": [
                {"datetime": "2024-01-15 12:02:00", "open": "1.0950", "high": "1.0955", "low": "1.0948", "close": "1.0952"},
                {"datetime": "2024-01-15 12:01:00", "open": "1.0948", "high": "1.0951", "low": "1.0946", "close": "1.0950", "volume": "1200"}
            ]
        }"#;
        let data: TimeSeriesResponse = serde_json::from_str(json).unwrap();
        assert_eq!(data.status, "ok");

        let bars = parse_bars(data.values);
        assert_eq!(bars.len(), 2);
        assert!((bars[0].close - 1.0950).abs() < 1e-9);
        assert!((bars[0].volume - 1200.0).abs() < 1e-9);
        assert!(bars[0].timestamp < bars[1].timestamp);
    }
}
