use async_trait::async_trait;
use chrono::DateTime;
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::Config;
use crate::error::{ExecError, MarketDataError};
use crate::models::{Bar, OrderAck, OrderRequest, OrderType, Side, Timeframe};
use crate::providers::{MarketData, OrderAdapter};

const BASE_URL: &str = "https://api.bybit.com";
const RECV_WINDOW: &str = "5000";

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiResponse<T> {
    ret_code: i64,
    ret_msg: String,
    result: Option<T>,
}

#[derive(Debug, Deserialize)]
struct KlineResult {
    /// Rows of [startMs, open, high, low, close], newest first.
    list: Vec<Vec<String>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResult {
    order_id: String,
}

/// Bybit v5 client: public mark-price klines for market data, signed
/// order placement for execution.
pub struct BybitClient {
    client: Client,
    api_key: String,
    api_secret: String,
}

impl BybitClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: cfg.bybit_api_key.clone(),
            api_secret: cfg.bybit_api_secret.clone(),
        }
    }

    /// v5 signature: HMAC-SHA256 over `timestamp + api_key + recv_window
    /// + payload`, hex encoded.
    fn sign(&self, timestamp: u64, payload: &str) -> Result<String, ExecError> {
        let message = format!("{timestamp}{}{RECV_WINDOW}{payload}", self.api_key);
        let mut mac = HmacSha256::new_from_slice(self.api_secret.as_bytes())
            .map_err(|e| ExecError::Permanent(format!("bad API secret: {e}")))?;
        mac.update(message.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    fn now_ms() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    fn classify_exec_error(ret_code: i64, ret_msg: String) -> ExecError {
        match ret_code {
            // Rate limit / system busy codes.
            10006 | 10016 | 10018 => ExecError::Transient(ret_msg),
            // Auth and permission failures.
            10003 | 10004 | 10005 | 33004 => ExecError::Permanent(format!("auth: {ret_msg}")),
            // Insufficient balance.
            110007 | 110012 => ExecError::Permanent(format!("balance: {ret_msg}")),
            _ => ExecError::Permanent(ret_msg),
        }
    }

    async fn post_signed(
        &self,
        path: &str,
        body: serde_json::Value,
    ) -> Result<serde_json::Value, ExecError> {
        let payload = body.to_string();
        let timestamp = Self::now_ms();
        let signature = self.sign(timestamp, &payload)?;

        let resp = self
            .client
            .post(format!("{BASE_URL}{path}"))
            .header("X-BAPI-API-KEY", &self.api_key)
            .header("X-BAPI-TIMESTAMP", timestamp.to_string())
            .header("X-BAPI-RECV-WINDOW", RECV_WINDOW)
            .header("X-BAPI-SIGN", signature)
            .header("Content-Type", "application/json")
            .body(payload)
            .send()
            .await
            .map_err(|e| ExecError::Transient(format!("network: {e}")))?;

        let status = resp.status();
        if status.as_u16() == 429 || status.is_server_error() {
            return Err(ExecError::Transient(format!("HTTP {status}")));
        }
        if !status.is_success() {
            return Err(ExecError::Permanent(format!("HTTP {status}")));
        }

        resp.json()
            .await
            .map_err(|e| ExecError::Transient(format!("bad response body: {e}")))
    }
}

#[async_trait]
impl MarketData for BybitClient {
    async fn fetch(
        &self,
        symbol: &str,
        timeframe: Timeframe,
        lookback: usize,
    ) -> Result<Vec<Bar>, MarketDataError> {
        let resp = self
            .client
            .get(format!("{BASE_URL}/v5/market/mark-price-kline"))
            .query(&[
                ("symbol", symbol),
                ("interval", timeframe.bybit_interval()),
                ("limit", &lookback.min(1000).to_string()),
            ])
            .send()
            .await
            .map_err(|e| MarketDataError::Network(e.to_string()))?;

        if resp.status().as_u16() == 429 {
            return Err(MarketDataError::RateLimited("HTTP 429".to_string()));
        }

        let data: ApiResponse<KlineResult> = resp
            .json()
            .await
            .map_err(|e| MarketDataError::Network(format!("bad kline payload: {e}")))?;

        if data.ret_code != 0 {
            let msg = data.ret_msg;
            return Err(if msg.to_lowercase().contains("symbol") {
                MarketDataError::SymbolNotFound(msg)
            } else {
                MarketDataError::Network(msg)
            });
        }

        let rows = data.result.map(|r| r.list).unwrap_or_default();
        Ok(parse_klines(rows))
    }
}

/// Kline rows are [startMs, open, high, low, close] strings, newest
/// first; mark-price klines carry no volume.
fn parse_klines(rows: Vec<Vec<String>>) -> Vec<Bar> {
    let mut bars: Vec<Bar> = rows
        .into_iter()
        .filter_map(|row| {
            if row.len() < 5 {
                return None;
            }
            let ms: i64 = row[0].parse().ok()?;
            Some(Bar {
                timestamp: DateTime::from_timestamp_millis(ms)?,
                open: row[1].parse().ok()?,
                high: row[2].parse().ok()?,
                low: row[3].parse().ok()?,
                close: row[4].parse().ok()?,
                volume: 0.0,
            })
        })
        .collect();
    bars.sort_by_key(|b| b.timestamp);
    bars
}

#[async_trait]
impl OrderAdapter for BybitClient {
    async fn authenticate(&self) -> Result<bool, ExecError> {
        if self.api_key.is_empty() || self.api_secret.is_empty() {
            return Err(ExecError::Permanent("missing Bybit credentials".to_string()));
        }
        // Signed no-op query proves the key pair works.
        let body = self
            .post_signed(
                "/v5/order/realtime",
                json!({ "category": "linear", "settleCoin": "USDT" }),
            )
            .await?;
        let ret_code = body["retCode"].as_i64().unwrap_or(-1);
        Ok(ret_code == 0)
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck, ExecError> {
        let mut payload = json!({
            "category": "linear",
            "symbol": request.symbol,
            "side": match request.side {
                Side::Buy => "Buy",
                Side::Sell => "Sell",
            },
            "orderType": match request.order_type {
                OrderType::Market => "Market",
                OrderType::Limit => "Limit",
            },
            "qty": format!("{:.6}", request.size),
        });
        if let Some(price) = request.limit_price {
            payload["price"] = json!(format!("{price}"));
        }
        if let Some(sl) = request.stop_loss {
            payload["stopLoss"] = json!(format!("{sl}"));
        }
        if let Some(tp) = request.take_profit {
            payload["takeProfit"] = json!(format!("{tp}"));
        }

        let body = self.post_signed("/v5/order/create", payload).await?;
        let parsed: ApiResponse<OrderResult> = serde_json::from_value(body)
            .map_err(|e| ExecError::Transient(format!("bad order response: {e}")))?;

        if parsed.ret_code != 0 {
            return Err(Self::classify_exec_error(parsed.ret_code, parsed.ret_msg));
        }

        parsed
            .result
            .map(|r| OrderAck { order_id: r.order_id })
            .ok_or_else(|| ExecError::Transient("order accepted without id".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn klines_parse_and_sort_oldest_first() {
        let rows = vec![
            vec![
                "1670612400000".to_string(),
                "17150.0".to_string(),
                "17160.0".to_string(),
                "17140.0".to_string(),
                "17155.0".to_string(),
            ],
            vec![
                "1670608800000".to_string(),
                "17164.16".to_string(),
                "17164.16".to_string(),
                "17121.5".to_string(),
                "17131.64".to_string(),
            ],
        ];
        let bars = parse_klines(rows);
        assert_eq!(bars.len(), 2);
        assert!(bars[0].timestamp < bars[1].timestamp);
        assert!((bars[0].close - 17131.64).abs() < 1e-9);
    }

    #[test]
    fn short_rows_are_skipped() {
        let rows = vec![vec!["1670608800000".to_string(), "17164.16".to_string()]];
        assert!(parse_klines(rows).is_empty());
    }

    #[test]
    fn api_response_tolerates_missing_result() {
        // Error replies carry no result object at all.
        let body = r#"{"retCode":10006,"retMsg":"too many visits"}"#;
        let resp: ApiResponse<KlineResult> = serde_json::from_str(body).unwrap();
        assert_eq!(resp.ret_code, 10006);
        assert!(resp.result.is_none());

        let body = r#"{"retCode":0,"retMsg":"OK","result":{"orderId":"ord-9"}}"#;
        let resp: ApiResponse<OrderResult> = serde_json::from_str(body).unwrap();
        assert_eq!(resp.result.unwrap().order_id, "ord-9");
    }

    #[test]
    fn error_codes_classify_by_retryability() {
        assert!(matches!(
            BybitClient::classify_exec_error(10006, "rate".to_string()),
            ExecError::Transient(_)
        ));
        assert!(matches!(
            BybitClient::classify_exec_error(10003, "key".to_string()),
            ExecError::Permanent(_)
        ));
        assert!(matches!(
            BybitClient::classify_exec_error(110007, "balance".to_string()),
            ExecError::Permanent(_)
        ));
    }

    #[test]
    fn signature_is_deterministic_hex() {
        let client = BybitClient {
            client: Client::new(),
            api_key: "key".to_string(),
            api_secret: "secret".to_string(),
        };
        let a = client.sign(1700000000000, "{}").unwrap();
        let b = client.sign(1700000000000, "{}").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
