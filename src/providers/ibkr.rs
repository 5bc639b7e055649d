use async_trait::async_trait;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

use crate::config::Config;
use crate::error::ExecError;
use crate::models::{OrderAck, OrderRequest, OrderType, Side};
use crate::providers::OrderAdapter;

const BASE_URL: &str = "https://api.ibkr.com/v1";
const TOKEN_TTL_SECS: u64 = 3600;

#[derive(Debug, Serialize)]
struct JwtClaims {
    iss: String,
    sub: String,
    aud: String,
    iat: u64,
    exp: u64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OrderResponse {
    order_id: String,
}

/// Interactive Brokers web API adapter for forex orders.
///
/// Authenticates once with a signed JWT assertion and caches the bearer
/// token; `place_order` re-authenticates lazily when no token is held.
pub struct IbkrClient {
    client: Client,
    username: String,
    password: String,
    token: RwLock<Option<String>>,
}

impl IbkrClient {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            username: cfg.ibkr_username.clone(),
            password: cfg.ibkr_password.clone(),
            token: RwLock::new(None),
        }
    }

    fn assertion(&self) -> Result<String, ExecError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| ExecError::Permanent(format!("clock error: {e}")))?
            .as_secs();

        let claims = JwtClaims {
            iss: self.username.clone(),
            sub: self.username.clone(),
            aud: BASE_URL.to_string(),
            iat: now,
            exp: now + TOKEN_TTL_SECS,
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(self.password.as_bytes()),
        )
        .map_err(|e| ExecError::Permanent(format!("failed to sign JWT: {e}")))
    }

    fn classify_status(status: reqwest::StatusCode, body: &str) -> ExecError {
        match status.as_u16() {
            401 | 403 => ExecError::Permanent(format!("auth failure: HTTP {status}: {body}")),
            429 => ExecError::Transient(format!("rate limited: {body}")),
            s if s >= 500 => ExecError::Transient(format!("HTTP {status}: {body}")),
            _ => ExecError::Permanent(format!("HTTP {status}: {body}")),
        }
    }

    async fn fetch_token(&self) -> Result<String, ExecError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(ExecError::Permanent("missing IBKR credentials".to_string()));
        }

        let assertion = self.assertion()?;
        let resp = self
            .client
            .post(format!("{BASE_URL}/oauth2/token"))
            .json(&serde_json::json!({
                "grant_type": "client_credentials",
                "client_assertion_type": "urn:ietf:params:oauth:client-assertion-type:jwt-bearer",
                "client_assertion": assertion,
            }))
            .send()
            .await
            .map_err(|e| ExecError::Transient(format!("network: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let token: TokenResponse = resp
            .json()
            .await
            .map_err(|e| ExecError::Transient(format!("bad token response: {e}")))?;
        Ok(token.access_token)
    }

    async fn bearer(&self) -> Result<String, ExecError> {
        if let Some(token) = self.token.read().await.clone() {
            return Ok(token);
        }
        let token = self.fetch_token().await?;
        *self.token.write().await = Some(token.clone());
        Ok(token)
    }
}

#[async_trait]
impl OrderAdapter for IbkrClient {
    async fn authenticate(&self) -> Result<bool, ExecError> {
        let token = self.fetch_token().await?;
        *self.token.write().await = Some(token);
        Ok(true)
    }

    async fn place_order(&self, request: &OrderRequest) -> Result<OrderAck, ExecError> {
        let token = self.bearer().await?;

        let payload = serde_json::json!({
            "conidex": request.symbol,
            "side": match request.side {
                Side::Buy => "BUY",
                Side::Sell => "SELL",
            },
            "orderType": match request.order_type {
                OrderType::Market => "MKT",
                OrderType::Limit => "LMT",
            },
            "quantity": request.size,
            "price": request.limit_price,
            "stopLoss": request.stop_loss,
            "takeProfit": request.take_profit,
            "tif": "GTC",
        });

        let resp = self
            .client
            .post(format!("{BASE_URL}/iserver/orders"))
            .bearer_auth(&token)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ExecError::Transient(format!("network: {e}")))?;

        let status = resp.status();
        if status.as_u16() == 401 {
            // Expired session; next dispatch attempt re-authenticates.
            *self.token.write().await = None;
        }
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Self::classify_status(status, &body));
        }

        let order: OrderResponse = resp
            .json()
            .await
            .map_err(|e| ExecError::Transient(format!("bad order response: {e}")))?;
        Ok(OrderAck {
            order_id: order.order_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            IbkrClient::classify_status(reqwest::StatusCode::UNAUTHORIZED, ""),
            ExecError::Permanent(_)
        ));
        assert!(matches!(
            IbkrClient::classify_status(reqwest::StatusCode::TOO_MANY_REQUESTS, ""),
            ExecError::Transient(_)
        ));
        assert!(matches!(
            IbkrClient::classify_status(reqwest::StatusCode::BAD_GATEWAY, ""),
            ExecError::Transient(_)
        ));
        assert!(matches!(
            IbkrClient::classify_status(reqwest::StatusCode::UNPROCESSABLE_ENTITY, ""),
            ExecError::Permanent(_)
        ));
    }

    #[test]
    fn assertion_requires_credentials_but_signs_when_present() {
        let cfg = {
            let mut c = crate::test_helpers::test_config();
            c.ibkr_username = "demo".to_string();
            c.ibkr_password = "hunter2".to_string();
            c
        };
        let client = IbkrClient::new(&cfg);
        let jwt = client.assertion().unwrap();
        // Three dot-separated base64 segments.
        assert_eq!(jwt.split('.').count(), 3);
    }
}
