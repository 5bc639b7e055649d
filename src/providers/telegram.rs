use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;
use crate::models::{ExecutionResult, Signal};
use crate::providers::NotificationSink;

#[derive(Debug, Deserialize)]
struct SendMessageResponse {
    ok: bool,
    #[serde(default)]
    description: Option<String>,
}

/// Telegram notification channel. Errors bubble up as `anyhow` so the
/// bot can log-and-continue; a failed notification never fails a run.
pub struct TelegramNotifier {
    client: Client,
    token: String,
    chat_id: String,
}

impl TelegramNotifier {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            token: cfg.telegram_token.clone(),
            chat_id: cfg.telegram_chat_id.clone(),
        }
    }
}

#[async_trait]
impl NotificationSink for TelegramNotifier {
    async fn notify(&self, message: &str) -> Result<()> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.token);
        let resp = self
            .client
            .post(&url)
            .json(&json!({
                "chat_id": self.chat_id,
                "text": message,
            }))
            .send()
            .await?;

        let body: SendMessageResponse = resp.json().await?;
        if !body.ok {
            return Err(anyhow!(
                "telegram rejected message: {}",
                body.description.unwrap_or_default()
            ));
        }
        Ok(())
    }
}

/// Human-readable run report for the notification channel.
pub fn format_report(signal: &Signal, result: &ExecutionResult) -> String {
    let mut text = format!("#{} SIGNAL\n", signal.symbol);

    match signal.side {
        Some(side) => {
            text.push_str(&format!("Side: {}\n", side.to_string().to_uppercase()));
            text.push_str(&format!("Confidence: {:.0}%\n", signal.confidence));
            text.push_str(&format!("Entry: {:.4}\n", signal.entry));
            text.push_str(&format!("SL: {:.4}\n", signal.stop_loss));
            text.push_str(&format!("TP: {:.4}\n", signal.take_profit));
            text.push_str(&format!("Size: {:.6}\n", signal.size));
        }
        None => {
            text.push_str("Side: NONE (no action)\n");
            text.push_str(&format!("Confidence: {:.0}%\n", signal.confidence));
        }
    }

    match result {
        ExecutionResult::Skipped { reason } => {
            text.push_str(&format!("Execution: skipped ({reason})"));
        }
        ExecutionResult::Accepted { order_id, attempts } => {
            text.push_str(&format!(
                "Execution: accepted (order {order_id}, {attempts} attempt(s))"
            ));
        }
        ExecutionResult::Rejected { reason, attempts } => {
            text.push_str(&format!(
                "Execution: rejected after {attempts} attempt(s): {reason}"
            ));
        }
        ExecutionResult::Failed { error, attempts } => {
            text.push_str(&format!(
                "Execution: failed after {attempts} attempt(s): {error}"
            ));
        }
    }

    format!("{}\n\n{}", text, signal.rationale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Side;

    #[test]
    fn actionable_report_lists_levels() {
        let signal = Signal {
            symbol: "BTCUSDT".to_string(),
            side: Some(Side::Buy),
            size: 0.001234,
            entry: 150.0,
            stop_loss: 148.5,
            take_profit: 152.0,
            confidence: 80.0,
            rationale: "indicators agree with AI trend".to_string(),
        };
        let result = ExecutionResult::Accepted {
            order_id: "ord-1".to_string(),
            attempts: 1,
        };
        let text = format_report(&signal, &result);
        assert!(text.contains("#BTCUSDT"));
        assert!(text.contains("Side: BUY"));
        assert!(text.contains("SL: 148.5000"));
        assert!(text.contains("order ord-1"));
        assert!(text.contains("indicators agree"));
    }

    #[test]
    fn no_action_report_explains_skip() {
        let signal = Signal::no_action("EUR/USD", 40.0, "confidence 40.0 below threshold 60.0");
        let result = ExecutionResult::Skipped {
            reason: signal.rationale.clone(),
        };
        let text = format_report(&signal, &result);
        assert!(text.contains("NONE"));
        assert!(text.contains("skipped"));
        assert!(text.contains("below threshold"));
    }
}
