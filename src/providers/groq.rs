use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::fmt::Write as _;

use crate::config::Config;
use crate::error::AnalystError;
use crate::models::{IndicatorSet, MarketSnapshot, RawRecommendation};
use crate::providers::Analyst;

const BASE_URL: &str = "https://api.groq.com/openai/v1";
const MODEL: &str = "llama-3.3-70b-versatile";
/// Most recent bars included in the prompt; more overflows the context.
const PROMPT_BARS: usize = 100;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: String,
}

/// Chat-completions analyst. The completion text is treated as opaque:
/// we pull the first JSON object out of it and hand the untyped result
/// to fusion for validation.
pub struct GroqAnalyst {
    client: Client,
    api_key: String,
    market: String,
}

impl GroqAnalyst {
    pub fn new(cfg: &Config) -> Self {
        Self {
            client: Client::new(),
            api_key: cfg.groq_api_key.clone(),
            market: cfg.market.as_str().to_string(),
        }
    }

    fn build_prompt(&self, snapshot: &MarketSnapshot, indicators: &IndicatorSet) -> String {
        let mut data = String::new();
        for bar in snapshot.tail(PROMPT_BARS) {
            let _ = writeln!(
                data,
                "{} O:{} H:{} L:{} C:{} V:{}",
                bar.timestamp.format("%Y-%m-%d %H:%M:%S"),
                bar.open,
                bar.high,
                bar.low,
                bar.close,
                bar.volume
            );
        }

        let fmt_opt = |v: Option<f64>| v.map_or("n/a".to_string(), |x| format!("{x:.4}"));
        let fmt_levels = |levels: &[f64]| {
            if levels.is_empty() {
                "n/a".to_string()
            } else {
                levels
                    .iter()
                    .map(|l| format!("{l:.4}"))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };

        format!(
            "You are an expert {market} trading analyst. Analyze CURRENT market conditions for {symbol} ({timeframe} bars).\n\n\
             RECENT BARS (oldest first):\n{data}\n\
             COMPUTED INDICATORS:\n\
             EMA20: {ema20} | EMA50: {ema50} | EMA200: {ema200}\n\
             RSI: {rsi} | Volatility: {vol}\n\
             Support: {support}\n\
             Resistance: {resistance}\n\n\
             OUTPUT FORMAT - RESPOND IN JSON:\n\
             {{\n\
               \"trend\": \"Bullish/Bearish/Sideways\",\n\
               \"signal\": \"BUY/SELL/HOLD\",\n\
               \"probability\": 85,\n\
               \"entry\": 157.16,\n\
               \"stop_loss\": 156.50,\n\
               \"tp1\": 158.51,\n\
               \"tp2\": 159.00,\n\
               \"tp3\": 160.00,\n\
               \"risk_level\": \"Low/Medium/High\",\n\
               \"reason\": \"Technical reasoning\"\n\
             }}\n\n\
             TRADING LOGIC:\n\
             - BUY: stop_loss below entry, take-profits above entry\n\
             - SELL: stop_loss above entry, take-profits below entry\n\
             - Use the actual price scale of the data\n\
             - Respond ONLY with valid JSON",
            market = self.market,
            symbol = snapshot.symbol(),
            timeframe = snapshot.timeframe(),
            data = data,
            ema20 = fmt_opt(indicators.ema20),
            ema50 = fmt_opt(indicators.ema50),
            ema200 = fmt_opt(indicators.ema200),
            rsi = fmt_opt(indicators.rsi),
            vol = fmt_opt(indicators.volatility),
            support = fmt_levels(&indicators.support),
            resistance = fmt_levels(&indicators.resistance),
        )
    }
}

/// First `{` to its matching last `}`. Models routinely wrap the JSON
/// in prose or code fences.
fn extract_json(content: &str) -> Option<&str> {
    let start = content.find('{')?;
    let end = content.rfind('}')?;
    if end < start {
        return None;
    }
    Some(&content[start..=end])
}

#[async_trait]
impl Analyst for GroqAnalyst {
    async fn analyze(
        &self,
        snapshot: &MarketSnapshot,
        indicators: &IndicatorSet,
    ) -> Result<RawRecommendation, AnalystError> {
        let prompt = self.build_prompt(snapshot, indicators);

        let resp = self
            .client
            .post(format!("{BASE_URL}/chat/completions"))
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": MODEL,
                "messages": [{ "role": "user", "content": prompt }],
                "temperature": 0.7,
                "max_tokens": 1024,
                "stream": false,
            }))
            .send()
            .await
            .map_err(|e| AnalystError::Provider(format!("network: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(AnalystError::Provider(format!("HTTP {status}: {body}")));
        }

        let chat: ChatResponse = resp
            .json()
            .await
            .map_err(|e| AnalystError::Provider(format!("bad completion payload: {e}")))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| AnalystError::Provider("empty completion".to_string()))?;

        let raw = extract_json(content)
            .ok_or_else(|| AnalystError::Provider("no JSON object in completion".to_string()))?;

        serde_json::from_str(raw)
            .map_err(|e| AnalystError::Provider(format!("unparseable JSON in completion: {e}")))
    }
}
