use chrono::{DateTime, Duration, Utc};

use crate::config::{Config, IndicatorConfig, MarketKind, RiskConfig};
use crate::models::{Bar, Timeframe};

fn base_time() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-15T12:00:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

/// Bars from (open, high, low, close) tuples with auto-incrementing 1m timestamps.
pub fn make_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
    data.iter()
        .enumerate()
        .map(|(i, &(o, h, l, c))| Bar {
            timestamp: base_time() + Duration::minutes(i as i64),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 100.0,
        })
        .collect()
}

/// `n` bars with closes moving linearly from `start` to `end`.
pub fn trending_bars(n: usize, start: f64, end: f64) -> Vec<Bar> {
    let step = if n > 1 {
        (end - start) / (n - 1) as f64
    } else {
        0.0
    };
    (0..n)
        .map(|i| {
            let close = start + step * i as f64;
            let open = close - step;
            Bar {
                timestamp: base_time() + Duration::minutes(i as i64),
                open,
                high: open.max(close) + step.abs() * 0.25,
                low: open.min(close) - step.abs() * 0.25,
                close,
                volume: 100.0,
            }
        })
        .collect()
}

/// A Config suitable for testing: dry-run mode, no credentials.
pub fn test_config() -> Config {
    Config {
        market: MarketKind::Crypto,
        symbols: vec!["BTCUSDT".to_string()],
        timeframe: Timeframe::M1,
        lookback: 1000,
        scan_interval_secs: 60,
        request_timeout_secs: 5,
        live_trading: false,
        groq_api_key: String::new(),
        twelvedata_api_key: String::new(),
        bybit_api_key: String::new(),
        bybit_api_secret: String::new(),
        ibkr_username: String::new(),
        ibkr_password: String::new(),
        telegram_token: String::new(),
        telegram_chat_id: String::new(),
        indicators: IndicatorConfig::default(),
        risk: RiskConfig {
            retry_base_ms: 1,
            ..RiskConfig::default()
        },
        log_level: "error".to_string(),
    }
}
