use serde::{Deserialize, Serialize};

use crate::models::Timeframe;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MarketKind {
    Crypto,
    Forex,
}

impl MarketKind {
    pub fn from_str_loose(s: &str) -> Option<MarketKind> {
        match s.trim().to_lowercase().as_str() {
            "crypto" => Some(MarketKind::Crypto),
            "forex" => Some(MarketKind::Forex),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MarketKind::Crypto => "crypto",
            MarketKind::Forex => "forex",
        }
    }
}

/// Indicator periods and level-detection tuning. Passed explicitly into
/// the indicator engine so computation stays pure and testable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub ema_fast: usize,
    pub ema_mid: usize,
    pub ema_slow: usize,
    pub rsi_period: usize,
    pub volatility_window: usize,
    /// Bars on each side of a pivot candidate.
    pub pivot_lookaround: usize,
    /// Levels within this fraction of each other collapse into one.
    pub level_tolerance: f64,
}

impl IndicatorConfig {
    /// Bars needed before every indicator in the set is defined.
    pub fn min_bars(&self) -> usize {
        self.ema_slow
    }
}

impl Default for IndicatorConfig {
    fn default() -> Self {
        Self {
            ema_fast: 20,
            ema_mid: 50,
            ema_slow: 200,
            rsi_period: 14,
            volatility_window: 20,
            pivot_lookaround: 3,
            level_tolerance: 0.002,
        }
    }
}

/// Risk-management policy for signal synthesis and dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    /// Account capital the position-sizing fraction applies to.
    pub capital: f64,
    /// Fraction of capital put at notional risk per signal.
    pub risk_fraction: f64,
    /// Composite confidence below this produces a no-action verdict.
    pub min_confidence: f64,
    pub allow_high_risk: bool,
    /// Multiplier applied to AI confidence when indicators disagree.
    pub disagreement_penalty: f64,
    /// Volatility (stddev of returns) at which sizing is unscaled;
    /// higher observed volatility shrinks the position inversely.
    pub vol_reference: f64,
    pub max_retries: u32,
    pub retry_base_ms: u64,
}

impl Default for RiskConfig {
    fn default() -> Self {
        Self {
            capital: 10_000.0,
            risk_fraction: 0.01,
            min_confidence: 60.0,
            allow_high_risk: false,
            disagreement_penalty: 0.5,
            vol_reference: 0.002,
            max_retries: 3,
            retry_base_ms: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Market
    pub market: MarketKind,
    pub symbols: Vec<String>,
    pub timeframe: Timeframe,
    pub lookback: usize,

    // Scheduling
    pub scan_interval_secs: u64,
    pub request_timeout_secs: u64,
    /// When false, signals are synthesized and reported but never sent
    /// to an exchange.
    pub live_trading: bool,

    // Credentials
    pub groq_api_key: String,
    pub twelvedata_api_key: String,
    pub bybit_api_key: String,
    pub bybit_api_secret: String,
    pub ibkr_username: String,
    pub ibkr_password: String,
    pub telegram_token: String,
    pub telegram_chat_id: String,

    // Pipeline tuning
    pub indicators: IndicatorConfig,
    pub risk: RiskConfig,

    // Logging
    pub log_level: String,
}

impl Config {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let env = |key: &str, default: &str| -> String {
            std::env::var(key).unwrap_or_else(|_| default.to_string())
        };

        let market = MarketKind::from_str_loose(&env("MARKET", "crypto"))
            .unwrap_or(MarketKind::Crypto);

        let default_symbols = match market {
            MarketKind::Crypto => "BTCUSDT,ETHUSDT,SOLUSDT",
            MarketKind::Forex => "EUR/USD,XAU/USD",
        };
        let symbols: Vec<String> = env("SYMBOLS", default_symbols)
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let timeframe =
            Timeframe::from_str_loose(&env("TIMEFRAME", "1min")).unwrap_or(Timeframe::M1);

        let indicators = IndicatorConfig {
            ema_fast: env("EMA_FAST", "20").parse().unwrap_or(20),
            ema_mid: env("EMA_MID", "50").parse().unwrap_or(50),
            ema_slow: env("EMA_SLOW", "200").parse().unwrap_or(200),
            rsi_period: env("RSI_PERIOD", "14").parse().unwrap_or(14),
            volatility_window: env("VOLATILITY_PERIOD", "20").parse().unwrap_or(20),
            pivot_lookaround: env("PIVOT_LOOKAROUND", "3").parse().unwrap_or(3),
            level_tolerance: env("LEVEL_TOLERANCE", "0.002").parse().unwrap_or(0.002),
        };

        let risk = RiskConfig {
            capital: env("CAPITAL", "10000").parse().unwrap_or(10_000.0),
            risk_fraction: env("RISK_FRACTION", "0.01").parse().unwrap_or(0.01),
            min_confidence: env("MIN_CONFIDENCE", "60").parse().unwrap_or(60.0),
            allow_high_risk: env("ALLOW_HIGH_RISK", "false").to_lowercase() == "true",
            disagreement_penalty: env("DISAGREEMENT_PENALTY", "0.5").parse().unwrap_or(0.5),
            vol_reference: env("VOL_REFERENCE", "0.002").parse().unwrap_or(0.002),
            max_retries: env("MAX_RETRIES", "3").parse().unwrap_or(3),
            retry_base_ms: env("RETRY_BASE_MS", "500").parse().unwrap_or(500),
        };

        Config {
            market,
            symbols,
            timeframe,
            lookback: env("LOOKBACK", "1000").parse().unwrap_or(1000),
            scan_interval_secs: env("SCAN_INTERVAL", "60").parse().unwrap_or(60),
            request_timeout_secs: env("REQUEST_TIMEOUT", "30").parse().unwrap_or(30),
            live_trading: env("LIVE_TRADING", "false").to_lowercase() == "true",
            groq_api_key: env("GROQ_API_KEY", ""),
            twelvedata_api_key: env("TWELVEDATA_API_KEY", ""),
            bybit_api_key: env("BYBIT_API_KEY", ""),
            bybit_api_secret: env("BYBIT_SECRET_KEY", ""),
            ibkr_username: env("IBKR_USERNAME", ""),
            ibkr_password: env("IBKR_PASSWORD", ""),
            telegram_token: env("TG_API_KEY", ""),
            telegram_chat_id: env("TG_CHAT_ID", ""),
            indicators,
            risk,
            log_level: env("LOG_LEVEL", "info"),
        }
    }
}
