use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Technical indicator readings derived from one [`MarketSnapshot`].
///
/// Fields are `None` while the snapshot holds fewer bars than the
/// indicator's period; nothing is ever extrapolated.
///
/// [`MarketSnapshot`]: crate::models::MarketSnapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSet {
    pub symbol: String,
    pub computed_at: DateTime<Utc>,
    pub ema20: Option<f64>,
    pub ema50: Option<f64>,
    pub ema200: Option<f64>,
    pub rsi: Option<f64>,
    pub volatility: Option<f64>,
    /// Pivot-low levels, ascending.
    pub support: Vec<f64>,
    /// Pivot-high levels, ascending.
    pub resistance: Vec<f64>,
}

impl IndicatorSet {
    /// True when every EMA the trend rule needs is defined.
    pub fn has_full_emas(&self) -> bool {
        self.ema20.is_some() && self.ema50.is_some() && self.ema200.is_some()
    }
}
