use serde::{Deserialize, Serialize};

use crate::models::{AiRecommendation, IndicatorSet, Side, Trend};

/// Indicator output and the validated AI view, merged into one object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub symbol: String,
    pub indicators: IndicatorSet,
    pub recommendation: AiRecommendation,
    /// Trend label derived from the indicators alone.
    pub computed_trend: Trend,
    /// True iff the AI's trend label matches `computed_trend`.
    pub agreement: bool,
    /// AI confidence after the disagreement penalty, in [0, 100].
    pub confidence: f64,
}

/// Terminal artifact of a pipeline run. Either actionable (`side` set)
/// or a documented no-action verdict; never mutated after synthesis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    pub symbol: String,
    pub side: Option<Side>,
    /// Position size in base units; 0 for no-action.
    pub size: f64,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub confidence: f64,
    pub rationale: String,
}

impl Signal {
    pub fn no_action(symbol: impl Into<String>, confidence: f64, rationale: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            side: None,
            size: 0.0,
            entry: 0.0,
            stop_loss: 0.0,
            take_profit: 0.0,
            confidence,
            rationale: rationale.into(),
        }
    }

    pub fn is_actionable(&self) -> bool {
        self.side.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    Market,
    Limit,
}

/// What actually goes to the exchange adapter.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: Side,
    pub size: f64,
    pub order_type: OrderType,
    pub limit_price: Option<f64>,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
}

/// Successful adapter response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderAck {
    pub order_id: String,
}

/// Recorded outcome of a dispatch. `attempts` counts adapter calls,
/// including the one that settled the result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum ExecutionResult {
    Skipped { reason: String },
    Accepted { order_id: String, attempts: u32 },
    Rejected { reason: String, attempts: u32 },
    Failed { error: String, attempts: u32 },
}

impl ExecutionResult {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ExecutionResult::Accepted { .. })
    }
}
