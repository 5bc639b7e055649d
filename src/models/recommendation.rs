use serde::{Deserialize, Serialize};

use crate::models::{Action, RiskLevel, Trend};

/// The AI provider's response exactly as it comes off the wire.
///
/// Everything is untrusted at this point: enum fields are free-form
/// strings, numeric fields may be out of range or missing. Conversion to
/// [`AiRecommendation`] happens at the fusion boundary and is the
/// validation step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawRecommendation {
    #[serde(default)]
    pub trend: String,
    #[serde(default)]
    pub signal: String,
    #[serde(default)]
    pub risk_level: String,
    #[serde(default)]
    pub probability: Option<f64>,
    #[serde(default)]
    pub entry: Option<f64>,
    #[serde(default)]
    pub stop_loss: Option<f64>,
    #[serde(default)]
    pub tp1: Option<f64>,
    #[serde(default)]
    pub tp2: Option<f64>,
    #[serde(default)]
    pub tp3: Option<f64>,
    #[serde(default)]
    pub reason: String,
}

/// A validated AI trade recommendation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiRecommendation {
    pub trend: Trend,
    pub action: Action,
    pub risk: RiskLevel,
    /// Confidence in [0, 100].
    pub confidence: f64,
    pub entry: f64,
    pub stop_loss: f64,
    /// Take-profit ladder, nearest first. At least one level.
    pub targets: Vec<f64>,
    pub reason: String,
}
