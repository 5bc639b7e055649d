use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Trend {
    Bullish,
    Bearish,
    Sideways,
}

impl Trend {
    /// Parse the AI's free-form trend label. Case-insensitive; anything
    /// outside the three known labels is rejected at the fusion boundary.
    pub fn from_str_loose(s: &str) -> Option<Trend> {
        match s.trim().to_lowercase().as_str() {
            "bullish" => Some(Trend::Bullish),
            "bearish" => Some(Trend::Bearish),
            "sideways" | "neutral" | "ranging" => Some(Trend::Sideways),
            _ => None,
        }
    }
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => write!(f, "bullish"),
            Trend::Bearish => write!(f, "bearish"),
            Trend::Sideways => write!(f, "sideways"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Action {
    Buy,
    Sell,
    Hold,
}

impl Action {
    pub fn from_str_loose(s: &str) -> Option<Action> {
        match s.trim().to_uppercase().as_str() {
            "BUY" | "LONG" => Some(Action::Buy),
            "SELL" | "SHORT" => Some(Action::Sell),
            "HOLD" | "WAIT" => Some(Action::Hold),
            _ => None,
        }
    }

    pub fn to_side(self) -> Option<Side> {
        match self {
            Action::Buy => Some(Side::Buy),
            Action::Sell => Some(Side::Sell),
            Action::Hold => None,
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Buy => write!(f, "BUY"),
            Action::Sell => write!(f, "SELL"),
            Action::Hold => write!(f, "HOLD"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn from_str_loose(s: &str) -> Option<RiskLevel> {
        match s.trim().to_lowercase().as_str() {
            "low" => Some(RiskLevel::Low),
            "medium" | "moderate" => Some(RiskLevel::Medium),
            "high" => Some(RiskLevel::High),
            _ => None,
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trend_parsing_is_case_insensitive() {
        assert_eq!(Trend::from_str_loose("Bullish"), Some(Trend::Bullish));
        assert_eq!(Trend::from_str_loose(" SIDEWAYS "), Some(Trend::Sideways));
        assert_eq!(Trend::from_str_loose("moon"), None);
    }

    #[test]
    fn action_to_side() {
        assert_eq!(Action::Buy.to_side(), Some(Side::Buy));
        assert_eq!(Action::Sell.to_side(), Some(Side::Sell));
        assert_eq!(Action::Hold.to_side(), None);
    }

    #[test]
    fn risk_ordering() {
        assert!(RiskLevel::Low < RiskLevel::High);
        assert_eq!(RiskLevel::from_str_loose("Moderate"), Some(RiskLevel::Medium));
    }
}
