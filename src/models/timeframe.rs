use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "1min")]
    M1,
    #[serde(rename = "5min")]
    M5,
    #[serde(rename = "15min")]
    M15,
    #[serde(rename = "30min")]
    M30,
    #[serde(rename = "1h")]
    H1,
}

impl Timeframe {
    pub fn as_str(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1min",
            Timeframe::M5 => "5min",
            Timeframe::M15 => "15min",
            Timeframe::M30 => "30min",
            Timeframe::H1 => "1h",
        }
    }

    /// Bybit kline interval code.
    pub fn bybit_interval(&self) -> &'static str {
        match self {
            Timeframe::M1 => "1",
            Timeframe::M5 => "5",
            Timeframe::M15 => "15",
            Timeframe::M30 => "30",
            Timeframe::H1 => "60",
        }
    }

    /// TwelveData time-series interval string.
    pub fn twelvedata_interval(&self) -> &'static str {
        self.as_str()
    }

    pub fn as_duration(&self) -> Duration {
        match self {
            Timeframe::M1 => Duration::from_secs(60),
            Timeframe::M5 => Duration::from_secs(300),
            Timeframe::M15 => Duration::from_secs(900),
            Timeframe::M30 => Duration::from_secs(1800),
            Timeframe::H1 => Duration::from_secs(3600),
        }
    }

    pub fn from_str_loose(s: &str) -> Option<Timeframe> {
        match s {
            "1min" | "1m" => Some(Timeframe::M1),
            "5min" | "5m" => Some(Timeframe::M5),
            "15min" | "15m" => Some(Timeframe::M15),
            "30min" | "30m" => Some(Timeframe::M30),
            "1h" | "60min" => Some(Timeframe::H1),
            _ => None,
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loose_parse_accepts_both_spellings() {
        assert_eq!(Timeframe::from_str_loose("1m"), Some(Timeframe::M1));
        assert_eq!(Timeframe::from_str_loose("15min"), Some(Timeframe::M15));
        assert_eq!(Timeframe::from_str_loose("2h"), None);
    }

    #[test]
    fn provider_codes() {
        assert_eq!(Timeframe::H1.bybit_interval(), "60");
        assert_eq!(Timeframe::M15.twelvedata_interval(), "15min");
    }
}
