use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Timeframe;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    pub fn is_bullish(&self) -> bool {
        self.close > self.open
    }

    pub fn is_bearish(&self) -> bool {
        self.close < self.open
    }
}

/// An immutable, time-ordered window of market data for one symbol.
///
/// Built once per pipeline run by [`crate::pipeline::snapshot::build`];
/// the bar sequence is guaranteed non-empty with strictly increasing
/// timestamps. `incomplete` is set when fewer bars survived than the
/// longest indicator period needs, so downstream indicator computation
/// degrades to a partial set instead of extrapolating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    symbol: String,
    timeframe: Timeframe,
    bars: Vec<Bar>,
    incomplete: bool,
}

impl MarketSnapshot {
    /// Internal constructor; invariants are enforced by the snapshot builder.
    pub(crate) fn new(
        symbol: String,
        timeframe: Timeframe,
        bars: Vec<Bar>,
        incomplete: bool,
    ) -> Self {
        Self {
            symbol,
            timeframe,
            bars,
            incomplete,
        }
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn timeframe(&self) -> Timeframe {
        self.timeframe
    }

    pub fn is_incomplete(&self) -> bool {
        self.incomplete
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn last(&self) -> &Bar {
        // non-empty by construction
        self.bars.last().expect("snapshot is never empty")
    }

    pub fn closes(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.close).collect()
    }

    pub fn highs(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.high).collect()
    }

    pub fn lows(&self) -> Vec<f64> {
        self.bars.iter().map(|b| b.low).collect()
    }

    /// Last `n` bars (all bars when fewer exist).
    pub fn tail(&self, n: usize) -> &[Bar] {
        let start = self.bars.len().saturating_sub(n);
        &self.bars[start..]
    }
}
