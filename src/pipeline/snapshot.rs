use tracing::warn;

use crate::error::DataError;
use crate::models::{Bar, MarketSnapshot, Timeframe};

/// Normalize raw bars into a canonical snapshot.
///
/// Malformed bars (non-increasing timestamp, negative price, negative
/// volume) are dropped with a warning. The build only fails when nothing
/// usable remains; a short-but-valid series is returned with the
/// `incomplete` flag set so downstream indicators compute a partial set.
///
/// `min_bars` is the longest indicator period (EMA slow, typically 200).
/// Pure transform: no network, no disk.
pub fn build(
    raw_bars: Vec<Bar>,
    symbol: &str,
    timeframe: Timeframe,
    min_bars: usize,
) -> Result<MarketSnapshot, DataError> {
    let mut bars: Vec<Bar> = Vec::with_capacity(raw_bars.len());

    for (index, bar) in raw_bars.into_iter().enumerate() {
        if let Err(defect) = check_bar(&bar, bars.last(), index) {
            warn!(symbol, "dropping bar: {}", defect);
            continue;
        }
        bars.push(bar);
    }

    if bars.is_empty() {
        return Err(DataError::InsufficientData {
            symbol: symbol.to_string(),
            have: 0,
        });
    }

    let incomplete = bars.len() < min_bars;
    Ok(MarketSnapshot::new(
        symbol.to_string(),
        timeframe,
        bars,
        incomplete,
    ))
}

fn check_bar(bar: &Bar, prev: Option<&Bar>, index: usize) -> Result<(), DataError> {
    let malformed = |reason: &str| DataError::MalformedBar {
        index,
        reason: reason.to_string(),
    };

    if let Some(prev) = prev {
        if bar.timestamp <= prev.timestamp {
            return Err(malformed("non-increasing timestamp"));
        }
    }
    if bar.open < 0.0 || bar.high < 0.0 || bar.low < 0.0 || bar.close < 0.0 {
        return Err(malformed("negative price"));
    }
    if !(bar.open.is_finite()
        && bar.high.is_finite()
        && bar.low.is_finite()
        && bar.close.is_finite())
    {
        return Err(malformed("non-finite price"));
    }
    if bar.volume < 0.0 {
        return Err(malformed("negative volume"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{make_bars, trending_bars};

    #[test]
    fn valid_series_builds_complete_snapshot() {
        let bars = trending_bars(250, 100.0, 150.0);
        let snap = build(bars, "BTCUSDT", Timeframe::M1, 200).unwrap();
        assert_eq!(snap.len(), 250);
        assert!(!snap.is_incomplete());
        assert_eq!(snap.symbol(), "BTCUSDT");
    }

    #[test]
    fn short_series_is_marked_incomplete() {
        let bars = trending_bars(50, 100.0, 110.0);
        let snap = build(bars, "BTCUSDT", Timeframe::M1, 200).unwrap();
        assert_eq!(snap.len(), 50);
        assert!(snap.is_incomplete());
    }

    #[test]
    fn malformed_bars_are_dropped_not_fatal() {
        let mut bars = make_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 112.0, 104.0, 110.0),
        ]);
        bars[1].volume = -5.0;
        let snap = build(bars, "BTCUSDT", Timeframe::M1, 2).unwrap();
        assert_eq!(snap.len(), 2);
    }

    #[test]
    fn out_of_order_timestamps_are_dropped() {
        let mut bars = make_bars(&[
            (100.0, 105.0, 95.0, 102.0),
            (102.0, 108.0, 100.0, 106.0),
            (106.0, 112.0, 104.0, 110.0),
        ]);
        bars[2].timestamp = bars[0].timestamp;
        let snap = build(bars, "BTCUSDT", Timeframe::M1, 2).unwrap();
        assert_eq!(snap.len(), 2);
        assert!((snap.last().close - 106.0).abs() < 1e-9);
    }

    #[test]
    fn all_bad_bars_is_insufficient_data() {
        let mut bars = make_bars(&[(100.0, 105.0, 95.0, 102.0), (102.0, 108.0, 100.0, 106.0)]);
        bars[0].close = -1.0;
        bars[1].volume = -1.0;
        let err = build(bars, "BTCUSDT", Timeframe::M1, 2).unwrap_err();
        assert!(matches!(err, DataError::InsufficientData { have: 0, .. }));
    }

    #[test]
    fn empty_input_is_insufficient_data() {
        let err = build(Vec::new(), "BTCUSDT", Timeframe::M1, 200).unwrap_err();
        assert!(matches!(err, DataError::InsufficientData { .. }));
    }
}
